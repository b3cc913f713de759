//! Value objects for the category domain.

use serde::{Deserialize, Serialize};

use super::CategoryError;

/// URL-safe category identifier, unique among siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub const MAX_LENGTH: usize = 100;

    /// Validates a caller-supplied slug.
    pub fn new(value: &str) -> Result<Self, CategoryError> {
        let valid = !value.is_empty()
            && value.len() <= Self::MAX_LENGTH
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !value.starts_with('-')
            && !value.ends_with('-')
            && !value.contains("--");

        if !valid {
            return Err(CategoryError::InvalidSlug {
                slug: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Derives a slug from a display name.
    ///
    /// Letters are lower-cased, every run of other characters becomes one
    /// hyphen, and leading or trailing hyphens are dropped. Only ASCII
    /// letters and digits survive, so a name without any (e.g. `"家电"`)
    /// yields [`CategoryError::SlugRequired`].
    pub fn from_name(name: &str) -> Result<Self, CategoryError> {
        let mut slug = String::with_capacity(name.len());
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.truncate(Self::MAX_LENGTH);
        let slug = slug.trim_end_matches('-');
        if slug.is_empty() {
            return Err(CategoryError::SlugRequired {
                name: name.to_string(),
            });
        }
        Self::new(slug)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validates_slug_shape() {
        assert!(Slug::new("home-garden").is_ok());
        assert!(Slug::new("tv4k").is_ok());
        for bad in ["", "Home", "-home", "home-", "home--garden", "home garden", "café"] {
            assert!(Slug::new(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(Slug::new(&"a".repeat(Slug::MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_derives_slug_from_name() {
        assert_eq!(Slug::from_name("Home & Garden").unwrap().as_str(), "home-garden");
        assert_eq!(Slug::from_name("  4K TVs!  ").unwrap().as_str(), "4k-tvs");
        assert!(Slug::from_name("!!!").is_err());
    }

    #[test]
    fn test_name_without_ascii_needs_explicit_slug() {
        assert!(matches!(
            Slug::from_name("家电"),
            Err(CategoryError::SlugRequired { name }) if name == "家电"
        ));
        assert_eq!(Slug::from_name("家电 TV").unwrap().as_str(), "tv");
    }

    #[test]
    fn test_derived_slug_is_bounded() {
        let slug = Slug::from_name(&"ab ".repeat(80)).unwrap();
        assert!(slug.as_str().len() <= Slug::MAX_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
    }
}
