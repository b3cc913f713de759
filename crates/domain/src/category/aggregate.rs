//! Category aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use outbox::{PendingEvent, TrackedAggregate, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, EventBuffer, EventMetadata};

use super::{
    CategoryError, CategoryEvent, Slug,
    events::{
        CategoryActivated, CategoryCreated, CategoryDeactivated, CategoryDeleted, CategoryRenamed,
    },
};

/// Number of levels in the category tree; roots are level 0.
pub const MAX_CATEGORY_DEPTH: u32 = 5;

const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Input for [`Category::create_root`] and [`Category::create_child`].
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    /// Derived from the name when absent or blank.
    pub slug: Option<String>,
    pub description: String,
    pub created_by: String,
}

/// Category aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    id: AggregateId,
    name: String,
    slug: Slug,
    description: String,
    parent_id: Option<AggregateId>,
    level: u32,
    path: String,
    is_active: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    created_by: String,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,

    #[serde(skip)]
    version: Version,

    #[serde(skip)]
    events: EventBuffer<CategoryEvent>,
}

impl AggregateRoot for Category {
    type Event = CategoryEvent;
    type Error = CategoryError;

    const AGGREGATE_TYPE: &'static str = "Category";

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[CategoryEvent] {
        self.events.snapshot()
    }
}

impl TrackedAggregate for Category {
    fn aggregate_type(&self) -> &'static str {
        Self::AGGREGATE_TYPE
    }

    fn aggregate_id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn snapshot_state(&self) -> outbox::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn pending_events(&self) -> outbox::Result<Vec<PendingEvent>> {
        self.events.to_pending()
    }

    fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn mark_committed(&mut self, version: Version) {
        self.version = version;
        self.events.flush();
    }
}

// Query methods
impl Category {
    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parent_id(&self) -> Option<AggregateId> {
        self.parent_id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Materialized path, e.g. `/electronics/tv`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn updated_by(&self) -> Option<&str> {
        self.updated_by.as_deref()
    }

    pub fn events(&self) -> &[CategoryEvent] {
        self.events.snapshot()
    }
}

// Command methods
impl Category {
    /// Creates a top-level category.
    pub fn create_root(new: NewCategory) -> Result<Self, CategoryError> {
        Self::create(new, None)
    }

    /// Creates a category under `parent`, which must be active and not deleted.
    pub fn create_child(parent: &Category, new: NewCategory) -> Result<Self, CategoryError> {
        if parent.is_deleted {
            return Err(CategoryError::ParentDeleted {
                parent_id: parent.id.to_string(),
            });
        }
        if !parent.is_active {
            return Err(CategoryError::ParentInactive {
                parent_id: parent.id.to_string(),
            });
        }
        if parent.level + 1 >= MAX_CATEGORY_DEPTH {
            return Err(CategoryError::DepthExceeded {
                max: MAX_CATEGORY_DEPTH,
            });
        }
        Self::create(new, Some(parent))
    }

    fn create(new: NewCategory, parent: Option<&Category>) -> Result<Self, CategoryError> {
        let name = validate_name(&new.name)?;
        let slug = resolve_slug(new.slug.as_deref(), &name)?;
        let description = validate_description(&new.description)?;
        let created_by = require("createdBy", &new.created_by)?;

        let (parent_id, level, path) = match parent {
            Some(parent) => (
                Some(parent.id),
                parent.level + 1,
                format!("{}/{}", parent.path, slug),
            ),
            None => (None, 0, format!("/{slug}")),
        };

        let metadata = EventMetadata::new();
        let mut category = Self {
            id: AggregateId::new(),
            name,
            slug,
            description,
            parent_id,
            level,
            path,
            is_active: true,
            is_deleted: false,
            created_at: metadata.occurred_at(),
            created_by,
            updated_at: None,
            updated_by: None,
            version: Version::initial(),
            events: EventBuffer::new(),
        };

        let event = CategoryCreated {
            metadata,
            category_id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            parent_id: category.parent_id,
            level: category.level,
            path: category.path.clone(),
            created_by: category.created_by.clone(),
        };
        category.events.record(CategoryEvent::Created(event));

        Ok(category)
    }

    /// Renames the category, re-deriving the slug from the new name unless
    /// one is given. The category's own path follows the new slug.
    pub fn rename(
        &mut self,
        name: &str,
        slug: Option<&str>,
        updated_by: &str,
    ) -> Result<(), CategoryError> {
        self.ensure_not_deleted("rename")?;
        let name = validate_name(name)?;
        let slug = resolve_slug(slug, &name)?;
        let updated_by = require("updatedBy", updated_by)?;

        if name == self.name && slug == self.slug {
            return Ok(());
        }

        let parent_path = self
            .path
            .strip_suffix(self.slug.as_str())
            .unwrap_or("/")
            .to_string();
        self.path = format!("{parent_path}{slug}");

        let old_name = std::mem::replace(&mut self.name, name);
        let old_slug = std::mem::replace(&mut self.slug, slug);
        self.touch(&updated_by);
        self.events.record(CategoryEvent::Renamed(CategoryRenamed {
            metadata: EventMetadata::new(),
            category_id: self.id,
            old_name,
            new_name: self.name.clone(),
            old_slug,
            new_slug: self.slug.clone(),
            updated_by,
        }));

        Ok(())
    }

    /// Activates the category. Does nothing if it is already active.
    pub fn activate(&mut self, updated_by: &str) -> Result<(), CategoryError> {
        self.ensure_not_deleted("activate")?;
        if self.is_active {
            return Ok(());
        }
        let updated_by = require("updatedBy", updated_by)?;

        self.is_active = true;
        self.touch(&updated_by);
        self.events
            .record(CategoryEvent::Activated(CategoryActivated {
                metadata: EventMetadata::new(),
                category_id: self.id,
                name: self.name.clone(),
                activated_by: updated_by,
            }));

        Ok(())
    }

    /// Deactivates the category. Does nothing if it is already inactive.
    pub fn deactivate(&mut self, updated_by: &str, reason: &str) -> Result<(), CategoryError> {
        if !self.is_active {
            return Ok(());
        }
        let updated_by = require("updatedBy", updated_by)?;

        self.is_active = false;
        self.touch(&updated_by);
        self.events
            .record(CategoryEvent::Deactivated(CategoryDeactivated {
                metadata: EventMetadata::new(),
                category_id: self.id,
                name: self.name.clone(),
                reason: reason.trim().to_string(),
                deactivated_by: updated_by,
            }));

        Ok(())
    }

    /// Marks the category deleted. It must be deactivated first.
    pub fn mark_as_deleted(
        &mut self,
        deleted_by: &str,
        reason: Option<&str>,
    ) -> Result<(), CategoryError> {
        self.ensure_not_deleted("delete")?;
        if self.is_active {
            return Err(CategoryError::StillActive);
        }
        let deleted_by = require("deletedBy", deleted_by)?;

        self.is_deleted = true;
        self.touch(&deleted_by);
        self.events.record(CategoryEvent::Deleted(CategoryDeleted {
            metadata: EventMetadata::new(),
            category_id: self.id,
            name: self.name.clone(),
            deleted_by,
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        }));

        Ok(())
    }

    fn ensure_not_deleted(&self, action: &'static str) -> Result<(), CategoryError> {
        if self.is_deleted {
            return Err(CategoryError::Deleted { action });
        }
        Ok(())
    }

    fn touch(&mut self, updated_by: &str) {
        self.updated_at = Some(Utc::now());
        self.updated_by = Some(updated_by.to_string());
    }
}

fn require(field: &'static str, value: &str) -> Result<String, CategoryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CategoryError::Required { field });
    }
    Ok(value.to_string())
}

fn validate_name(name: &str) -> Result<String, CategoryError> {
    let name = require("name", name)?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CategoryError::TooLong {
            field: "name",
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name)
}

fn validate_description(description: &str) -> Result<String, CategoryError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(CategoryError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(description.to_string())
}

fn resolve_slug(slug: Option<&str>, name: &str) -> Result<Slug, CategoryError> {
    match slug.map(str::trim) {
        Some(slug) if !slug.is_empty() => Slug::new(slug),
        _ => Slug::from_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DomainEvent;

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            slug: None,
            description: String::new(),
            created_by: "alice".to_string(),
        }
    }

    fn committed(mut category: Category) -> Category {
        category.mark_committed(Version::first());
        category
    }

    #[test]
    fn root_has_level_zero_and_slug_path() {
        let root = Category::create_root(new_category("Home & Garden")).unwrap();

        assert_eq!(root.level(), 0);
        assert_eq!(root.slug().as_str(), "home-garden");
        assert_eq!(root.path(), "/home-garden");
        assert!(root.is_root());
        assert!(root.is_active());

        assert_eq!(root.events().len(), 1);
        let CategoryEvent::Created(event) = &root.events()[0] else {
            panic!("expected CategoryCreated");
        };
        assert_eq!(event.parent_id, None);
        assert_eq!(event.path, "/home-garden");
    }

    #[test]
    fn child_extends_parent_path_and_level() {
        let root = committed(Category::create_root(new_category("Electronics")).unwrap());
        let mut input = new_category("Televisions");
        input.slug = Some("tv".to_string());

        let child = Category::create_child(&root, input).unwrap();

        assert_eq!(child.level(), 1);
        assert_eq!(child.parent_id(), Some(root.id()));
        assert_eq!(child.path(), "/electronics/tv");
        assert_eq!(child.events()[0].event_type(), CategoryCreated::EVENT_TYPE);
    }

    #[test]
    fn depth_is_bounded() {
        let mut current = committed(Category::create_root(new_category("L0")).unwrap());
        for level in 1..MAX_CATEGORY_DEPTH {
            current = committed(
                Category::create_child(&current, new_category(&format!("L{level}"))).unwrap(),
            );
        }
        assert_eq!(current.level(), MAX_CATEGORY_DEPTH - 1);
        assert_eq!(current.path(), "/l0/l1/l2/l3/l4");

        assert_eq!(
            Category::create_child(&current, new_category("Too deep")).unwrap_err(),
            CategoryError::DepthExceeded {
                max: MAX_CATEGORY_DEPTH
            }
        );
    }

    #[test]
    fn child_requires_usable_parent() {
        let mut parent = committed(Category::create_root(new_category("Seasonal")).unwrap());
        parent.deactivate("bob", "off season").unwrap();

        assert!(matches!(
            Category::create_child(&parent, new_category("Winter")),
            Err(CategoryError::ParentInactive { .. })
        ));

        parent.mark_as_deleted("bob", None).unwrap();
        assert!(matches!(
            Category::create_child(&parent, new_category("Winter")),
            Err(CategoryError::ParentDeleted { .. })
        ));
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(
            Category::create_root(new_category("  ")).unwrap_err(),
            CategoryError::Required { field: "name" }
        );
        assert!(matches!(
            Category::create_root(new_category(&"x".repeat(101))),
            Err(CategoryError::TooLong { field: "name", .. })
        ));

        let mut input = new_category("Books");
        input.slug = Some("Bad Slug".to_string());
        assert!(matches!(
            Category::create_root(input),
            Err(CategoryError::InvalidSlug { .. })
        ));

        let mut input = new_category("Books");
        input.created_by = String::new();
        assert!(Category::create_root(input).is_err());
    }

    #[test]
    fn non_ascii_name_needs_explicit_slug() {
        assert!(matches!(
            Category::create_root(new_category("家电")),
            Err(CategoryError::SlugRequired { .. })
        ));

        let mut input = new_category("家电");
        input.slug = Some("home-appliances".to_string());
        let category = Category::create_root(input).unwrap();
        assert_eq!(category.name(), "家电");
        assert_eq!(category.path(), "/home-appliances");
    }

    #[test]
    fn rename_updates_slug_and_own_path() {
        let root = committed(Category::create_root(new_category("Electronics")).unwrap());
        let mut child =
            committed(Category::create_child(&root, new_category("Televisions")).unwrap());

        child.rename("TV & Video", None, "bob").unwrap();

        assert_eq!(child.name(), "TV & Video");
        assert_eq!(child.slug().as_str(), "tv-video");
        assert_eq!(child.path(), "/electronics/tv-video");
        let CategoryEvent::Renamed(event) = &child.events()[0] else {
            panic!("expected CategoryRenamed");
        };
        assert_eq!(event.old_slug.as_str(), "televisions");
        assert_eq!(event.new_slug.as_str(), "tv-video");

        let mut root = root;
        root.rename("Gadgets", None, "bob").unwrap();
        assert_eq!(root.path(), "/gadgets");
    }

    #[test]
    fn rename_to_same_values_is_silent() {
        let mut root = committed(Category::create_root(new_category("Books")).unwrap());
        root.rename("Books", Some("books"), "bob").unwrap();
        assert!(root.events().is_empty());
    }

    #[test]
    fn lifecycle_mirrors_products() {
        let mut category = committed(Category::create_root(new_category("Toys")).unwrap());

        category.activate("bob").unwrap();
        assert!(category.events().is_empty());

        assert_eq!(
            category.mark_as_deleted("bob", None).unwrap_err(),
            CategoryError::StillActive
        );

        category.deactivate("bob", "merged").unwrap();
        category.deactivate("bob", "merged").unwrap();
        category.mark_as_deleted("bob", Some("merged")).unwrap();

        let types: Vec<_> = category.events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![CategoryDeactivated::EVENT_TYPE, CategoryDeleted::EVENT_TYPE]
        );
        assert!(category.activate("bob").is_err());
        assert!(category.rename("Games", None, "bob").is_err());
    }
}
