//! Category aggregate and related types.
//!
//! Categories form a tree of bounded depth. Each category stores its own
//! level and materialized path, fixed when it is created.

mod aggregate;
mod commands;
mod events;
mod service;
mod value_objects;

pub use aggregate::{Category, MAX_CATEGORY_DEPTH, NewCategory};
pub use commands::*;
pub use events::{
    CategoryActivated, CategoryCreated, CategoryDeactivated, CategoryDeleted, CategoryEvent,
    CategoryRenamed,
};
pub use service::CategoryService;
pub use value_objects::Slug;

use thiserror::Error;

/// Errors that can occur during category operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Slugs are lower-case ASCII letters, digits and single hyphens.
    #[error("Invalid slug: {slug:?}")]
    InvalidSlug { slug: String },

    #[error("Cannot derive a slug from {name:?}; supply one explicitly")]
    SlugRequired { name: String },

    #[error("Category tree is limited to {max} levels")]
    DepthExceeded { max: u32 },

    #[error("Parent category {parent_id} is inactive")]
    ParentInactive { parent_id: String },

    #[error("Parent category {parent_id} is deleted")]
    ParentDeleted { parent_id: String },

    #[error("Cannot {action}: category is deleted")]
    Deleted { action: &'static str },

    #[error("Category must be deactivated before it can be deleted")]
    StillActive,
}
