//! Category commands.

use common::AggregateId;

use crate::command::Command;

use super::{Category, NewCategory};

/// Command to create a category, at the root or under a parent.
#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub parent_id: Option<AggregateId>,
    pub category: NewCategory,
}

impl CreateCategory {
    pub fn root(category: NewCategory) -> Self {
        Self {
            parent_id: None,
            category,
        }
    }

    pub fn child(parent_id: AggregateId, category: NewCategory) -> Self {
        Self {
            parent_id: Some(parent_id),
            category,
        }
    }
}

/// Command to rename a category.
#[derive(Debug, Clone)]
pub struct RenameCategory {
    pub category_id: AggregateId,
    pub name: String,
    pub slug: Option<String>,
    pub updated_by: String,
}

impl RenameCategory {
    pub fn new(
        category_id: AggregateId,
        name: impl Into<String>,
        slug: Option<String>,
        updated_by: impl Into<String>,
    ) -> Self {
        Self {
            category_id,
            name: name.into(),
            slug,
            updated_by: updated_by.into(),
        }
    }
}

impl Command for RenameCategory {
    type Aggregate = Category;

    fn aggregate_id(&self) -> AggregateId {
        self.category_id
    }
}

/// Command to activate or deactivate a category.
#[derive(Debug, Clone)]
pub struct SetCategoryActive {
    pub category_id: AggregateId,
    pub active: bool,
    pub updated_by: String,
    /// Recorded on deactivation.
    pub reason: String,
}

impl SetCategoryActive {
    pub fn activate(category_id: AggregateId, updated_by: impl Into<String>) -> Self {
        Self {
            category_id,
            active: true,
            updated_by: updated_by.into(),
            reason: String::new(),
        }
    }

    pub fn deactivate(
        category_id: AggregateId,
        updated_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            category_id,
            active: false,
            updated_by: updated_by.into(),
            reason: reason.into(),
        }
    }
}

impl Command for SetCategoryActive {
    type Aggregate = Category;

    fn aggregate_id(&self) -> AggregateId {
        self.category_id
    }
}

/// Command to logically delete a category.
#[derive(Debug, Clone)]
pub struct DeleteCategory {
    pub category_id: AggregateId,
    pub deleted_by: String,
    pub reason: Option<String>,
}

impl DeleteCategory {
    pub fn new(
        category_id: AggregateId,
        deleted_by: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            category_id,
            deleted_by: deleted_by.into(),
            reason,
        }
    }
}

impl Command for DeleteCategory {
    type Aggregate = Category;

    fn aggregate_id(&self) -> AggregateId {
        self.category_id
    }
}
