//! Category service.

use common::AggregateId;
use outbox::AggregateStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    Category, CategoryError, CreateCategory, DeleteCategory, RenameCategory, SetCategoryActive,
};

impl From<CategoryError> for DomainError {
    fn from(e: CategoryError) -> Self {
        DomainError::Category(e)
    }
}

/// Service for managing the category tree.
pub struct CategoryService<S: AggregateStore> {
    handler: CommandHandler<S, Category>,
}

impl<S: AggregateStore> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Category> {
        &self.handler
    }

    /// Creates a category. A child is placed under its parent's path, so the
    /// parent is loaded first and must exist.
    #[tracing::instrument(skip(self, cmd), fields(name = %cmd.category.name, parent_id = ?cmd.parent_id))]
    pub async fn create_category(
        &self,
        cmd: CreateCategory,
    ) -> Result<CommandResult<Category>, DomainError> {
        let category = match cmd.parent_id {
            Some(parent_id) => {
                let parent = self.handler.load(parent_id).await?;
                Category::create_child(&parent, cmd.category)?
            }
            None => Category::create_root(cmd.category)?,
        };

        let result = self.handler.create(category).await?;
        tracing::info!(
            category_id = %result.aggregate.id(),
            path = result.aggregate.path(),
            "Category created"
        );
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename(
        &self,
        cmd: RenameCategory,
    ) -> Result<CommandResult<Category>, DomainError> {
        self.handler
            .execute(cmd.category_id, |category| {
                category.rename(&cmd.name, cmd.slug.as_deref(), &cmd.updated_by)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_active(
        &self,
        cmd: SetCategoryActive,
    ) -> Result<CommandResult<Category>, DomainError> {
        self.handler
            .execute(cmd.category_id, |category| {
                if cmd.active {
                    category.activate(&cmd.updated_by)
                } else {
                    category.deactivate(&cmd.updated_by, &cmd.reason)
                }
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        cmd: DeleteCategory,
    ) -> Result<CommandResult<Category>, DomainError> {
        self.handler
            .execute(cmd.category_id, |category| {
                category.mark_as_deleted(&cmd.deleted_by, cmd.reason.as_deref())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_category(
        &self,
        category_id: AggregateId,
    ) -> Result<Option<Category>, DomainError> {
        self.handler.load_existing(category_id).await
    }
}
