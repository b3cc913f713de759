//! Product service providing a simplified API for product operations.

use common::AggregateId;
use outbox::AggregateStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    ActivateProduct, CreateProduct, DeactivateProduct, DeleteProduct, IncreaseStock, Product,
    ProductError, ReduceStock, UpdatePrice, UpdateProductDetails, UpdateStock,
};

impl From<ProductError> for DomainError {
    fn from(e: ProductError) -> Self {
        DomainError::Product(e)
    }
}

/// Service for managing products.
///
/// Each method loads the product, applies one business operation and commits
/// the new state together with the raised events in a single unit of work.
pub struct ProductService<S: AggregateStore> {
    handler: CommandHandler<S, Product>,
}

impl<S: AggregateStore> ProductService<S> {
    /// Creates a new product service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Product> {
        &self.handler
    }

    #[tracing::instrument(skip(self, cmd), fields(name = %cmd.product.name))]
    pub async fn create_product(
        &self,
        cmd: CreateProduct,
    ) -> Result<CommandResult<Product>, DomainError> {
        let product = Product::create(cmd.product)?;
        let result = self.handler.create(product).await?;
        tracing::info!(product_id = %result.aggregate.id(), "Product created");
        Ok(result)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_price(
        &self,
        cmd: UpdatePrice,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.update_price(cmd.new_price, &cmd.updated_by)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_stock(
        &self,
        cmd: UpdateStock,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.update_stock(cmd.new_quantity, &cmd.updated_by, &cmd.reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reduce_stock(
        &self,
        cmd: ReduceStock,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.reduce_stock(cmd.quantity, &cmd.reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn increase_stock(
        &self,
        cmd: IncreaseStock,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.increase_stock(cmd.quantity, &cmd.updated_by, &cmd.reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn activate(
        &self,
        cmd: ActivateProduct,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| product.activate(&cmd.updated_by))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate(
        &self,
        cmd: DeactivateProduct,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.deactivate(&cmd.updated_by, &cmd.reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, cmd: DeleteProduct) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.mark_as_deleted(&cmd.deleted_by, cmd.reason.as_deref())
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_details(
        &self,
        cmd: UpdateProductDetails,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.handler
            .execute(cmd.product_id, |product| {
                product.update_details(&cmd.name, &cmd.description, &cmd.updated_by)
            })
            .await
    }

    /// Loads a product by ID.
    ///
    /// Returns None if the product doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(
        &self,
        product_id: AggregateId,
    ) -> Result<Option<Product>, DomainError> {
        self.handler.load_existing(product_id).await
    }
}
