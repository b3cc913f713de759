//! Product commands.

use common::AggregateId;

use crate::command::Command;

use super::{Money, NewProduct, Product};

/// Command to create a new product.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub product: NewProduct,
}

impl CreateProduct {
    pub fn new(product: NewProduct) -> Self {
        Self { product }
    }
}

/// Command to change a product's price.
#[derive(Debug, Clone)]
pub struct UpdatePrice {
    pub product_id: AggregateId,
    pub new_price: Money,
    pub updated_by: String,
}

impl UpdatePrice {
    pub fn new(product_id: AggregateId, new_price: Money, updated_by: impl Into<String>) -> Self {
        Self {
            product_id,
            new_price,
            updated_by: updated_by.into(),
        }
    }
}

impl Command for UpdatePrice {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to set a product's stock level.
#[derive(Debug, Clone)]
pub struct UpdateStock {
    pub product_id: AggregateId,
    pub new_quantity: i64,
    pub updated_by: String,
    pub reason: String,
}

impl UpdateStock {
    pub fn new(
        product_id: AggregateId,
        new_quantity: i64,
        updated_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            new_quantity,
            updated_by: updated_by.into(),
            reason: reason.into(),
        }
    }
}

impl Command for UpdateStock {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to take units out of stock.
#[derive(Debug, Clone)]
pub struct ReduceStock {
    pub product_id: AggregateId,
    pub quantity: i64,
    pub reason: String,
}

impl ReduceStock {
    pub fn new(product_id: AggregateId, quantity: i64, reason: impl Into<String>) -> Self {
        Self {
            product_id,
            quantity,
            reason: reason.into(),
        }
    }
}

impl Command for ReduceStock {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to add units to stock.
#[derive(Debug, Clone)]
pub struct IncreaseStock {
    pub product_id: AggregateId,
    pub quantity: i64,
    pub updated_by: String,
    pub reason: String,
}

impl IncreaseStock {
    pub fn new(
        product_id: AggregateId,
        quantity: i64,
        updated_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            quantity,
            updated_by: updated_by.into(),
            reason: reason.into(),
        }
    }
}

impl Command for IncreaseStock {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to activate a product.
#[derive(Debug, Clone)]
pub struct ActivateProduct {
    pub product_id: AggregateId,
    pub updated_by: String,
}

impl ActivateProduct {
    pub fn new(product_id: AggregateId, updated_by: impl Into<String>) -> Self {
        Self {
            product_id,
            updated_by: updated_by.into(),
        }
    }
}

impl Command for ActivateProduct {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to deactivate a product.
#[derive(Debug, Clone)]
pub struct DeactivateProduct {
    pub product_id: AggregateId,
    pub updated_by: String,
    pub reason: String,
}

impl DeactivateProduct {
    pub fn new(
        product_id: AggregateId,
        updated_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            updated_by: updated_by.into(),
            reason: reason.into(),
        }
    }
}

impl Command for DeactivateProduct {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to logically delete a product.
#[derive(Debug, Clone)]
pub struct DeleteProduct {
    pub product_id: AggregateId,
    pub deleted_by: String,
    pub reason: Option<String>,
}

impl DeleteProduct {
    pub fn new(
        product_id: AggregateId,
        deleted_by: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            product_id,
            deleted_by: deleted_by.into(),
            reason,
        }
    }
}

impl Command for DeleteProduct {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}

/// Command to edit a product's name and description.
#[derive(Debug, Clone)]
pub struct UpdateProductDetails {
    pub product_id: AggregateId,
    pub name: String,
    pub description: String,
    pub updated_by: String,
}

impl UpdateProductDetails {
    pub fn new(
        product_id: AggregateId,
        name: impl Into<String>,
        description: impl Into<String>,
        updated_by: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            description: description.into(),
            updated_by: updated_by.into(),
        }
    }
}

impl Command for UpdateProductDetails {
    type Aggregate = Product;

    fn aggregate_id(&self) -> AggregateId {
        self.product_id
    }
}
