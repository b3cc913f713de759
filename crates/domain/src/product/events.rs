//! Product domain events.
//!
//! Each payload serializes to camelCase JSON carrying its own `id` and
//! `occurredAt`. The enum serializes as the bare payload; the discriminant
//! travels separately as the outbox message type.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{DomainEvent, EventMetadata};

use super::{Money, Sku};

/// Events raised by the product aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductEvent {
    Created(ProductCreated),
    PriceChanged(ProductPriceChanged),
    StockChanged(ProductStockChanged),
    LowStock(ProductLowStock),
    OutOfStock(ProductOutOfStock),
    Activated(ProductActivated),
    Deactivated(ProductDeactivated),
    DetailsChanged(ProductDetailsChanged),
    Deleted(ProductDeleted),
}

impl ProductEvent {
    /// Returns the shared event metadata.
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            ProductEvent::Created(e) => &e.metadata,
            ProductEvent::PriceChanged(e) => &e.metadata,
            ProductEvent::StockChanged(e) => &e.metadata,
            ProductEvent::LowStock(e) => &e.metadata,
            ProductEvent::OutOfStock(e) => &e.metadata,
            ProductEvent::Activated(e) => &e.metadata,
            ProductEvent::Deactivated(e) => &e.metadata,
            ProductEvent::DetailsChanged(e) => &e.metadata,
            ProductEvent::Deleted(e) => &e.metadata,
        }
    }

    /// Returns the product the event belongs to.
    pub fn product_id(&self) -> AggregateId {
        match self {
            ProductEvent::Created(e) => e.product_id,
            ProductEvent::PriceChanged(e) => e.product_id,
            ProductEvent::StockChanged(e) => e.product_id,
            ProductEvent::LowStock(e) => e.product_id,
            ProductEvent::OutOfStock(e) => e.product_id,
            ProductEvent::Activated(e) => e.product_id,
            ProductEvent::Deactivated(e) => e.product_id,
            ProductEvent::DetailsChanged(e) => e.product_id,
            ProductEvent::Deleted(e) => e.product_id,
        }
    }
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::Created(_) => ProductCreated::EVENT_TYPE,
            ProductEvent::PriceChanged(_) => ProductPriceChanged::EVENT_TYPE,
            ProductEvent::StockChanged(_) => ProductStockChanged::EVENT_TYPE,
            ProductEvent::LowStock(_) => ProductLowStock::EVENT_TYPE,
            ProductEvent::OutOfStock(_) => ProductOutOfStock::EVENT_TYPE,
            ProductEvent::Activated(_) => ProductActivated::EVENT_TYPE,
            ProductEvent::Deactivated(_) => ProductDeactivated::EVENT_TYPE,
            ProductEvent::DetailsChanged(_) => ProductDetailsChanged::EVENT_TYPE,
            ProductEvent::Deleted(_) => ProductDeleted::EVENT_TYPE,
        }
    }

    fn event_id(&self) -> Uuid {
        self.metadata().id()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata().occurred_at()
    }
}

/// A product was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreated {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub sku: Sku,
    pub price: Money,
    pub category_id: AggregateId,
    pub created_by: String,
}

impl ProductCreated {
    pub const EVENT_TYPE: &'static str = "catalog.product.created.v1";
}

/// A product's price was changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPriceChanged {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub old_price: Money,
    pub new_price: Money,
    pub updated_by: String,
}

impl ProductPriceChanged {
    pub const EVENT_TYPE: &'static str = "catalog.product.price_changed.v1";
}

/// A product's stock level was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStockChanged {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub reason: String,
    pub updated_by: String,
}

impl ProductStockChanged {
    pub const EVENT_TYPE: &'static str = "catalog.product.stock_changed.v1";
}

/// A product's stock fell to the low-stock threshold or below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLowStock {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub sku: Sku,
    pub current_stock: i64,
    pub updated_by: String,
}

impl ProductLowStock {
    pub const EVENT_TYPE: &'static str = "catalog.product.low_stock.v1";
}

/// A product ran out of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOutOfStock {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub sku: Sku,
    pub reported_by: String,
}

impl ProductOutOfStock {
    pub const EVENT_TYPE: &'static str = "catalog.product.out_of_stock.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductActivated {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub activated_by: String,
}

impl ProductActivated {
    pub const EVENT_TYPE: &'static str = "catalog.product.activated.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDeactivated {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub reason: String,
    pub deactivated_by: String,
}

impl ProductDeactivated {
    pub const EVENT_TYPE: &'static str = "catalog.product.deactivated.v1";
}

/// A product's name or description was edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailsChanged {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub old_name: String,
    pub new_name: String,
    pub updated_by: String,
}

impl ProductDetailsChanged {
    pub const EVENT_TYPE: &'static str = "catalog.product.details_changed.v1";
}

/// A product was logically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDeleted {
    #[serde(flatten)]
    pub(crate) metadata: EventMetadata,
    pub product_id: AggregateId,
    pub name: String,
    pub sku: Sku,
    pub deleted_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ProductDeleted {
    pub const EVENT_TYPE: &'static str = "catalog.product.deleted.v1";
}
