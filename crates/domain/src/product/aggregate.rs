//! Product aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use outbox::{PendingEvent, TrackedAggregate, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, EventBuffer, EventMetadata};

use super::{
    Money, ProductError, ProductEvent, Sku,
    events::{
        ProductActivated, ProductCreated, ProductDeactivated, ProductDeleted,
        ProductDetailsChanged, ProductLowStock, ProductOutOfStock, ProductPriceChanged,
        ProductStockChanged,
    },
};

/// Stock at or below this level (and above zero) raises `ProductLowStock`.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Largest allowed price move in one update, relative to the current price.
pub const MAX_PRICE_CHANGE_PERCENT: u64 = 50;

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Actor recorded for stock reductions triggered by other systems.
const SYSTEM_ACTOR: &str = "system";

/// Input for [`Product::create`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    /// Generated when absent or blank.
    pub sku: Option<String>,
    pub description: String,
    pub price: Money,
    pub initial_stock: i64,
    pub category_id: AggregateId,
    pub created_by: String,
}

/// Product aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    id: AggregateId,
    name: String,
    sku: Sku,
    description: String,
    price: Money,
    stock_quantity: i64,
    category_id: AggregateId,
    is_active: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    created_by: String,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,

    /// Version the row was loaded at; stored beside the state, not in it.
    #[serde(skip)]
    version: Version,

    #[serde(skip)]
    events: EventBuffer<ProductEvent>,
}

impl AggregateRoot for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    const AGGREGATE_TYPE: &'static str = "Product";

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn uncommitted_events(&self) -> &[ProductEvent] {
        self.events.snapshot()
    }
}

impl TrackedAggregate for Product {
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
impl Product {
    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }

    pub fn category_id(&self) -> AggregateId {
        self.category_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn updated_by(&self) -> Option<&str> {
        self.updated_by.as_deref()
    }

    /// Returns the events raised since the last commit.
    pub fn events(&self) -> &[ProductEvent] {
        self.events.snapshot()
    }
}

// Command methods
impl Product {
    /// Creates a new, active product and raises `ProductCreated`.
    pub fn create(new: NewProduct) -> Result<Self, ProductError> {
        let name = validate_name(&new.name)?;
        let description = validate_description(&new.description)?;
        let created_by = require("createdBy", &new.created_by)?;

        if new.initial_stock < 0 {
            return Err(ProductError::NegativeStock {
                quantity: new.initial_stock,
            });
        }
        if new.category_id.is_nil() {
            return Err(ProductError::CategoryIdRequired);
        }
        if new.price.amount() < 0 {
            return Err(ProductError::InvalidPrice {
                amount: new.price.amount(),
            });
        }

        let sku = match new.sku.as_deref().map(str::trim) {
            Some(sku) if !sku.is_empty() => Sku::new(sku)?,
            _ => Sku::generate(),
        };

        let mut product = Self {
            id: AggregateId::new(),
            name,
            sku,
            description,
            price: new.price,
            stock_quantity: new.initial_stock,
            category_id: new.category_id,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now(),
            created_by,
            updated_at: None,
            updated_by: None,
            version: Version::initial(),
            events: EventBuffer::new(),
        };

        let event = ProductCreated {
            metadata: EventMetadata::new(),
            product_id: product.id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            price: product.price.clone(),
            category_id: product.category_id,
            created_by: product.created_by.clone(),
        };
        product.created_at = event.metadata.occurred_at();
        product.events.record(ProductEvent::Created(event));

        Ok(product)
    }

    /// Changes the price, keeping the currency and staying within
    /// [`MAX_PRICE_CHANGE_PERCENT`] of the current amount.
    pub fn update_price(&mut self, new_price: Money, updated_by: &str) -> Result<(), ProductError> {
        self.ensure_active("update price")?;
        let updated_by = require("updatedBy", updated_by)?;

        if new_price.amount() < 0 {
            return Err(ProductError::InvalidPrice {
                amount: new_price.amount(),
            });
        }
        if new_price.currency() != self.price.currency() {
            return Err(ProductError::CurrencyMismatch {
                current: self.price.currency().to_string(),
                requested: new_price.currency().to_string(),
            });
        }
        if !self
            .price
            .within_change_limit(&new_price, MAX_PRICE_CHANGE_PERCENT)
        {
            return Err(ProductError::PriceChangeTooLarge {
                old: self.price.amount(),
                new: new_price.amount(),
                max_percent: MAX_PRICE_CHANGE_PERCENT,
            });
        }

        let old_price = std::mem::replace(&mut self.price, new_price);
        self.touch(&updated_by);
        self.events
            .record(ProductEvent::PriceChanged(ProductPriceChanged {
                metadata: EventMetadata::new(),
                product_id: self.id,
                name: self.name.clone(),
                old_price,
                new_price: self.price.clone(),
                updated_by,
            }));

        Ok(())
    }

    /// Sets the stock level.
    ///
    /// Always raises `ProductStockChanged`; additionally `ProductLowStock`
    /// when the new level is in `1..=LOW_STOCK_THRESHOLD`, or
    /// `ProductOutOfStock` when it is zero.
    pub fn update_stock(
        &mut self,
        new_quantity: i64,
        updated_by: &str,
        reason: &str,
    ) -> Result<(), ProductError> {
        self.ensure_not_deleted("update stock")?;
        let updated_by = require("updatedBy", updated_by)?;
        if new_quantity < 0 {
            return Err(ProductError::NegativeStock {
                quantity: new_quantity,
            });
        }

        let old_quantity = self.stock_quantity;
        self.stock_quantity = new_quantity;
        self.touch(&updated_by);

        self.events
            .record(ProductEvent::StockChanged(ProductStockChanged {
                metadata: EventMetadata::new(),
                product_id: self.id,
                name: self.name.clone(),
                old_quantity,
                new_quantity,
                reason: reason.trim().to_string(),
                updated_by: updated_by.clone(),
            }));

        if new_quantity == 0 {
            self.events
                .record(ProductEvent::OutOfStock(ProductOutOfStock {
                    metadata: EventMetadata::new(),
                    product_id: self.id,
                    name: self.name.clone(),
                    sku: self.sku.clone(),
                    reported_by: updated_by,
                }));
        } else if new_quantity <= LOW_STOCK_THRESHOLD {
            self.events.record(ProductEvent::LowStock(ProductLowStock {
                metadata: EventMetadata::new(),
                product_id: self.id,
                name: self.name.clone(),
                sku: self.sku.clone(),
                current_stock: new_quantity,
                updated_by,
            }));
        }

        Ok(())
    }

    /// Takes `quantity` units out of stock on behalf of the system.
    pub fn reduce_stock(&mut self, quantity: i64, reason: &str) -> Result<(), ProductError> {
        if quantity <= 0 {
            return Err(ProductError::NonPositiveQuantity { quantity });
        }
        if quantity > self.stock_quantity {
            return Err(ProductError::InsufficientStock {
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.update_stock(self.stock_quantity - quantity, SYSTEM_ACTOR, reason)
    }

    /// Adds `quantity` units to stock.
    pub fn increase_stock(
        &mut self,
        quantity: i64,
        updated_by: &str,
        reason: &str,
    ) -> Result<(), ProductError> {
        if quantity <= 0 {
            return Err(ProductError::NonPositiveQuantity { quantity });
        }
        self.update_stock(
            self.stock_quantity.saturating_add(quantity),
            updated_by,
            reason,
        )
    }

    /// Activates the product. Does nothing if it is already active.
    pub fn activate(&mut self, updated_by: &str) -> Result<(), ProductError> {
        self.ensure_not_deleted("activate")?;
        if self.is_active {
            return Ok(());
        }
        let updated_by = require("updatedBy", updated_by)?;

        self.is_active = true;
        self.touch(&updated_by);
        self.events
            .record(ProductEvent::Activated(ProductActivated {
                metadata: EventMetadata::new(),
                product_id: self.id,
                name: self.name.clone(),
                activated_by: updated_by,
            }));

        Ok(())
    }

    /// Deactivates the product. Does nothing if it is already inactive.
    pub fn deactivate(&mut self, updated_by: &str, reason: &str) -> Result<(), ProductError> {
        if !self.is_active {
            return Ok(());
        }
        let updated_by = require("updatedBy", updated_by)?;

        self.is_active = false;
        self.touch(&updated_by);
        self.events
            .record(ProductEvent::Deactivated(ProductDeactivated {
                metadata: EventMetadata::new(),
                product_id: self.id,
                name: self.name.clone(),
                reason: reason.trim().to_string(),
                deactivated_by: updated_by,
            }));

        Ok(())
    }

    /// Marks the product deleted. It must be deactivated first.
    pub fn mark_as_deleted(
        &mut self,
        deleted_by: &str,
        reason: Option<&str>,
    ) -> Result<(), ProductError> {
        self.ensure_not_deleted("delete")?;
        if self.is_active {
            return Err(ProductError::StillActive);
        }
        let deleted_by = require("deletedBy", deleted_by)?;

        self.is_deleted = true;
        self.touch(&deleted_by);
        self.events.record(ProductEvent::Deleted(ProductDeleted {
            metadata: EventMetadata::new(),
            product_id: self.id,
            name: self.name.clone(),
            sku: self.sku.clone(),
            deleted_by,
            reason: reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        }));

        Ok(())
    }

    /// Edits the name and description.
    ///
    /// Raises `ProductDetailsChanged` only if either value actually changes.
    pub fn update_details(
        &mut self,
        name: &str,
        description: &str,
        updated_by: &str,
    ) -> Result<(), ProductError> {
        self.ensure_not_deleted("update details")?;
        let name = validate_name(name)?;
        let description = validate_description(description)?;
        let updated_by = require("updatedBy", updated_by)?;

        if name == self.name && description == self.description {
            return Ok(());
        }

        let old_name = std::mem::replace(&mut self.name, name);
        self.description = description;
        self.touch(&updated_by);
        self.events
            .record(ProductEvent::DetailsChanged(ProductDetailsChanged {
                metadata: EventMetadata::new(),
                product_id: self.id,
                old_name,
                new_name: self.name.clone(),
                updated_by,
            }));

        Ok(())
    }

    fn ensure_not_deleted(&self, action: &'static str) -> Result<(), ProductError> {
        if self.is_deleted {
            return Err(ProductError::Deleted { action });
        }
        Ok(())
    }

    fn ensure_active(&self, action: &'static str) -> Result<(), ProductError> {
        self.ensure_not_deleted(action)?;
        if !self.is_active {
            return Err(ProductError::Inactive { action });
        }
        Ok(())
    }

    fn touch(&mut self, updated_by: &str) {
        self.updated_at = Some(Utc::now());
        self.updated_by = Some(updated_by.to_string());
    }
}

fn require(field: &'static str, value: &str) -> Result<String, ProductError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProductError::Required { field });
    }
    Ok(value.to_string())
}

fn validate_name(name: &str) -> Result<String, ProductError> {
    let name = require("name", name)?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ProductError::TooLong {
            field: "name",
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name)
}

fn validate_description(description: &str) -> Result<String, ProductError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ProductError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    Ok(description.to_string())
}
