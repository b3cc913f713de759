//! Product aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod value_objects;

pub use aggregate::{LOW_STOCK_THRESHOLD, MAX_PRICE_CHANGE_PERCENT, NewProduct, Product};
pub use commands::*;
pub use events::{
    ProductActivated, ProductCreated, ProductDeactivated, ProductDeleted, ProductDetailsChanged,
    ProductEvent, ProductLowStock, ProductOutOfStock, ProductPriceChanged, ProductStockChanged,
};
pub use service::ProductService;
pub use value_objects::{Currency, Money, Sku};

use thiserror::Error;

/// Errors that can occur during product operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// A required text field was empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A text field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Category ID is required")]
    CategoryIdRequired,

    #[error("Invalid SKU: {sku:?}")]
    InvalidSku { sku: String },

    #[error("Invalid price: {amount} (must not be negative)")]
    InvalidPrice { amount: i64 },

    #[error("Unknown currency code: {code:?}")]
    UnknownCurrency { code: String },

    /// Price updates must keep the currency.
    #[error("Currency mismatch: product is priced in {current}, got {requested}")]
    CurrencyMismatch { current: String, requested: String },

    #[error("Price change from {old} to {new} exceeds {max_percent}%")]
    PriceChangeTooLarge { old: i64, new: i64, max_percent: u64 },

    #[error("Invalid stock quantity: {quantity} (must not be negative)")]
    NegativeStock { quantity: i64 },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    NonPositiveQuantity { quantity: i64 },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("Cannot {action}: product is inactive")]
    Inactive { action: &'static str },

    #[error("Cannot {action}: product is deleted")]
    Deleted { action: &'static str },

    /// Deletion requires a prior deactivation.
    #[error("Product must be deactivated before it can be deleted")]
    StillActive,
}
