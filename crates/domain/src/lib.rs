//! Domain layer for the product catalog.
//!
//! This crate provides:
//! - `AggregateRoot` and the per-aggregate `EventBuffer`
//! - `Command` and `CommandHandler`, which commit through an outbox unit of work
//! - The `Product` and `Category` aggregates with their events and services
//! - `CatalogEvent`, the union of everything the catalog publishes

pub mod aggregate;
pub mod category;
pub mod command;
pub mod error;
pub mod events;
pub mod product;

pub use aggregate::{AggregateRoot, DomainEvent, EventBuffer, EventMetadata};
pub use category::{
    Category, CategoryActivated, CategoryCreated, CategoryDeactivated, CategoryDeleted,
    CategoryError, CategoryEvent, CategoryRenamed, CategoryService, CreateCategory,
    DeleteCategory, MAX_CATEGORY_DEPTH, NewCategory, RenameCategory, SetCategoryActive, Slug,
};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use events::CatalogEvent;
pub use product::{
    ActivateProduct, CreateProduct, Currency, DeactivateProduct, DeleteProduct, IncreaseStock,
    LOW_STOCK_THRESHOLD, MAX_PRICE_CHANGE_PERCENT, Money, NewProduct, Product, ProductActivated,
    ProductCreated, ProductDeactivated, ProductDeleted, ProductDetailsChanged, ProductError,
    ProductEvent, ProductLowStock, ProductOutOfStock, ProductPriceChanged, ProductService,
    ProductStockChanged, ReduceStock, Sku, UpdatePrice, UpdateProductDetails, UpdateStock,
};
