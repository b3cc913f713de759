//! HTTP route handlers.

pub mod categories;
pub mod health;
pub mod metrics;
pub mod outbox;
pub mod products;

use common::AggregateId;
use domain::{CategoryService, ProductService};
use ::outbox::CatalogStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CatalogStore> {
    pub products: ProductService<S>,
    pub categories: CategoryService<S>,
    pub store: S,
}

impl<S: CatalogStore + Clone> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            categories: CategoryService::new(store.clone()),
            store,
        }
    }
}

fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
