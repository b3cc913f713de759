//! HTTP service for the product catalog.
//!
//! Exposes product and category commands over REST, with structured logging
//! (tracing) and Prometheus metrics. Every command commits its events to the
//! transactional outbox; the binary runs the outbox dispatcher alongside.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::CatalogStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;
use routes::metrics::MetricsState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CatalogStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get::<S>))
        .with_state(MetricsState {
            handle: metrics_handle,
            store: state.store.clone(),
        });

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/categories", post(routes::categories::create::<S>))
        .route("/categories/{id}", get(routes::categories::get::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route(
            "/products/{id}",
            get(routes::products::get::<S>).delete(routes::products::delete::<S>),
        )
        .route("/products/{id}/price", put(routes::products::update_price::<S>))
        .route("/products/{id}/stock", put(routes::products::update_stock::<S>))
        .route(
            "/products/{id}/details",
            put(routes::products::update_details::<S>),
        )
        .route(
            "/products/{id}/activate",
            post(routes::products::activate::<S>),
        )
        .route(
            "/products/{id}/deactivate",
            post(routes::products::deactivate::<S>),
        )
        .route("/outbox/failed", get(routes::outbox::failed::<S>))
        .route("/outbox/stats", get(routes::outbox::stats::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the shared application state over `store`.
pub fn create_state<S: CatalogStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store))
}
