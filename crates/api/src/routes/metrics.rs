//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use outbox::CatalogStore;

/// State for the metrics route: the exporter plus the store whose backlog
/// is sampled on every scrape.
#[derive(Clone)]
pub struct MetricsState<S> {
    pub handle: PrometheusHandle,
    pub store: S,
}

/// GET /metrics: Returns Prometheus-formatted metrics.
pub async fn get<S: CatalogStore + Clone + 'static>(
    State(state): State<MetricsState<S>>,
) -> impl IntoResponse {
    match state.store.stats().await {
        Ok(stats) => {
            metrics::gauge!("outbox_messages", "state" => "pending").set(stats.pending as f64);
            metrics::gauge!("outbox_messages", "state" => "processed").set(stats.processed as f64);
            metrics::gauge!("outbox_messages", "state" => "permanently_failed")
                .set(stats.permanently_failed as f64);
        }
        Err(e) => tracing::warn!(error = %e, "cannot sample outbox backlog"),
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}
