//! Outbox inspection endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use outbox::{CatalogStore, OutboxMessage, OutboxStats};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Deserialize)]
pub struct FailedParams {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct FailedMessageResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub occurred_on: DateTime<Utc>,
    pub retry_count: i32,
    pub max_retry_count: i32,
    pub error: Option<String>,
}

impl From<OutboxMessage> for FailedMessageResponse {
    fn from(message: OutboxMessage) -> Self {
        Self {
            id: message.id.to_string(),
            message_type: message.message_type,
            occurred_on: message.occurred_on,
            retry_count: message.retry_count,
            max_retry_count: message.max_retry_count,
            error: message.error,
        }
    }
}

/// GET /outbox/failed: Messages whose retry budget is exhausted.
#[tracing::instrument(skip(state, params))]
pub async fn failed<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<FailedParams>,
) -> Result<Json<Vec<FailedMessageResponse>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let messages = state.store.list_permanently_failed(limit).await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// GET /outbox/stats: Message counts per delivery state.
#[tracing::instrument(skip(state))]
pub async fn stats<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OutboxStats>, ApiError> {
    Ok(Json(state.store.stats().await?))
}
