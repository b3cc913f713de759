//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CategoryError, DomainError, ProductError};
use outbox::OutboxError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Outbox store error outside a domain operation.
    Store(OutboxError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Product(product_err) => match product_err {
            ProductError::InsufficientStock { .. }
            | ProductError::Inactive { .. }
            | ProductError::Deleted { .. }
            | ProductError::StillActive => StatusCode::CONFLICT,
            ProductError::PriceChangeTooLarge { .. } | ProductError::CurrencyMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::BAD_REQUEST,
        },
        DomainError::Category(category_err) => match category_err {
            CategoryError::ParentInactive { .. }
            | CategoryError::ParentDeleted { .. }
            | CategoryError::Deleted { .. }
            | CategoryError::StillActive => StatusCode::CONFLICT,
            CategoryError::DepthExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_REQUEST,
        },
        DomainError::AggregateNotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Store(store_err) => store_status(store_err),
        DomainError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn store_error_to_response(err: OutboxError) -> (StatusCode, String) {
    (store_status(&err), err.to_string())
}

fn store_status(err: &OutboxError) -> StatusCode {
    match err {
        OutboxError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<OutboxError> for ApiError {
    fn from(err: OutboxError) -> Self {
        ApiError::Store(err)
    }
}
