//! Category endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Category, CreateCategory, NewCategory};
use outbox::CatalogStore;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_aggregate_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Creates a root category when absent.
    pub parent_id: Option<String>,
    pub created_by: String,
}

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<String>,
    pub level: u32,
    pub path: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub version: i64,
}

impl From<&Category> for CategoryResponse {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id().to_string(),
            name: category.name().to_string(),
            slug: category.slug().to_string(),
            description: category.description().to_string(),
            parent_id: category.parent_id().map(|id| id.to_string()),
            level: category.level(),
            path: category.path().to_string(),
            is_active: category.is_active(),
            is_deleted: category.is_deleted(),
            version: category.version().as_i64(),
        }
    }
}

/// POST /categories: Create a root or child category.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let new = NewCategory {
        name: req.name,
        slug: req.slug,
        description: req.description,
        created_by: req.created_by,
    };
    let cmd = match req.parent_id.as_deref() {
        Some(parent_id) => CreateCategory::child(parse_aggregate_id(parent_id)?, new),
        None => CreateCategory::root(new),
    };

    let result = state.categories.create_category(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse::from(&result.aggregate)),
    ))
}

/// GET /categories/{id}: Load a category by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category_id = parse_aggregate_id(&id)?;
    let category = state
        .categories
        .get_category(category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Category {id} not found")))?;

    Ok(Json(CategoryResponse::from(&category)))
}
