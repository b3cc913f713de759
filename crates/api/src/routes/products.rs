//! Product endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{
    ActivateProduct, CommandResult, CreateProduct, DeactivateProduct, DeleteProduct, DomainEvent,
    Money, NewProduct, Product, UpdatePrice, UpdateProductDetails, UpdateStock,
};
use outbox::CatalogStore;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_aggregate_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Minor units, e.g. cents.
    pub price: i64,
    pub currency: String,
    pub initial_stock: i64,
    pub category_id: String,
    pub created_by: String,
}

#[derive(Deserialize)]
pub struct UpdatePriceRequest {
    pub price: i64,
    pub currency: String,
    pub updated_by: String,
}

#[derive(Deserialize)]
pub struct UpdateStockRequest {
    pub quantity: i64,
    pub updated_by: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdateDetailsRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub updated_by: String,
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    pub updated_by: String,
}

#[derive(Deserialize)]
pub struct DeactivateRequest {
    pub updated_by: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    pub deleted_by: String,
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PriceResponse {
    pub amount: i64,
    pub currency: String,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub price: PriceResponse,
    pub stock_quantity: i64,
    pub category_id: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub version: i64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id().to_string(),
            name: product.name().to_string(),
            sku: product.sku().to_string(),
            description: product.description().to_string(),
            price: PriceResponse {
                amount: product.price().amount(),
                currency: product.price().currency().as_str().to_string(),
            },
            stock_quantity: product.stock_quantity(),
            category_id: product.category_id().to_string(),
            is_active: product.is_active(),
            is_deleted: product.is_deleted(),
            version: product.version().as_i64(),
        }
    }
}

/// A product after a command, with the events it raised.
#[derive(Serialize)]
pub struct ProductCommandResponse {
    pub product: ProductResponse,
    pub events: Vec<&'static str>,
}

impl From<CommandResult<Product>> for ProductCommandResponse {
    fn from(result: CommandResult<Product>) -> Self {
        Self {
            product: ProductResponse::from(&result.aggregate),
            events: result.events.iter().map(|e| e.event_type()).collect(),
        }
    }
}

// -- Handlers --

/// POST /products: Create a product.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductCommandResponse>), ApiError> {
    let category_id = parse_aggregate_id(&req.category_id)?;
    let price = Money::parse(req.price, &req.currency)?;

    let result = state
        .products
        .create_product(CreateProduct::new(NewProduct {
            name: req.name,
            sku: req.sku,
            description: req.description,
            price,
            initial_stock: req.initial_stock,
            category_id,
            created_by: req.created_by,
        }))
        .await?;

    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /products/{id}: Load a product by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;
    let product = state
        .products
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;

    Ok(Json(ProductResponse::from(&product)))
}

/// PUT /products/{id}/price: Change the price.
#[tracing::instrument(skip(state, req))]
pub async fn update_price<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePriceRequest>,
) -> Result<Json<ProductCommandResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;
    let price = Money::parse(req.price, &req.currency)?;

    let result = state
        .products
        .update_price(UpdatePrice::new(product_id, price, req.updated_by))
        .await?;

    Ok(Json(result.into()))
}

/// PUT /products/{id}/stock: Set the stock level.
#[tracing::instrument(skip(state, req))]
pub async fn update_stock<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStockRequest>,
) -> Result<Json<ProductCommandResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;

    let result = state
        .products
        .update_stock(UpdateStock::new(
            product_id,
            req.quantity,
            req.updated_by,
            req.reason,
        ))
        .await?;

    Ok(Json(result.into()))
}

/// PUT /products/{id}/details: Edit name and description.
#[tracing::instrument(skip(state, req))]
pub async fn update_details<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDetailsRequest>,
) -> Result<Json<ProductCommandResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;

    let result = state
        .products
        .update_details(UpdateProductDetails::new(
            product_id,
            req.name,
            req.description,
            req.updated_by,
        ))
        .await?;

    Ok(Json(result.into()))
}

/// POST /products/{id}/activate
#[tracing::instrument(skip(state, req))]
pub async fn activate<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ActivateRequest>,
) -> Result<Json<ProductCommandResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;

    let result = state
        .products
        .activate(ActivateProduct::new(product_id, req.updated_by))
        .await?;

    Ok(Json(result.into()))
}

/// POST /products/{id}/deactivate
#[tracing::instrument(skip(state, req))]
pub async fn deactivate<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<DeactivateRequest>,
) -> Result<Json<ProductCommandResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;

    let result = state
        .products
        .deactivate(DeactivateProduct::new(
            product_id,
            req.updated_by,
            req.reason,
        ))
        .await?;

    Ok(Json(result.into()))
}

/// DELETE /products/{id}?deleted_by=..&reason=..: Logically delete a
/// deactivated product.
#[tracing::instrument(skip(state, params))]
pub async fn delete<S: CatalogStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<ProductCommandResponse>, ApiError> {
    let product_id = parse_aggregate_id(&id)?;

    let result = state
        .products
        .delete(DeleteProduct::new(
            product_id,
            params.deleted_by,
            params.reason,
        ))
        .await?;

    Ok(Json(result.into()))
}
