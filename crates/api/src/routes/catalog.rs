//! Product and category endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CategoryId, Money, ProductId};
use domain::{CategoryView, ProductView};
use serde::Deserialize;
use store::{NewCategory, NewProduct, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::parse_id;
use crate::response::ApiResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub price: f64,
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: String,
}

// -- Handlers --

/// POST /categories: create a category.
#[tracing::instrument(skip(state, req))]
pub async fn create_category<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryView>>), ApiError> {
    let category = state
        .catalog
        .create_category(NewCategory {
            name: req.name,
            slug: req.slug,
            description: req.description,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(category, "Category created successfully")),
    ))
}

/// GET /categories: list active categories.
#[tracing::instrument(skip(state))]
pub async fn list_categories<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ApiResponse<Vec<CategoryView>>>, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// POST /products: create a product.
#[tracing::instrument(skip(state, req))]
pub async fn create_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductView>>), ApiError> {
    let price = Money::from_decimal(req.price)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid price: {}", req.price)))?;
    let category_id: CategoryId = parse_id(&req.category_id, "category")?;

    let product = state
        .catalog
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            sku: req.sku,
            price,
            stock: req.stock,
            images: req.images,
            category_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(product, "Product created successfully")),
    ))
}

/// GET /products: list active products.
#[tracing::instrument(skip(state))]
pub async fn list_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ApiResponse<Vec<ProductView>>>, ApiError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state.catalog.get_product(product_id).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// GET /products/sku/{sku}
#[tracing::instrument(skip(state))]
pub async fn get_product_by_sku<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    let product = state.catalog.get_product_by_sku(&sku).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// DELETE /products/{id}: soft delete.
#[tracing::instrument(skip(state))]
pub async fn deactivate_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    state.catalog.deactivate_product(product_id).await?;
    Ok(Json(ApiResponse::message("Product deleted successfully")))
}
