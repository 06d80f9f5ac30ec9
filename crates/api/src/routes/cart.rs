//! Cart endpoints. All of them act on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CartItemId, ProductId};
use domain::CartView;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{CurrentUser, parse_id};
use crate::response::ApiResponse;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// GET /cart: the caller's cart, created on first access.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let cart = state.carts.get_or_create(user_id).await?;
    Ok(Json(ApiResponse::ok(cart)))
}

/// POST /cart: add a product to the cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let product_id: ProductId = parse_id(&req.product_id, "product")?;
    let cart = state
        .carts
        .add_item(user_id, product_id, req.quantity)
        .await?;
    Ok(Json(ApiResponse::with_message(cart, "Item added to cart")))
}

/// PUT /cart/{item_id}: set a line's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let item_id: CartItemId = parse_id(&item_id, "cart item")?;
    let cart = state
        .carts
        .update_item(user_id, item_id, req.quantity)
        .await?;
    Ok(Json(ApiResponse::with_message(cart, "Cart item updated")))
}

/// DELETE /cart/{item_id}: remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<String>,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    let item_id: CartItemId = parse_id(&item_id, "cart item")?;
    let cart = state.carts.remove_item(user_id, item_id).await?;
    Ok(Json(ApiResponse::with_message(cart, "Item removed from cart")))
}

/// DELETE /cart: empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.carts.clear(user_id).await?;
    Ok(Json(ApiResponse::message("Cart cleared")))
}
