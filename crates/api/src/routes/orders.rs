//! Checkout and order management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{OrderStatus, OrderView, ShippingInfo};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{CurrentUser, parse_id};
use crate::response::ApiResponse;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
}

impl From<CreateOrderRequest> for ShippingInfo {
    fn from(req: CreateOrderRequest) -> Self {
        ShippingInfo {
            address: req.shipping_address,
            city: req.shipping_city,
            state: req.shipping_state,
            zip: req.shipping_zip,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Handlers --

/// POST /orders: check out the caller's cart.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderView>>), ApiError> {
    let order = state.orders.create_order(user_id, req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(order, "Order created successfully")),
    ))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<Vec<OrderView>>>, ApiError> {
    let orders = state.orders.get_user_orders(user_id).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderView>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_order_by_id(user_id, order_id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// DELETE /orders/{id}: cancel and restock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderView>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.cancel_order(user_id, order_id).await?;
    Ok(Json(ApiResponse::with_message(
        order,
        "Order cancelled successfully",
    )))
}

/// PUT /orders/{id}/status: administrative status change.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderView>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: store::ParseOrderStatusError| ApiError::BadRequest(e.to_string()))?;

    let order = state.orders.update_order_status(order_id, status).await?;
    Ok(Json(ApiResponse::with_message(
        order,
        "Order status updated successfully",
    )))
}
