//! User registration and lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use store::{NewUser, Store, User};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::response::ApiResponse;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// POST /users
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let user = state
        .accounts
        .register(NewUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(user, "User registered successfully")),
    ))
}

/// GET /users/me
#[tracing::instrument(skip(state))]
pub async fn me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.accounts.get(user_id).await?;
    Ok(Json(ApiResponse::ok(user)))
}
