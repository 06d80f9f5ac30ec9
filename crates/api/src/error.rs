//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

use crate::response::ApiResponse;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The caller identity is missing or malformed.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::InvalidState { .. } | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::InvalidQuantity { .. }
        | DomainError::InsufficientStock { .. }
        | DomainError::EmptyCart
        | DomainError::ProductInactive { .. }
        | DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Unavailable(store_err) => {
            tracing::error!(error = %store_err, "store unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable, please retry".to_string(),
            );
        }
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

#[cfg(test)]
mod tests {
    use domain::OrderStatus;
    use store::StoreError;

    use super::*;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(err).status_and_message().0
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(
            status_of(DomainError::NotFound {
                entity: "Order",
                id: "x".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::Forbidden("nope".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainError::InvalidState {
                current: OrderStatus::Delivered,
                action: "cancel"
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::InsufficientStock {
                product: "Lamp".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn hides_store_details() {
        let (status, message) = ApiError::from(DomainError::Unavailable(StoreError::Unavailable(
            "pool timed out".to_string(),
        )))
        .status_and_message();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!message.contains("pool"));
    }

    #[test]
    fn insufficient_stock_names_product() {
        let (_, message) = ApiError::from(DomainError::InsufficientStock {
            product: "Lamp".to_string(),
        })
        .status_and_message();
        assert!(message.contains("Lamp"));
    }
}
