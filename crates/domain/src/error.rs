//! Domain error types.

use store::{OrderStatus, StoreError};
use thiserror::Error;

/// Errors that can occur during domain operations.
///
/// Every variant except [`DomainError::Unavailable`] describes a request the
/// caller can correct; none of them leaves persisted state partially changed.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The entity belongs to another user.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The order's status does not allow the requested action.
    #[error("Invalid state transition: cannot {action} from {current} status")]
    InvalidState {
        current: OrderStatus,
        action: &'static str,
    },

    /// A line quantity was zero or negative.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i32 },

    /// Not enough stock to satisfy the request.
    #[error("Insufficient stock for {product}")]
    InsufficientStock { product: String },

    /// Checkout was attempted with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The product has been deactivated.
    #[error("Product is not available: {product}")]
    ProductInactive { product: String },

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The entity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing store failed; the caller may retry.
    #[error("Store unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
