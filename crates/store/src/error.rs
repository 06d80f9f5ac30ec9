use thiserror::Error;

/// Names of the constraints the schema enforces.
///
/// The in-memory store reports violations under the same names as
/// PostgreSQL so callers can match on them regardless of backend.
pub mod constraints {
    pub const USER_EMAIL: &str = "users_email_key";
    pub const CATEGORY_NAME: &str = "categories_name_key";
    pub const CATEGORY_SLUG: &str = "categories_slug_key";
    pub const PRODUCT_SKU: &str = "products_sku_key";
    pub const PRODUCT_STOCK: &str = "products_stock_non_negative";
    pub const CART_USER: &str = "carts_user_id_key";
    pub const CART_ITEM_PRODUCT: &str = "cart_items_cart_id_product_id_key";
    pub const ORDER_NUMBER: &str = "orders_order_number_key";
}

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A referenced row does not exist.
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// A check constraint rejected the write.
    #[error("Check constraint violated: {constraint}")]
    CheckViolation { constraint: String },

    /// The row targeted by an update does not exist.
    #[error("{entity} not found: {id}")]
    RowNotFound { entity: &'static str, id: String },

    /// A stored value could not be decoded.
    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    /// The store could not be reached or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if this is a unique violation of the named constraint.
    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.kind() {
                ErrorKind::UniqueViolation => return StoreError::UniqueViolation { constraint },
                ErrorKind::ForeignKeyViolation => {
                    return StoreError::ForeignKeyViolation { constraint };
                }
                ErrorKind::CheckViolation => return StoreError::CheckViolation { constraint },
                _ => {}
            }
        }

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_unique_violation_by_name() {
        let err = StoreError::UniqueViolation {
            constraint: constraints::ORDER_NUMBER.to_string(),
        };
        assert!(err.is_unique_violation(constraints::ORDER_NUMBER));
        assert!(!err.is_unique_violation(constraints::PRODUCT_SKU));
    }

    #[test]
    fn pool_timeout_maps_to_unavailable() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
