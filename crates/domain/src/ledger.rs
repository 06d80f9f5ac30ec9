//! Stock accounting.
//!
//! All changes to `Product.stock` go through [`InventoryLedger`], always
//! inside the caller's transaction, so they commit or roll back together
//! with the rest of the unit of work.

use common::ProductId;
use store::{Product, StoreTx};

use crate::error::{DomainError, Result};

/// Guards the non-negative stock invariant.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    pub fn new() -> Self {
        Self
    }

    /// Takes `quantity` units of a product out of stock.
    ///
    /// The product row stays locked until `tx` ends, so concurrent
    /// reservations of the same product are serialized. Fails with
    /// `InsufficientStock` if the product is inactive or has fewer than
    /// `quantity` units. Returns the product as it was before the decrement.
    pub async fn reserve<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Product> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let product = tx
            .lock_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;

        if !product.is_active || product.stock < quantity {
            tracing::debug!(
                %product_id,
                available = product.stock,
                requested = quantity,
                active = product.is_active,
                "reservation rejected"
            );
            return Err(DomainError::InsufficientStock {
                product: product.name,
            });
        }

        tx.adjust_stock(product_id, -quantity).await?;
        Ok(product)
    }

    /// Puts `quantity` units of a product back into stock.
    ///
    /// Returns the new stock level.
    pub async fn release<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        tx.lock_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;

        Ok(tx.adjust_stock(product_id, quantity).await?)
    }

    /// Checks, without reserving, that `quantity` units could be bought now.
    ///
    /// Distinguishes a deactivated product (`ProductInactive`) from one that
    /// is merely short (`InsufficientStock`).
    pub async fn ensure_available<T: StoreTx>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Product> {
        let product = tx
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;

        if !product.is_active {
            return Err(DomainError::ProductInactive {
                product: product.name,
            });
        }
        if product.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product: product.name,
            });
        }
        Ok(product)
    }
}
