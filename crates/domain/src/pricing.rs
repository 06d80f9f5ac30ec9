//! Checked money arithmetic for cart and order totals.

use common::Money;

use crate::error::{DomainError, Result};

/// Highest unit price the catalog accepts: 99,999,999.99.
pub const MAX_PRICE: Money = Money::from_cents(9_999_999_999);

/// `price * quantity`, failing with `Validation` instead of overflowing.
pub(crate) fn line_total(price: Money, quantity: i32) -> Result<Money> {
    price
        .checked_multiply(quantity)
        .ok_or_else(|| {
            DomainError::Validation(format!("Line total overflows: {price} x {quantity}"))
        })
}

/// Adds `amount` to a running total, failing with `Validation` on overflow.
pub(crate) fn accumulate(total: &mut Money, amount: Money) -> Result<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| DomainError::Validation("Total amount overflows".to_string()))?;
    Ok(())
}
