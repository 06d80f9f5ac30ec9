//! Shared types for the storefront backend.
//!
//! Every crate in the workspace speaks in terms of these identifiers and the
//! [`Money`] amount, so they live at the bottom of the dependency graph.

mod ids;
mod money;

pub use ids::{CartId, CartItemId, CategoryId, OrderId, OrderItemId, ProductId, UserId};
pub use money::Money;
