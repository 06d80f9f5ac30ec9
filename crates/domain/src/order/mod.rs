//! Checkout, cancellation and order lookups.

mod number;
mod query;
mod service;

pub use number::generate_order_number;
pub use query::{OrderItemView, OrderQuery, OrderView};
pub use service::OrderService;
