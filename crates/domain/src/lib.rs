//! Domain layer for the storefront backend.
//!
//! This crate provides the business operations built on top of the
//! transactional [`store`]:
//! - [`InventoryLedger`] guarding non-negative product stock
//! - [`CartService`] managing the single cart each user owns
//! - [`OrderService`] turning a cart into an order and cancelling it
//! - [`OrderQuery`] read projections over placed orders
//! - [`CatalogService`] and [`AccountService`] for the records the
//!   workflows depend on

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod order;
mod pricing;

pub use account::AccountService;
pub use cart::{CartLineView, CartService, CartView};
pub use catalog::{CatalogService, CategoryView, ProductView};
pub use error::{DomainError, Result};
pub use ledger::InventoryLedger;
pub use pricing::MAX_PRICE;
pub use order::{
    OrderItemView, OrderQuery, OrderService, OrderView, generate_order_number,
};
pub use store::{OrderStatus, ShippingInfo};
