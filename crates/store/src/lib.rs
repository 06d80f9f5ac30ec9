//! Transactional storage for the storefront.
//!
//! Every business operation runs inside one [`StoreTx`] obtained from
//! [`Store::begin`]: either it commits all of its writes or none of them
//! survive. Two implementations are provided, [`PostgresStore`] for
//! production and [`InMemoryStore`] for tests and local runs.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{CartId, CartItemId, CategoryId, Money, OrderId, OrderItemId, ProductId, UserId};
pub use error::{Result, StoreError, constraints};
pub use memory::{InMemoryStore, InMemoryTx};
pub use model::{
    Cart, CartItem, Category, NewCartItem, NewCategory, NewOrder, NewOrderItem, NewProduct,
    NewUser, Order, OrderItem, OrderStatus, ParseOrderStatusError, Product, ShippingInfo, User,
};
pub use postgres::{PostgresStore, PostgresTx};
pub use store::{Store, StoreTx};
