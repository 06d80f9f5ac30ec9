//! Read projections over placed orders.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, UserId};
use serde::Serialize;
use store::{Order, OrderStatus, Store, StoreTx};

use crate::catalog::ProductView;
use crate::error::{DomainError, Result};

/// A purchased line with its frozen price and the live product details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemView {
    pub id: OrderItemId,
    pub quantity: i32,
    pub price: f64,
    pub product: ProductView,
}

/// An order joined with its lines. Amounts are plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Builds the projection inside an open transaction.
    pub(crate) async fn load<T: StoreTx>(tx: &mut T, order: Order) -> Result<Self> {
        let mut items = Vec::new();
        for item in tx.order_items(order.id).await? {
            let product = tx
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Product", item.product_id))?;
            items.push(OrderItemView {
                id: item.id,
                quantity: item.quantity,
                price: item.price.as_decimal(),
                product: ProductView::load(tx, product).await?,
            });
        }

        Ok(Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            total_amount: order.total_amount.as_decimal(),
            shipping_address: order.shipping.address,
            shipping_city: order.shipping.city,
            shipping_state: order.shipping.state,
            shipping_zip: order.shipping.zip,
            items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

/// Read-side order lookups scoped to the calling user.
pub struct OrderQuery<S: Store> {
    store: S,
}

impl<S: Store> OrderQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads one of the caller's orders.
    ///
    /// Fails with `Forbidden` if the order belongs to someone else.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_id(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if order.user_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "order {order_id} belongs to another user"
            )));
        }

        OrderView::load(&mut tx, order).await
    }

    /// Lists the caller's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_user_orders(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        let mut tx = self.store.begin().await?;
        let orders = tx.orders_for_user(user_id).await?;

        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(OrderView::load(&mut tx, order).await?);
        }
        Ok(views)
    }
}
