//! Order workflow: checkout and cancellation as atomic units.

use std::time::Instant;

use common::{Money, OrderId, UserId};
use store::{
    NewOrder, NewOrderItem, Order, OrderStatus, ShippingInfo, Store, StoreTx, constraints,
};

use super::number::generate_order_number;
use super::query::{OrderQuery, OrderView};
use crate::error::{DomainError, Result};
use crate::ledger::InventoryLedger;
use crate::pricing::{accumulate, line_total};

/// How many fresh order numbers checkout tries before giving up.
const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Service for placing and managing orders.
///
/// Each mutating operation runs as one store transaction: on any error the
/// transaction is dropped and none of its effects survive.
pub struct OrderService<S: Store> {
    store: S,
    ledger: InventoryLedger,
    query: OrderQuery<S>,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            query: OrderQuery::new(store.clone()),
            ledger: InventoryLedger::new(),
            store,
        }
    }

    /// Turns the user's cart into a `PENDING` order.
    ///
    /// Within one transaction: locks the cart and every product in it,
    /// reserves stock for every line, writes the order and its line
    /// snapshots, and empties the cart.
    #[tracing::instrument(skip(self, shipping))]
    pub async fn create_order(&self, user_id: UserId, shipping: ShippingInfo) -> Result<OrderView> {
        let started = Instant::now();
        let mut attempt = 1;

        let result = loop {
            let order_number = generate_order_number();
            match self.checkout(user_id, &shipping, order_number).await {
                Err(DomainError::Unavailable(ref e))
                    if e.is_unique_violation(constraints::ORDER_NUMBER)
                        && attempt < MAX_ORDER_NUMBER_ATTEMPTS =>
                {
                    tracing::warn!(attempt, "order number collision, retrying");
                    attempt += 1;
                }
                other => break other,
            }
        };

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    total = order.total_amount,
                    lines = order.items.len(),
                    "order created"
                );
            }
            Err(DomainError::Unavailable(e)) => {
                tracing::error!(error = %e, "checkout failed");
            }
            Err(e) => {
                metrics::counter!("checkout_rejected_total").increment(1);
                tracing::info!(error = %e, "checkout rejected");
            }
        }

        result
    }

    async fn checkout(
        &self,
        user_id: UserId,
        shipping: &ShippingInfo,
        order_number: String,
    ) -> Result<OrderView> {
        validate_shipping(shipping)?;
        let mut tx = self.store.begin().await?;

        let cart = tx.lock_cart(user_id).await?.ok_or(DomainError::EmptyCart)?;
        let mut lines = tx.cart_items(cart.id).await?;
        if lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        // A fixed lock order keeps concurrent checkouts from deadlocking.
        lines.sort_by_key(|line| line.product_id);

        let mut total = Money::zero();
        let mut snapshots = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self
                .ledger
                .reserve(&mut tx, line.product_id, line.quantity)
                .await?;
            accumulate(&mut total, line_total(product.price, line.quantity)?)?;
            snapshots.push((line.product_id, line.quantity, product.price));
        }

        let order = tx
            .insert_order(&NewOrder {
                user_id,
                order_number,
                total_amount: total,
                shipping: shipping.clone(),
            })
            .await?;

        for (product_id, quantity, price) in snapshots {
            tx.insert_order_item(&NewOrderItem {
                order_id: order.id,
                product_id,
                quantity,
                price,
            })
            .await?;
        }

        tx.clear_cart(cart.id).await?;

        let view = OrderView::load(&mut tx, order).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Cancels one of the user's orders and puts its stock back.
    ///
    /// Fails with `InvalidState` once the order is `DELIVERED` or `CANCELLED`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if order.user_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "order {order_id} belongs to another user"
            )));
        }

        let view = self.cancel_locked(&mut tx, order).await?;
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, order_number = %view.order_number, "order cancelled");
        Ok(view)
    }

    /// Administrative status change.
    ///
    /// Any status may be set while the order is not terminal. Setting
    /// `CANCELLED` restores stock exactly as [`OrderService::cancel_order`] does.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<OrderView> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        let view = if status == OrderStatus::Cancelled {
            let view = self.cancel_locked(&mut tx, order).await?;
            metrics::counter!("orders_cancelled_total").increment(1);
            view
        } else {
            if order.status.is_terminal() {
                return Err(DomainError::InvalidState {
                    current: order.status,
                    action: "change status",
                });
            }
            tx.set_order_status(order_id, status).await?;
            let order = tx
                .get_order(order_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Order", order_id))?;
            OrderView::load(&mut tx, order).await?
        };
        tx.commit().await?;

        tracing::info!(%order_id, %status, "order status updated");
        Ok(view)
    }

    /// Loads one of the caller's orders.
    pub async fn get_order_by_id(&self, user_id: UserId, order_id: OrderId) -> Result<OrderView> {
        self.query.get_order_by_id(user_id, order_id).await
    }

    /// Lists the caller's orders, newest first.
    pub async fn get_user_orders(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        self.query.get_user_orders(user_id).await
    }

    async fn cancel_locked(&self, tx: &mut S::Tx, order: Order) -> Result<OrderView> {
        if !order.status.can_cancel() {
            return Err(DomainError::InvalidState {
                current: order.status,
                action: "cancel",
            });
        }

        let mut items = tx.order_items(order.id).await?;
        items.sort_by_key(|item| item.product_id);
        for item in &items {
            self.ledger
                .release(tx, item.product_id, item.quantity)
                .await?;
        }

        tx.set_order_status(order.id, OrderStatus::Cancelled).await?;
        let order = tx
            .get_order(order.id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order.id))?;
        OrderView::load(tx, order).await
    }
}

fn validate_shipping(shipping: &ShippingInfo) -> Result<()> {
    for (field, value) in [
        ("shipping_address", &shipping.address),
        ("shipping_city", &shipping.city),
        ("shipping_state", &shipping.state),
        ("shipping_zip", &shipping.zip),
    ] {
        if value.trim().is_empty() {
            return Err(DomainError::Validation(format!("{field} is required")));
        }
    }
    Ok(())
}
