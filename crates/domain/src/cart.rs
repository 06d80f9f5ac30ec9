//! The cart aggregate: one cart per user, at most one line per product.
//!
//! Totals are derived from live product prices every time a cart is read,
//! never stored.

use common::{CartId, CartItemId, Money, ProductId, UserId};
use serde::Serialize;
use store::{Cart, NewCartItem, Store, StoreTx};

use crate::catalog::ProductView;
use crate::error::{DomainError, Result};
use crate::ledger::InventoryLedger;
use crate::pricing::{accumulate, line_total};

/// One line of a cart joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub quantity: i32,
    pub product: ProductView,
}

/// A cart with its lines and derived totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub items: Vec<CartLineView>,
    pub total_items: i32,
    pub total_price: f64,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    async fn load<T: StoreTx>(tx: &mut T, cart: &Cart) -> Result<Self> {
        let mut items = Vec::new();
        let mut total_items = 0;
        let mut total_price = Money::zero();

        for item in tx.cart_items(cart.id).await? {
            let product = tx
                .get_product(item.product_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Product", item.product_id))?;
            total_items = i32::checked_add(total_items, item.quantity)
                .ok_or_else(|| DomainError::Validation("Cart quantity overflows".to_string()))?;
            accumulate(&mut total_price, line_total(product.price, item.quantity)?)?;
            items.push(CartLineView {
                id: item.id,
                quantity: item.quantity,
                product: ProductView::load(tx, product).await?,
            });
        }

        Ok(Self {
            id: cart.id,
            items,
            total_items,
            total_price: total_price.as_decimal(),
        })
    }
}

/// Service for managing user carts.
pub struct CartService<S: Store> {
    store: S,
    ledger: InventoryLedger,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(),
        }
    }

    /// Returns the user's cart, creating an empty one on first use.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: UserId) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = ensure_cart(&mut tx, user_id).await?;
        let view = CartView::load(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Reads the user's cart without creating it.
    ///
    /// Fails with `NotFound` if the user has never had a cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = tx
            .find_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;
        CartView::load(&mut tx, &cart).await
    }

    /// Adds `quantity` units of a product, merging into an existing line.
    ///
    /// The combined quantity in the cart must not exceed live stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let mut tx = self.store.begin().await?;
        ensure_cart(&mut tx, user_id).await?;
        let cart = tx
            .lock_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;

        let existing = tx.find_cart_item(cart.id, product_id).await?;
        let already_in_cart = existing.as_ref().map_or(0, |item| item.quantity);
        let combined = already_in_cart
            .checked_add(quantity)
            .ok_or(DomainError::InvalidQuantity { quantity })?;
        self.ledger
            .ensure_available(&mut tx, product_id, combined)
            .await?;

        match existing {
            Some(item) => tx.set_cart_item_quantity(item.id, combined).await?,
            None => {
                tx.insert_cart_item(&NewCartItem {
                    cart_id: cart.id,
                    user_id,
                    product_id,
                    quantity,
                })
                .await?;
            }
        }

        let view = CartView::load(&mut tx, &cart).await?;
        tx.commit().await?;

        tracing::debug!(%user_id, %product_id, quantity = combined, "cart line updated");
        Ok(view)
    }

    /// Sets the quantity of one of the user's cart lines.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let item = tx
            .get_cart_item(item_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart item", item_id))?;

        if item.user_id != user_id {
            return Err(DomainError::Forbidden(format!(
                "cart item {item_id} belongs to another user"
            )));
        }
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let cart = tx
            .lock_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;
        let product = tx
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", item.product_id))?;
        if product.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product: product.name,
            });
        }

        tx.set_cart_item_quantity(item_id, quantity).await?;
        let view = CartView::load(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Removes one of the user's cart lines. Removing an absent line is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<CartView> {
        let mut tx = self.store.begin().await?;

        if let Some(item) = tx.get_cart_item(item_id).await? {
            if item.user_id != user_id {
                return Err(DomainError::Forbidden(format!(
                    "cart item {item_id} belongs to another user"
                )));
            }
            tx.delete_cart_item(item_id).await?;
        }

        let cart = ensure_cart(&mut tx, user_id).await?;
        let view = CartView::load(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Empties the user's cart. A missing or empty cart is left as is.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if let Some(cart) = tx.lock_cart(user_id).await? {
            let removed = tx.clear_cart(cart.id).await?;
            tracing::debug!(%user_id, removed, "cart cleared");
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn ensure_cart<T: StoreTx>(tx: &mut T, user_id: UserId) -> Result<Cart> {
    if tx.get_user(user_id).await?.is_none() {
        return Err(DomainError::not_found("User", user_id));
    }
    Ok(tx.ensure_cart(user_id).await?)
}
