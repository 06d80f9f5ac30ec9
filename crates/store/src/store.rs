use async_trait::async_trait;
use common::{CartId, CartItemId, CategoryId, OrderId, ProductId, UserId};

use crate::Result;
use crate::model::{
    Cart, CartItem, Category, NewCartItem, NewCategory, NewOrder, NewOrderItem, NewProduct,
    NewUser, Order, OrderItem, OrderStatus, Product, User,
};

/// Entry point to the backing data store.
///
/// A `Store` is cheap to clone and is constructed once at process start,
/// then handed to every service that needs it.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// The transaction type produced by [`Store::begin`].
    type Tx: StoreTx + 'static;

    /// Opens a new atomic unit of work.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// One atomic unit of work.
///
/// Writes become visible to other units only after [`StoreTx::commit`].
/// Dropping a transaction without committing discards every write it made.
#[async_trait]
pub trait StoreTx: Send {
    /// Commits all writes made through this transaction.
    async fn commit(self) -> Result<()>;

    // Users

    async fn insert_user(&mut self, user: &NewUser) -> Result<User>;

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>>;

    // Catalog

    async fn insert_category(&mut self, category: &NewCategory) -> Result<Category>;

    async fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>>;

    /// Active categories ordered by name.
    async fn list_categories(&mut self) -> Result<Vec<Category>>;

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product>;

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    async fn get_product_by_sku(&mut self, sku: &str) -> Result<Option<Product>>;

    /// Active products, newest first.
    async fn list_products(&mut self) -> Result<Vec<Product>>;

    /// Reads a product and holds a write lock on its row until this
    /// transaction ends.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Adds `delta` to the product's stock and returns the new value.
    ///
    /// Fails with [`crate::StoreError::CheckViolation`] if the result would
    /// be negative.
    async fn adjust_stock(&mut self, id: ProductId, delta: i32) -> Result<i32>;

    async fn set_product_active(&mut self, id: ProductId, active: bool) -> Result<()>;

    // Carts

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<Cart>>;

    /// Returns the user's cart, creating an empty one if none exists.
    async fn ensure_cart(&mut self, user_id: UserId) -> Result<Cart>;

    /// Like [`StoreTx::find_cart`], holding a write lock on the cart row.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<Cart>>;

    /// Lines of a cart, oldest first.
    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>>;

    async fn get_cart_item(&mut self, id: CartItemId) -> Result<Option<CartItem>>;

    async fn find_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>>;

    async fn insert_cart_item(&mut self, item: &NewCartItem) -> Result<CartItem>;

    async fn set_cart_item_quantity(&mut self, id: CartItemId, quantity: i32) -> Result<()>;

    /// Deletes one line. Returns false if it did not exist.
    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<bool>;

    /// Deletes every line of a cart and returns how many were removed.
    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64>;

    // Orders

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order>;

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> Result<OrderItem>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Like [`StoreTx::get_order`], holding a write lock on the order row.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Orders placed by a user, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>>;

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()>;
}
