use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartItemId, CategoryId, OrderId, OrderItemId, ProductId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    Cart, CartItem, Category, NewCartItem, NewCategory, NewOrder, NewOrderItem, NewProduct,
    NewUser, Order, OrderItem, OrderStatus, Product, User,
};
use crate::store::{Store, StoreTx};
use crate::{Result, StoreError, constraints};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_order_items: AtomicBool,
    fail_on_commit: AtomicBool,
}

/// In-memory store implementation for testing and local runs.
///
/// Transactions are fully serialized: [`Store::begin`] takes an exclusive
/// lock on the whole data set and works on a private copy, which replaces
/// the shared state on commit. A dropped transaction leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `insert_order_item` call fail until reset.
    pub fn set_fail_on_order_items(&self, fail: bool) {
        self.faults.fail_on_order_items.store(fail, Ordering::SeqCst);
    }

    /// Makes every `commit` call fail until reset.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.faults.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx {
            guard,
            working,
            faults: self.faults.clone(),
        })
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<Faults>,
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

fn row_not_found(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::RowNotFound {
        entity,
        id: id.to_string(),
    }
}

impl InMemoryTx {
    fn require_user(&self, id: UserId, constraint: &str) -> Result<()> {
        if self.working.users.contains_key(&id) {
            Ok(())
        } else {
            Err(foreign_key(constraint))
        }
    }

    fn require_product(&self, id: ProductId, constraint: &str) -> Result<()> {
        if self.working.products.contains_key(&id) {
            Ok(())
        } else {
            Err(foreign_key(constraint))
        }
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn commit(self) -> Result<()> {
        if self.faults.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }
        let InMemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User> {
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(unique(constraints::USER_EMAIL));
        }
        let record = User {
            id: UserId::new(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: Utc::now(),
        };
        self.working.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn insert_category(&mut self, category: &NewCategory) -> Result<Category> {
        let existing = self.working.categories.values();
        for c in existing {
            if c.name == category.name {
                return Err(unique(constraints::CATEGORY_NAME));
            }
            if c.slug == category.slug {
                return Err(unique(constraints::CATEGORY_SLUG));
            }
        }
        let now = Utc::now();
        let record = Category {
            id: CategoryId::new(),
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.working.categories.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.working.categories.get(&id).cloned())
    }

    async fn list_categories(&mut self) -> Result<Vec<Category>> {
        let mut categories: Vec<_> = self
            .working
            .categories
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product> {
        if self.working.products.values().any(|p| p.sku == product.sku) {
            return Err(unique(constraints::PRODUCT_SKU));
        }
        if !self.working.categories.contains_key(&product.category_id) {
            return Err(foreign_key("products_category_id_fkey"));
        }
        if product.stock < 0 {
            return Err(StoreError::CheckViolation {
                constraint: constraints::PRODUCT_STOCK.to_string(),
            });
        }
        let now = Utc::now();
        let record = Product {
            id: ProductId::new(),
            name: product.name.clone(),
            description: product.description.clone(),
            sku: product.sku.clone(),
            price: product.price,
            stock: product.stock,
            images: product.images.clone(),
            category_id: product.category_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.working.products.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn get_product_by_sku(&mut self, sku: &str) -> Result<Option<Product>> {
        Ok(self
            .working
            .products
            .values()
            .find(|p| p.sku == sku)
            .cloned())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let mut products: Vec<_> = self
            .working
            .products
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(products)
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        // The whole state is already held exclusively by this transaction.
        self.get_product(id).await
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: i32) -> Result<i32> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or_else(|| row_not_found("Product", id))?;
        let new_stock = product
            .stock
            .checked_add(delta)
            .filter(|stock| *stock >= 0)
            .ok_or_else(|| StoreError::CheckViolation {
                constraint: constraints::PRODUCT_STOCK.to_string(),
            })?;
        product.stock = new_stock;
        product.updated_at = Utc::now();
        Ok(new_stock)
    }

    async fn set_product_active(&mut self, id: ProductId, active: bool) -> Result<()> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or_else(|| row_not_found("Product", id))?;
        product.is_active = active;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self
            .working
            .carts
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn ensure_cart(&mut self, user_id: UserId) -> Result<Cart> {
        if let Some(cart) = self.find_cart(user_id).await? {
            return Ok(cart);
        }
        self.require_user(user_id, "carts_user_id_fkey")?;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        self.working.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        self.find_cart(user_id).await
    }

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>> {
        Ok(self
            .working
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn get_cart_item(&mut self, id: CartItemId) -> Result<Option<CartItem>> {
        Ok(self.working.cart_items.iter().find(|i| i.id == id).cloned())
    }

    async fn find_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        Ok(self
            .working
            .cart_items
            .iter()
            .find(|i| i.cart_id == cart_id && i.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_item(&mut self, item: &NewCartItem) -> Result<CartItem> {
        if !self.working.carts.contains_key(&item.cart_id) {
            return Err(foreign_key("cart_items_cart_id_fkey"));
        }
        self.require_user(item.user_id, "cart_items_user_id_fkey")?;
        self.require_product(item.product_id, "cart_items_product_id_fkey")?;
        if self.find_cart_item(item.cart_id, item.product_id).await?.is_some() {
            return Err(unique(constraints::CART_ITEM_PRODUCT));
        }
        let now = Utc::now();
        let record = CartItem {
            id: CartItemId::new(),
            cart_id: item.cart_id,
            user_id: item.user_id,
            product_id: item.product_id,
            quantity: item.quantity,
            created_at: now,
            updated_at: now,
        };
        self.working.cart_items.push(record.clone());
        Ok(record)
    }

    async fn set_cart_item_quantity(&mut self, id: CartItemId, quantity: i32) -> Result<()> {
        let item = self
            .working
            .cart_items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| row_not_found("CartItem", id))?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<bool> {
        let before = self.working.cart_items.len();
        self.working.cart_items.retain(|i| i.id != id);
        Ok(self.working.cart_items.len() != before)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64> {
        let before = self.working.cart_items.len();
        self.working.cart_items.retain(|i| i.cart_id != cart_id);
        Ok((before - self.working.cart_items.len()) as u64)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        if self
            .working
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(unique(constraints::ORDER_NUMBER));
        }
        self.require_user(order.user_id, "orders_user_id_fkey")?;
        let now = Utc::now();
        let record = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            order_number: order.order_number.clone(),
            status: OrderStatus::Pending,
            total_amount: order.total_amount,
            shipping: order.shipping.clone(),
            created_at: now,
            updated_at: now,
        };
        self.working.orders.push(record.clone());
        Ok(record)
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> Result<OrderItem> {
        if self.faults.fail_on_order_items.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "order item insert failed".to_string(),
            ));
        }
        if !self.working.orders.iter().any(|o| o.id == item.order_id) {
            return Err(foreign_key("order_items_order_id_fkey"));
        }
        self.require_product(item.product_id, "order_items_product_id_fkey")?;
        let record = OrderItem {
            id: OrderItemId::new(),
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            created_at: Utc::now(),
        };
        self.working.order_items.push(record.clone());
        Ok(record)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.get_order(id).await
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .working
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        // Reverse insertion order first so equal timestamps still come out newest first.
        let mut orders: Vec<_> = self
            .working
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        let order = self
            .working
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| row_not_found("Order", id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }
}
