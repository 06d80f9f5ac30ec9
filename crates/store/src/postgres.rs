use async_trait::async_trait;
use chrono::Utc;
use common::{
    CartId, CartItemId, CategoryId, Money, OrderId, OrderItemId, ProductId, UserId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::model::{
    Cart, CartItem, Category, NewCartItem, NewCategory, NewOrder, NewOrderItem, NewProduct,
    NewUser, Order, OrderItem, OrderStatus, Product, ShippingInfo, User,
};
use crate::store::{Store, StoreTx};
use crate::{Result, StoreError};

const PRODUCT_COLUMNS: &str = "id, name, description, sku, price_cents, stock, images, \
     category_id, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, order_number, status, total_cents, shipping_address, \
     shipping_city, shipping_state, shipping_zip, created_at, updated_at";

const CART_ITEM_COLUMNS: &str =
    "id, cart_id, user_id, product_id, quantity, created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Transactions run at the default READ COMMITTED isolation level; rows that
/// a unit of work depends on are locked explicitly with `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTx { tx })
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back on drop unless committed.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

fn row_to_user(row: PgRow) -> Result<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_category(row: PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        sku: row.try_get("sku")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: row.try_get("stock")?,
        images: row.try_get("images")?,
        category_id: CategoryId::from_uuid(row.try_get::<Uuid, _>("category_id")?),
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart(row: PgRow) -> Result<Cart> {
    Ok(Cart {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status: OrderStatus = status
        .parse()
        .map_err(|e: crate::ParseOrderStatusError| StoreError::InvalidData(e.to_string()))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        order_number: row.try_get("order_number")?,
        status,
        total_amount: Money::from_cents(row.try_get("total_cents")?),
        shipping: ShippingInfo {
            address: row.try_get("shipping_address")?,
            city: row.try_get("shipping_city")?,
            state: row.try_get("shipping_state")?,
            zip: row.try_get("shipping_zip")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        created_at: row.try_get("created_at")?,
    })
}

fn expect_one_row(rows_affected: u64, entity: &'static str, id: impl ToString) -> Result<()> {
    if rows_affected == 0 {
        return Err(StoreError::RowNotFound {
            entity,
            id: id.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn insert_user(&mut self, user: &NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, first_name, last_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_user(row)
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>> {
        sqlx::query("SELECT id, email, first_name, last_name, created_at FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_user)
            .transpose()
    }

    async fn insert_category(&mut self, category: &NewCategory) -> Result<Category> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $5)
            RETURNING id, name, slug, description, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_category(row)
    }

    async fn get_category(&mut self, id: CategoryId) -> Result<Option<Category>> {
        sqlx::query(
            "SELECT id, name, slug, description, is_active, created_at, updated_at \
             FROM categories WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_category)
        .transpose()
    }

    async fn list_categories(&mut self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, description, is_active, created_at, updated_at \
             FROM categories WHERE is_active ORDER BY name ASC",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_category).collect()
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, name, description, sku, price_cents, stock, images,
                                  category_id, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $9)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(&product.images)
        .bind(product.category_id.as_uuid())
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_product(row)
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_product)
            .transpose()
    }

    async fn get_product_by_sku(&mut self, sku: &str) -> Result<Option<Product>> {
        sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_product)
            .transpose()
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active ORDER BY created_at DESC, name ASC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_product)
        .transpose()
    }

    async fn adjust_stock(&mut self, id: ProductId, delta: i32) -> Result<i32> {
        let stock: Option<i32> = sqlx::query_scalar(
            "UPDATE products SET stock = stock + $2, updated_at = $3 WHERE id = $1 RETURNING stock",
        )
        .bind(id.as_uuid())
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&mut *self.tx)
        .await?;

        stock.ok_or_else(|| StoreError::RowNotFound {
            entity: "Product",
            id: id.to_string(),
        })
    }

    async fn set_product_active(&mut self, id: ProductId, active: bool) -> Result<()> {
        let result =
            sqlx::query("UPDATE products SET is_active = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(active)
                .bind(Utc::now())
                .execute(&mut *self.tx)
                .await?;

        expect_one_row(result.rows_affected(), "Product", id)
    }

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        sqlx::query("SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_cart)
            .transpose()
    }

    async fn ensure_cart(&mut self, user_id: UserId) -> Result<Cart> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        self.find_cart(user_id).await?.ok_or_else(|| StoreError::RowNotFound {
            entity: "Cart",
            id: user_id.to_string(),
        })
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<Cart>> {
        sqlx::query(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_cart)
        .transpose()
    }

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY created_at ASC"
        ))
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_cart_item).collect()
    }

    async fn get_cart_item(&mut self, id: CartItemId) -> Result<Option<CartItem>> {
        sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_cart_item)
        .transpose()
    }

    async fn find_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>> {
        sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 AND product_id = $2"
        ))
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_cart_item)
        .transpose()
    }

    async fn insert_cart_item(&mut self, item: &NewCartItem) -> Result<CartItem> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items (id, cart_id, user_id, product_id, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {CART_ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(item.cart_id.as_uuid())
        .bind(item.user_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_cart_item(row)
    }

    async fn set_cart_item_quantity(&mut self, id: CartItemId, quantity: i32) -> Result<()> {
        let result =
            sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = $3 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(quantity)
                .bind(Utc::now())
                .execute(&mut *self.tx)
                .await?;

        expect_one_row(result.rows_affected(), "CartItem", id)
    }

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (id, user_id, order_number, status, total_cents, shipping_address,
                                shipping_city, shipping_state, shipping_zip, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(order.user_id.as_uuid())
        .bind(&order.order_number)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total_amount.cents())
        .bind(&order.shipping.address)
        .bind(&order.shipping.city)
        .bind(&order.shipping.state)
        .bind(&order.shipping.zip)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(row)
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> Result<OrderItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price_cents, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, order_id, product_id, quantity, price_cents, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(item.price.cents())
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order_item(row)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(row_to_order)
            .transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .map(row_to_order)
        .transpose()
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, price_cents, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&mut *self.tx)
            .await?;

        expect_one_row(result.rows_affected(), "Order", id)
    }
}
