//! Integration tests for the cart → order workflow.
//!
//! These tests drive the public services against the in-memory store and
//! check the stock, cart and order invariants across whole workflows.

use domain::{
    AccountService, CartService, CatalogService, DomainError, OrderService, OrderStatus,
    ShippingInfo,
};
use store::{
    InMemoryStore, Money, NewCategory, NewProduct, NewUser, ProductId, Store, StoreTx, UserId,
};

struct Shop {
    store: InMemoryStore,
    catalog: CatalogService<InMemoryStore>,
    carts: CartService<InMemoryStore>,
    orders: OrderService<InMemoryStore>,
    accounts: AccountService<InMemoryStore>,
}

impl Shop {
    fn new() -> Self {
        let store = InMemoryStore::new();
        Self {
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            accounts: AccountService::new(store.clone()),
            store,
        }
    }

    async fn user(&self, name: &str) -> UserId {
        self.accounts
            .register(NewUser {
                email: format!("{}@example.com", name.to_lowercase()),
                first_name: name.to_string(),
                last_name: "Tester".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn product(&self, name: &str, price_units: i64, stock: i32) -> ProductId {
        let category = match self.catalog.list_categories().await.unwrap().pop() {
            Some(category) => category,
            None => self
                .catalog
                .create_category(NewCategory {
                    name: "General".to_string(),
                    slug: "general".to_string(),
                    description: None,
                })
                .await
                .unwrap(),
        };

        self.catalog
            .create_product(NewProduct {
                name: name.to_string(),
                description: None,
                sku: format!("SKU-{}", name.to_uppercase()),
                price: Money::from_units(price_units),
                stock,
                images: vec![],
                category_id: category.id,
            })
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, product_id: ProductId) -> i32 {
        self.catalog.get_product(product_id).await.unwrap().stock
    }

    async fn all_stock_non_negative(&self) -> bool {
        let mut tx = self.store.begin().await.unwrap();
        tx.list_products()
            .await
            .unwrap()
            .iter()
            .all(|product| product.stock >= 0)
    }
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        address: "1 Infinite Loop".to_string(),
        city: "Cupertino".to_string(),
        state: "CA".to_string(),
        zip: "95014".to_string(),
    }
}

mod checkout {
    use super::*;

    #[tokio::test]
    async fn two_line_cart_becomes_order() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 5).await;
        let b = shop.product("Bucket", 50, 1).await;
        shop.carts.add_item(user, a, 2).await.unwrap();
        shop.carts.add_item(user, b, 1).await.unwrap();

        let order = shop.orders.create_order(user, shipping()).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 250.0);
        assert_eq!(order.items.len(), 2);
        let mut prices: Vec<f64> = order.items.iter().map(|item| item.price).collect();
        prices.sort_by(f64::total_cmp);
        assert_eq!(prices, vec![50.0, 100.0]);

        assert_eq!(shop.stock(a).await, 3);
        assert_eq!(shop.stock(b).await, 0);
        assert!(shop.carts.get_or_create(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_line_aborts_whole_checkout() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let rival = shop.user("Grace").await;
        let a = shop.product("Anvil", 100, 5).await;
        let b = shop.product("Bucket", 50, 1).await;
        shop.carts.add_item(user, a, 2).await.unwrap();
        shop.carts.add_item(user, b, 1).await.unwrap();

        // The last bucket sells to someone else first.
        shop.carts.add_item(rival, b, 1).await.unwrap();
        shop.orders.create_order(rival, shipping()).await.unwrap();

        let err = shop
            .orders
            .create_order(user, shipping())
            .await
            .unwrap_err();

        match err {
            DomainError::InsufficientStock { product } => assert_eq!(product, "Bucket"),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(shop.stock(a).await, 5);
        assert_eq!(shop.stock(b).await, 0);
        assert_eq!(shop.carts.get_or_create(user).await.unwrap().items.len(), 2);
        assert!(shop.orders.get_user_orders(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cart_creates_nothing() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        shop.carts.get_or_create(user).await.unwrap();

        let err = shop
            .orders
            .create_order(user, shipping())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::EmptyCart));
        assert_eq!(shop.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn order_keeps_purchase_price() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 5).await;
        shop.carts.add_item(user, a, 1).await.unwrap();
        let order = shop.orders.create_order(user, shipping()).await.unwrap();

        shop.catalog.deactivate_product(a).await.unwrap();

        let reloaded = shop.orders.get_order_by_id(user, order.id).await.unwrap();
        assert_eq!(reloaded.items[0].price, 100.0);
        assert!(!reloaded.items[0].product.is_active);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checkouts_cannot_oversell() {
        let shop = Shop::new();
        let last = shop.product("Lamp", 30, 1).await;

        let mut buyers = Vec::new();
        for name in ["Ada", "Grace", "Barbara", "Frances"] {
            let user = shop.user(name).await;
            shop.carts.add_item(user, last, 1).await.unwrap();
            buyers.push(user);
        }

        let results = futures_util::future::join_all(
            buyers
                .iter()
                .map(|user| shop.orders.create_order(*user, shipping())),
        )
        .await;

        let placed = results.iter().filter(|result| result.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|result| matches!(result, Err(DomainError::InsufficientStock { .. })))
            .count();
        assert_eq!(placed, 1);
        assert_eq!(rejected, buyers.len() - 1);
        assert_eq!(shop.stock(last).await, 0);
        assert_eq!(shop.store.order_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn spawned_checkouts_cannot_oversell() {
        let shop = Shop::new();
        let lamp = shop.product("Lamp", 30, 3).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let user = shop.user(&format!("buyer{i}")).await;
            shop.carts.add_item(user, lamp, 1).await.unwrap();
            let orders = OrderService::new(shop.store.clone());
            handles.push(tokio::spawn(async move {
                orders.create_order(user, shipping()).await
            }));
        }

        let mut placed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                placed += 1;
            }
        }

        assert_eq!(placed, 3);
        assert_eq!(shop.stock(lamp).await, 0);
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn cancel_then_lookup_shows_restored_stock() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 5).await;
        let b = shop.product("Bucket", 50, 1).await;
        shop.carts.add_item(user, a, 2).await.unwrap();
        shop.carts.add_item(user, b, 1).await.unwrap();
        let order = shop.orders.create_order(user, shipping()).await.unwrap();

        shop.orders.cancel_order(user, order.id).await.unwrap();
        let reloaded = shop.orders.get_order_by_id(user, order.id).await.unwrap();

        assert_eq!(reloaded.status, OrderStatus::Cancelled);
        assert_eq!(shop.stock(a).await, 5);
        assert_eq!(shop.stock(b).await, 1);
    }

    #[tokio::test]
    async fn delivered_order_cannot_be_cancelled() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 5).await;
        shop.carts.add_item(user, a, 2).await.unwrap();
        let order = shop.orders.create_order(user, shipping()).await.unwrap();
        shop.orders
            .update_order_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        let err = shop.orders.cancel_order(user, order.id).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::InvalidState {
                current: OrderStatus::Delivered,
                ..
            }
        ));
        assert_eq!(shop.stock(a).await, 3);
    }

    #[tokio::test]
    async fn stock_stays_non_negative_across_workflows() {
        let shop = Shop::new();
        let ada = shop.user("Ada").await;
        let grace = shop.user("Grace").await;
        let a = shop.product("Anvil", 100, 2).await;

        shop.carts.add_item(ada, a, 2).await.unwrap();
        shop.carts.add_item(grace, a, 1).await.unwrap();
        let first = shop.orders.create_order(ada, shipping()).await.unwrap();
        assert!(shop.all_stock_non_negative().await);

        assert!(shop.orders.create_order(grace, shipping()).await.is_err());
        assert!(shop.all_stock_non_negative().await);

        shop.orders.cancel_order(ada, first.id).await.unwrap();
        shop.orders.create_order(grace, shipping()).await.unwrap();
        assert!(shop.all_stock_non_negative().await);
        assert_eq!(shop.stock(a).await, 1);
    }
}

mod ownership {
    use super::*;

    #[tokio::test]
    async fn other_users_cannot_touch_orders() {
        let shop = Shop::new();
        let ada = shop.user("Ada").await;
        let grace = shop.user("Grace").await;
        let a = shop.product("Anvil", 100, 5).await;
        shop.carts.add_item(ada, a, 1).await.unwrap();
        let order = shop.orders.create_order(ada, shipping()).await.unwrap();

        assert!(matches!(
            shop.orders.get_order_by_id(grace, order.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            shop.orders.cancel_order(grace, order.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert_eq!(shop.stock(a).await, 4);
    }

    #[tokio::test]
    async fn orders_are_listed_newest_first() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 5).await;

        let mut placed = Vec::new();
        for _ in 0..3 {
            shop.carts.add_item(user, a, 1).await.unwrap();
            placed.push(shop.orders.create_order(user, shipping()).await.unwrap().id);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let listed: Vec<_> = shop
            .orders
            .get_user_orders(user)
            .await
            .unwrap()
            .into_iter()
            .map(|order| order.id)
            .collect();
        placed.reverse();
        assert_eq!(listed, placed);
    }
}

mod cart {
    use super::*;

    #[tokio::test]
    async fn clearing_twice_is_a_no_op() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 5).await;
        shop.carts.add_item(user, a, 2).await.unwrap();

        shop.carts.clear(user).await.unwrap();
        shop.carts.clear(user).await.unwrap();

        let cart = shop.carts.get_or_create(user).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_items, 0);
        assert_eq!(shop.stock(a).await, 5);
    }

    #[tokio::test]
    async fn cart_cannot_exceed_stock() {
        let shop = Shop::new();
        let user = shop.user("Ada").await;
        let a = shop.product("Anvil", 100, 3).await;
        shop.carts.add_item(user, a, 2).await.unwrap();

        let err = shop.carts.add_item(user, a, 2).await.unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(shop.carts.get_or_create(user).await.unwrap().total_items, 2);
    }
}
