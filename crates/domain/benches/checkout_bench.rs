use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use domain::{AccountService, CartService, CatalogService, OrderService, ShippingInfo};
use store::{InMemoryStore, Money, NewCategory, NewProduct, NewUser, ProductId, UserId};

struct Fixture {
    store: InMemoryStore,
    user_id: UserId,
    product_ids: Vec<ProductId>,
}

async fn fixture(lines: usize) -> Fixture {
    let store = InMemoryStore::new();
    let catalog = CatalogService::new(store.clone());
    let user = AccountService::new(store.clone())
        .register(NewUser {
            email: "bench@example.com".to_string(),
            first_name: "Bench".to_string(),
            last_name: "Mark".to_string(),
        })
        .await
        .unwrap();
    let category = catalog
        .create_category(NewCategory {
            name: "Bench".to_string(),
            slug: "bench".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let mut product_ids = Vec::with_capacity(lines);
    for i in 0..lines {
        let product = catalog
            .create_product(NewProduct {
                name: format!("Widget {i}"),
                description: None,
                sku: format!("BENCH-{i}"),
                price: Money::from_cents(999),
                stock: 1_000_000,
                images: vec![],
                category_id: category.id,
            })
            .await
            .unwrap();
        product_ids.push(product.id);
    }

    Fixture {
        store,
        user_id: user.id,
        product_ids,
    }
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        address: "1 Bench Way".to_string(),
        city: "Perfville".to_string(),
        state: "CA".to_string(),
        zip: "90000".to_string(),
    }
}

fn bench_add_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let fx = rt.block_on(fixture(1));
    let carts = CartService::new(fx.store.clone());

    c.bench_function("domain/cart_add_item", |b| {
        b.iter(|| {
            rt.block_on(async {
                carts
                    .add_item(fx.user_id, fx.product_ids[0], 1)
                    .await
                    .unwrap();
                carts.clear(fx.user_id).await.unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    for lines in [1, 10] {
        let fx = rt.block_on(fixture(lines));
        let carts = CartService::new(fx.store.clone());
        let orders = OrderService::new(fx.store.clone());

        c.bench_function(&format!("domain/checkout_{lines}_lines"), |b| {
            b.iter_batched(
                || {
                    rt.block_on(async {
                        for product_id in &fx.product_ids {
                            carts.add_item(fx.user_id, *product_id, 2).await.unwrap();
                        }
                    })
                },
                |()| {
                    rt.block_on(async {
                        orders.create_order(fx.user_id, shipping()).await.unwrap();
                    })
                },
                BatchSize::SmallInput,
            );
        });
    }
}

fn bench_checkout_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let fx = rt.block_on(fixture(3));
    let carts = CartService::new(fx.store.clone());
    let orders = OrderService::new(fx.store.clone());

    c.bench_function("domain/checkout_then_cancel", |b| {
        b.iter(|| {
            rt.block_on(async {
                for product_id in &fx.product_ids {
                    carts.add_item(fx.user_id, *product_id, 1).await.unwrap();
                }
                let order = orders.create_order(fx.user_id, shipping()).await.unwrap();
                orders.cancel_order(fx.user_id, order.id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_add_item,
    bench_checkout,
    bench_checkout_and_cancel
);
criterion_main!(benches);
