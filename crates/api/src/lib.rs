//! HTTP API server for the storefront backend.
//!
//! Exposes the catalog, cart and order workflows as JSON endpoints, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{AccountService, CartService, CatalogService, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
///
/// Built once at startup from a single store handle.
pub struct AppState<S: Store> {
    pub store: S,
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    use routes::{cart, catalog, ops, orders, users};

    let metrics_router = Router::new()
        .route("/metrics", get(ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(ops::health::<S>))
        .route("/users", post(users::register::<S>))
        .route("/users/me", get(users::me::<S>))
        .route(
            "/categories",
            get(catalog::list_categories::<S>).post(catalog::create_category::<S>),
        )
        .route(
            "/products",
            get(catalog::list_products::<S>).post(catalog::create_product::<S>),
        )
        .route(
            "/products/{id}",
            get(catalog::get_product::<S>).delete(catalog::deactivate_product::<S>),
        )
        .route("/products/sku/{sku}", get(catalog::get_product_by_sku::<S>))
        .route(
            "/cart",
            get(cart::get::<S>)
                .post(cart::add_item::<S>)
                .delete(cart::clear::<S>),
        )
        .route(
            "/cart/{item_id}",
            put(cart::update_item::<S>).delete(cart::remove_item::<S>),
        )
        .route(
            "/orders",
            get(orders::list::<S>).post(orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(orders::get::<S>).delete(orders::cancel::<S>),
        )
        .route("/orders/{id}/status", put(orders::update_status::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
