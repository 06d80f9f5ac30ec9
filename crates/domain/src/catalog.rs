//! Catalog management: categories and products.
//!
//! Products and categories are never deleted. Deactivating a product hides
//! it from listings and blocks new purchases, while past order lines keep
//! resolving it.

use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId};
use serde::Serialize;
use store::{
    Category, NewCategory, NewProduct, Product, Store, StoreError, StoreTx, constraints,
};

use crate::error::{DomainError, Result};
use crate::pricing::MAX_PRICE;

/// Category details embedded in product projections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            is_active: category.is_active,
        }
    }
}

/// Product projection with its price as a plain number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub price: f64,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_active: bool,
    pub category: Option<CategoryView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    /// Builds the projection, joining the product's category.
    pub(crate) async fn load<T: StoreTx>(tx: &mut T, product: Product) -> Result<Self> {
        let category = tx.get_category(product.category_id).await?;
        Ok(Self {
            id: product.id,
            name: product.name,
            description: product.description,
            sku: product.sku,
            price: product.price.as_decimal(),
            stock: product.stock,
            images: product.images,
            is_active: product.is_active,
            category: category.map(CategoryView::from),
            created_at: product.created_at,
            updated_at: product.updated_at,
        })
    }
}

fn is_valid_slug(slug: &str) -> bool {
    slug.len() >= 2
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_valid_sku(sku: &str) -> bool {
    sku.len() >= 3
        && sku
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

fn map_conflict(err: StoreError) -> DomainError {
    if err.is_unique_violation(constraints::PRODUCT_SKU) {
        return DomainError::Conflict("Product with this SKU already exists".to_string());
    }
    if err.is_unique_violation(constraints::CATEGORY_NAME)
        || err.is_unique_violation(constraints::CATEGORY_SLUG)
    {
        return DomainError::Conflict("Category with this name or slug already exists".to_string());
    }
    DomainError::Unavailable(err)
}

/// Service for managing the product catalog.
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a category. Name and slug must be unique.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, category: NewCategory) -> Result<CategoryView> {
        if category.name.trim().len() < 2 {
            return Err(DomainError::Validation(
                "Category name must be at least 2 characters".to_string(),
            ));
        }
        if !is_valid_slug(&category.slug) {
            return Err(DomainError::Validation(
                "Slug must contain only lowercase letters, numbers, and hyphens".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let created = tx.insert_category(&category).await.map_err(map_conflict)?;
        tx.commit().await?;

        tracing::info!(category_id = %created.id, slug = %created.slug, "category created");
        Ok(created.into())
    }

    /// Lists active categories by name.
    pub async fn list_categories(&self) -> Result<Vec<CategoryView>> {
        let mut tx = self.store.begin().await?;
        let categories = tx.list_categories().await?;
        Ok(categories.into_iter().map(CategoryView::from).collect())
    }

    /// Creates a product in an existing category. The SKU must be unique.
    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, product: NewProduct) -> Result<ProductView> {
        if product.name.trim().len() < 2 {
            return Err(DomainError::Validation(
                "Product name must be at least 2 characters".to_string(),
            ));
        }
        if !is_valid_sku(&product.sku) {
            return Err(DomainError::Validation(
                "SKU must contain only uppercase letters, numbers, and hyphens".to_string(),
            ));
        }
        if product.price.is_negative() {
            return Err(DomainError::Validation("Price cannot be negative".to_string()));
        }
        if product.price > MAX_PRICE {
            return Err(DomainError::Validation(format!(
                "Price cannot exceed {MAX_PRICE}"
            )));
        }
        if product.stock < 0 {
            return Err(DomainError::Validation("Stock cannot be negative".to_string()));
        }

        let mut tx = self.store.begin().await?;
        if tx.get_category(product.category_id).await?.is_none() {
            return Err(DomainError::not_found("Category", product.category_id));
        }
        let created = tx.insert_product(&product).await.map_err(map_conflict)?;
        let view = ProductView::load(&mut tx, created).await?;
        tx.commit().await?;

        tracing::info!(product_id = %view.id, sku = %view.sku, "product created");
        Ok(view)
    }

    /// Loads a product by id, active or not.
    pub async fn get_product(&self, product_id: ProductId) -> Result<ProductView> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;
        ProductView::load(&mut tx, product).await
    }

    /// Loads a product by its SKU.
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<ProductView> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .get_product_by_sku(sku)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", sku))?;
        ProductView::load(&mut tx, product).await
    }

    /// Lists active products, newest first.
    pub async fn list_products(&self) -> Result<Vec<ProductView>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        let mut views = Vec::with_capacity(products.len());
        for product in products {
            views.push(ProductView::load(&mut tx, product).await?);
        }
        Ok(views)
    }

    /// Soft-deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_product(&self, product_id: ProductId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found("Product", product_id));
        }
        tx.set_product_active(product_id, false).await?;
        tx.commit().await?;

        tracing::info!(%product_id, "product deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::InMemoryStore;

    use super::*;

    fn tools() -> NewCategory {
        NewCategory {
            name: "Tools".to_string(),
            slug: "tools".to_string(),
            description: Some("Hand tools".to_string()),
        }
    }

    fn hammer(category_id: CategoryId) -> NewProduct {
        NewProduct {
            name: "Hammer".to_string(),
            description: None,
            sku: "HAM-001".to_string(),
            price: Money::from_cents(1999),
            stock: 4,
            images: vec!["https://example.com/hammer.png".to_string()],
            category_id,
        }
    }

    #[tokio::test]
    async fn create_product_joins_category() {
        let service = CatalogService::new(InMemoryStore::new());
        let category = service.create_category(tools()).await.unwrap();

        let product = service.create_product(hammer(category.id)).await.unwrap();
        assert_eq!(product.price, 19.99);
        assert_eq!(product.category.unwrap().slug, "tools");

        let by_sku = service.get_product_by_sku("HAM-001").await.unwrap();
        assert_eq!(by_sku.id, product.id);
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let service = CatalogService::new(InMemoryStore::new());
        let category = service.create_category(tools()).await.unwrap();
        service.create_product(hammer(category.id)).await.unwrap();

        let err = service.create_product(hammer(category.id)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_category_is_a_conflict() {
        let service = CatalogService::new(InMemoryStore::new());
        service.create_category(tools()).await.unwrap();

        let err = service.create_category(tools()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn product_requires_existing_category() {
        let service = CatalogService::new(InMemoryStore::new());
        let err = service
            .create_product(hammer(CategoryId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Category", .. }));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let service = CatalogService::new(InMemoryStore::new());
        let category = service.create_category(tools()).await.unwrap();

        let mut bad_sku = hammer(category.id);
        bad_sku.sku = "lower".to_string();
        assert!(matches!(
            service.create_product(bad_sku).await,
            Err(DomainError::Validation(_))
        ));

        let mut negative = hammer(category.id);
        negative.stock = -1;
        assert!(matches!(
            service.create_product(negative).await,
            Err(DomainError::Validation(_))
        ));

        let mut bad_slug = tools();
        bad_slug.name = "Other".to_string();
        bad_slug.slug = "Not A Slug".to_string();
        assert!(matches!(
            service.create_category(bad_slug).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn price_is_capped() {
        let service = CatalogService::new(InMemoryStore::new());
        let category = service.create_category(tools()).await.unwrap();

        let mut at_cap = hammer(category.id);
        at_cap.price = MAX_PRICE;
        assert!(service.create_product(at_cap).await.is_ok());

        let mut huge = hammer(category.id);
        huge.sku = "HAM-002".to_string();
        huge.price = Money::from_cents(i64::MAX);
        assert!(matches!(
            service.create_product(huge).await,
            Err(DomainError::Validation(_))
        ));
        assert!(service.get_product_by_sku("HAM-002").await.is_err());
    }

    #[tokio::test]
    async fn deactivated_products_leave_listings_but_stay_loadable() {
        let service = CatalogService::new(InMemoryStore::new());
        let category = service.create_category(tools()).await.unwrap();
        let product = service.create_product(hammer(category.id)).await.unwrap();
        assert_eq!(service.list_products().await.unwrap().len(), 1);

        service.deactivate_product(product.id).await.unwrap();

        assert!(service.list_products().await.unwrap().is_empty());
        let loaded = service.get_product(product.id).await.unwrap();
        assert!(!loaded.is_active);
    }
}
