//! Product repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use qui_core::{ProductId, StoreId};

use super::RepositoryError;
use crate::models::{Product, ProductSummary};

const PRODUCT_COLUMNS: &str = "id, store_id, name, slug, description, mrp, price, images, \
                               category, in_stock, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: Uuid,
    store_id: Uuid,
    name: String,
    slug: String,
    description: String,
    mrp: Decimal,
    price: Decimal,
    images: Vec<String>,
    category: String,
    in_stock: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            store_id: StoreId::new(row.store_id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            mrp: row.mrp,
            price: row.price,
            images: row.images,
            category: row.category,
            in_stock: row.in_stock,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductSummaryRow {
    id: Uuid,
    name: String,
    slug: String,
    price: Decimal,
    category: String,
}

/// Product data for seeding.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub store_id: StoreId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub mrp: Decimal,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: String,
    pub in_stock: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Get several products keyed by id. Unknown ids are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let product = Product::from(row);
                (product.id, product)
            })
            .collect())
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM storefront.products ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Number of products in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM storefront.products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// A few products for diagnostics output.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sample(&self, limit: i64) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSummaryRow>(
            r"
            SELECT id, name, slug, price, category
            FROM storefront.products
            ORDER BY created_at
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductSummary {
                id: ProductId::new(row.id),
                name: row.name,
                slug: row.slug,
                price: row.price,
                category: row.category,
            })
            .collect())
    }

    /// Insert a product, or update the one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, including
    /// when the store does not exist.
    pub async fn upsert_by_slug(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO storefront.products (
                id, store_id, name, slug, description, mrp, price, images,
                category, in_stock
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (slug) DO UPDATE
            SET store_id = EXCLUDED.store_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                mrp = EXCLUDED.mrp,
                price = EXCLUDED.price,
                images = EXCLUDED.images,
                category = EXCLUDED.category,
                in_stock = EXCLUDED.in_stock
            RETURNING id
            ",
        )
        .bind(ProductId::generate().as_uuid())
        .bind(product.store_id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.mrp)
        .bind(product.price)
        .bind(&product.images)
        .bind(&product.category)
        .bind(product.in_stock)
        .fetch_one(self.pool)
        .await?;

        Ok(ProductId::new(id))
    }
}
