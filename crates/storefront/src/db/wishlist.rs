//! Wishlist repository.

use sqlx::PgPool;

use qui_core::{ProductId, UserId};

use super::RepositoryError;
use super::products::ProductRow;
use crate::models::Product;

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Products on a user's wishlist, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.store_id, p.name, p.slug, p.description, p.mrp, p.price,
                   p.images, p.category, p.in_stock, p.created_at
            FROM storefront.wishlist_items w
            JOIN storefront.products p ON p.id = w.product_id
            WHERE w.user_id = $1
            ORDER BY w.created_at DESC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Add a product. Adding twice is a no-op. The user is created if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(&self, user_id: &UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO storefront.users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id.as_str())
        .bind(product_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a product. Removing a product that is not listed is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: &UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.as_str())
            .bind(product_id.as_uuid())
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
