//! User repository for database operations.
//!
//! Users are created lazily: the first checkout or cart write for a uid
//! inserts the row.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use qui_core::UserId;

use super::RepositoryError;
use crate::models::{Cart, User};

/// Display name of the guest placeholder user.
const GUEST_NAME: &str = "Guest User";
/// Mailbox of the guest placeholder user. Never receives mail.
const GUEST_EMAIL: &str = "guest@system.local";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    image: String,
    cart: Json<Cart>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            image: row.image,
            cart: row.cart.0,
            created_at: row.created_at,
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, image, cart, created_at
            FROM storefront.users
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Get several users at once. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = ids.iter().map(UserId::as_str).collect();
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, image, cart, created_at
            FROM storefront.users
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Get a user's cart, empty if the user does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_cart(&self, id: &UserId) -> Result<Cart, RepositoryError> {
        let cart = sqlx::query_scalar::<_, Json<Cart>>(
            "SELECT cart FROM storefront.users WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(cart.map(|c| c.0).unwrap_or_default())
    }

    /// Replace a user's cart, creating the user if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_cart(&self, id: &UserId, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.users (id, cart)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET cart = EXCLUDED.cart, updated_at = now()
            ",
        )
        .bind(id.as_str())
        .bind(Json(cart))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Empty a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_cart(&self, id: &UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE storefront.users
            SET cart = '{}'::jsonb, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Insert the user if missing and fill in a blank name or email.
    ///
    /// Existing non-empty profile fields are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_exists(
        conn: &mut PgConnection,
        id: &UserId,
        name: &str,
        email: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.users (id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = CASE WHEN storefront.users.name = '' THEN EXCLUDED.name
                            ELSE storefront.users.name END,
                email = CASE WHEN storefront.users.email = '' THEN EXCLUDED.email
                             ELSE storefront.users.email END,
                updated_at = now()
            ",
        )
        .bind(id.as_str())
        .bind(name)
        .bind(email)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Insert the shared guest placeholder user if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_guest(conn: &mut PgConnection) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.users (id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(UserId::GUEST)
        .bind(GUEST_NAME)
        .bind(GUEST_EMAIL)
        .execute(conn)
        .await?;

        Ok(())
    }
}
