//! Guest checkout contact repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::GuestUser;

#[derive(Debug, sqlx::FromRow)]
struct GuestUserRow {
    email: String,
    name: String,
    phone: String,
    convert_token: String,
    token_expiry: DateTime<Utc>,
}

impl From<GuestUserRow> for GuestUser {
    fn from(row: GuestUserRow) -> Self {
        Self {
            email: row.email,
            name: row.name,
            phone: row.phone,
            convert_token: row.convert_token,
            token_expiry: row.token_expiry,
        }
    }
}

/// Repository for guest user database operations.
pub struct GuestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GuestRepository<'a> {
    /// Create a new guest repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the guest holding a convert token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<GuestUser>, RepositoryError> {
        let row = sqlx::query_as::<_, GuestUserRow>(
            r"
            SELECT email, name, phone, convert_token, token_expiry
            FROM storefront.guest_users
            WHERE convert_token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(GuestUser::from))
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Create or refresh the guest record for an email.
    ///
    /// A new token replaces any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(conn: &mut PgConnection, guest: &GuestUser) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.guest_users (email, name, phone, convert_token, token_expiry)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                convert_token = EXCLUDED.convert_token,
                token_expiry = EXCLUDED.token_expiry,
                updated_at = now()
            ",
        )
        .bind(&guest.email)
        .bind(&guest.name)
        .bind(&guest.phone)
        .bind(&guest.convert_token)
        .bind(guest.token_expiry)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Consume a convert token by removing the guest record.
    ///
    /// Returns `false` if the token was already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_token(conn: &mut PgConnection, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.guest_users WHERE convert_token = $1")
            .bind(token)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
