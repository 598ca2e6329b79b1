//! Address repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use qui_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, ShippingAddress};

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: String,
    name: String,
    email: String,
    phone: String,
    street: String,
    city: String,
    state: String,
    zip: String,
    country: String,
    district: String,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            street: row.street,
            city: row.city,
            state: row.state,
            zip: row.zip,
            country: row.country,
            district: row.district,
            created_at: row.created_at,
        }
    }
}

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an address by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, name, email, phone, street, city, state, zip,
                   country, district, created_at
            FROM storefront.addresses
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    /// Get several addresses at once. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(AddressId::as_uuid).collect();
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, name, email, phone, street, city, state, zip,
                   country, district, created_at
            FROM storefront.addresses
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// A user's saved addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, name, email, phone, street, city, state, zip,
                   country, district, created_at
            FROM storefront.addresses
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Save an address for a user. The user row must already exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: &UserId,
        address: &ShippingAddress,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            INSERT INTO storefront.addresses (
                id, user_id, name, email, phone, street, city, state, zip,
                country, district
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, user_id, name, email, phone, street, city, state, zip,
                      country, district, created_at
            ",
        )
        .bind(AddressId::generate().as_uuid())
        .bind(user_id.as_str())
        .bind(&address.name)
        .bind(&address.email)
        .bind(&address.phone)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip)
        .bind(&address.country)
        .bind(&address.district)
        .fetch_one(conn)
        .await?;

        Ok(Address::from(row))
    }
}
