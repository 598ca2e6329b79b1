//! Seller store repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use qui_core::{StoreId, StoreStatus, UserId};

use super::{RepositoryError, parse_column};
use crate::models::Store;

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: Uuid,
    user_id: String,
    name: String,
    username: String,
    description: String,
    email: String,
    contact: String,
    address: String,
    logo: String,
    status: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StoreId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            username: row.username,
            description: row.description,
            email: row.email,
            contact: row.contact,
            address: row.address,
            logo: row.logo,
            status: parse_column(&row.status, "stores.status")?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Store data for seeding.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub user_id: UserId,
    pub name: String,
    pub username: String,
    pub description: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub logo: String,
    pub status: StoreStatus,
    pub is_active: bool,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a store by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored status is unknown.
    pub async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            r"
            SELECT id, user_id, name, username, description, email, contact,
                   address, logo, status, is_active, created_at
            FROM storefront.stores
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Insert a store, or update the one with the same username.
    ///
    /// The owning user is created if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_username(&self, store: &NewStore) -> Result<StoreId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO storefront.users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(store.user_id.as_str())
        .bind(&store.email)
        .execute(&mut *tx)
        .await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r"
            INSERT INTO storefront.stores (
                id, user_id, name, username, description, email, contact,
                address, logo, status, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (username) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                email = EXCLUDED.email,
                contact = EXCLUDED.contact,
                address = EXCLUDED.address,
                logo = EXCLUDED.logo,
                status = EXCLUDED.status,
                is_active = EXCLUDED.is_active
            RETURNING id
            ",
        )
        .bind(StoreId::generate().as_uuid())
        .bind(store.user_id.as_str())
        .bind(&store.name)
        .bind(&store.username)
        .bind(&store.description)
        .bind(&store.email)
        .bind(&store.contact)
        .bind(&store.address)
        .bind(&store.logo)
        .bind(store.status.as_str())
        .bind(store.is_active)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StoreId::new(id))
    }
}
