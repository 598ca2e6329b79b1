//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `users` - Customers keyed by identity-provider uid, with their cart
//! - `guest_users` - Guest checkout contacts and their convert tokens
//! - `addresses` - Saved shipping addresses
//! - `stores` - Seller stores
//! - `products` - Catalog
//! - `wishlist_items` - Saved products per user
//! - `coupons` - Discount codes
//! - `orders` / `order_items` - One order per seller per checkout
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p qui-cli -- migrate
//! ```
//!
//! # Transactions
//!
//! Repositories read through the pool. Writes that must commit together
//! with an order are associated functions taking `&mut PgConnection`, so
//! the checkout can run them inside one transaction.

pub mod addresses;
pub mod coupons;
pub mod guests;
pub mod orders;
pub mod products;
pub mod stores;
pub mod users;
pub mod wishlist;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use coupons::{CouponRepository, NewCoupon};
pub use guests::GuestRepository;
pub use orders::{GuestContact, NewOrder, OrderRepository};
pub use products::{NewProduct, ProductRepository};
pub use stores::{NewStore, StoreRepository};
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate coupon code).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Parse a `TEXT` enum column.
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("{column}: {e}")))
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}
