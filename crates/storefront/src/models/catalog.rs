//! Seller stores and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use qui_core::{ProductId, StoreId, StoreStatus, UserId};

/// A product listed by a seller store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// List price before the store's own markdown.
    pub mrp: Decimal,
    /// Selling price; what checkout charges.
    pub price: Decimal,
    pub images: Vec<String>,
    pub category: String,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields shown in diagnostics samples.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub category: String,
}

/// A seller store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
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
    pub created_at: DateTime<Utc>,
}
