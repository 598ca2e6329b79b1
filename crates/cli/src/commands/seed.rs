//! Seed the catalog with seller stores and their products.
//!
//! Reads a YAML file and upserts every store by `username` and every
//! product by `slug`, so re-running the same file is safe.
//!
//! ```yaml
//! stores:
//!   - user_id: seller-uid-1
//!     name: Desert Threads
//!     username: desertthreads
//!     email: hello@desertthreads.test
//!     status: approved
//!     is_active: true
//!     products:
//!       - name: Linen Kaftan
//!         slug: linen-kaftan
//!         mrp: 240
//!         price: 199
//!         category: Clothing
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use qui_core::{StoreStatus, UserId};
use qui_storefront::db::{NewProduct, NewStore, ProductRepository, StoreRepository};

use super::connect;

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub stores: Vec<StoreEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StoreEntry {
    pub user_id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default = "approved")]
    pub status: StoreStatus,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub mrp: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default = "yes")]
    pub in_stock: bool,
}

const fn approved() -> StoreStatus {
    StoreStatus::Approved
}

const fn yes() -> bool {
    true
}

impl StoreEntry {
    fn to_new_store(&self) -> NewStore {
        NewStore {
            user_id: UserId::new(&self.user_id),
            name: self.name.clone(),
            username: self.username.clone(),
            description: self.description.clone(),
            email: self.email.clone(),
            contact: self.contact.clone(),
            address: self.address.clone(),
            logo: self.logo.clone(),
            status: self.status,
            is_active: self.is_active,
        }
    }
}

/// Problems that would make a catalog file seed bad data.
#[must_use]
pub fn validate(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    for store in &catalog.stores {
        if store.username.trim().is_empty() {
            errors.push(format!("store '{}': username is empty", store.name));
        }
        for product in &store.products {
            if product.slug.trim().is_empty() {
                errors.push(format!("product '{}': slug is empty", product.name));
            }
            if product.price.is_sign_negative() || product.mrp.is_sign_negative() {
                errors.push(format!("product '{}': negative price", product.slug));
            }
            if product.price > product.mrp {
                warn!(slug = %product.slug, "price is above mrp");
            }
        }
    }
    errors
}

/// Seed stores and products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails
/// validation, or a database write fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&catalog);
    if !errors.is_empty() {
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;
    let stores = StoreRepository::new(&pool);
    let products = ProductRepository::new(&pool);

    let mut product_count = 0usize;
    for entry in &catalog.stores {
        let store_id = stores.upsert_by_username(&entry.to_new_store()).await?;
        info!(store = %entry.username, %store_id, "Store upserted");

        for product in &entry.products {
            products
                .upsert_by_slug(&NewProduct {
                    store_id,
                    name: product.name.clone(),
                    slug: product.slug.clone(),
                    description: product.description.clone(),
                    mrp: product.mrp,
                    price: product.price,
                    images: product.images.clone(),
                    category: product.category.clone(),
                    in_stock: product.in_stock,
                })
                .await?;
            product_count += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Stores: {}", catalog.stores.len());
    info!("  Products: {product_count}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_parses_and_validates() {
        let catalog: CatalogFile =
            serde_yaml::from_str(include_str!("../../fixtures/catalog.yaml")).unwrap();
        assert!(!catalog.stores.is_empty());
        assert!(validate(&catalog).is_empty());
    }

    #[test]
    fn test_defaults_apply() {
        let catalog: CatalogFile = serde_yaml::from_str(
            "stores:\n  - user_id: u1\n    name: S\n    username: s\n    email: s@qui.test\n    products:\n      - name: P\n        slug: p\n        mrp: 10\n        price: 8.5\n",
        )
        .unwrap();
        let store = catalog.stores.first().unwrap();
        assert_eq!(store.status, StoreStatus::Approved);
        assert!(store.is_active);
        let product = store.products.first().unwrap();
        assert!(product.in_stock);
        assert_eq!(product.price, Decimal::new(85, 1));
    }

    #[test]
    fn test_validate_flags_blank_slug_and_negative_price() {
        let catalog: CatalogFile = serde_yaml::from_str(
            "stores:\n  - user_id: u1\n    name: S\n    username: s\n    email: s@qui.test\n    products:\n      - name: P\n        slug: ''\n        mrp: 10\n        price: -1\n",
        )
        .unwrap();
        assert_eq!(validate(&catalog).len(), 2);
    }
}
