//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use qui_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::search::{filter_products, page_title};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub title: String,
}

/// List products, filtered by `search` and `category`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductList>> {
    let catalog = state.catalog().products(state.pool()).await?;
    let search = query.search.as_deref().map(str::trim);
    let category = query.category.as_deref().map(str::trim);

    let products = filter_products(&catalog, search, category)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(ProductList {
        products,
        title: page_title(search, category),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

/// Get one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    let not_found = || AppError::NotFound("Product not found".to_string());
    let id: ProductId = id.parse().map_err(|_| not_found())?;

    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ProductResponse { product }))
}
