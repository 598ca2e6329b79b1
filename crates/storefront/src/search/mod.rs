//! Catalog search: substring and edit-distance matching on product names,
//! plus loose category-slug matching.
//!
//! The catalog is small enough to scan in memory. It is loaded from the
//! database and cached for 5 minutes.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use moka::future::Cache;
use regex::Regex;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::Product;

/// Names within this many edits of the search term match.
pub const MAX_EDIT_DISTANCE: usize = 2;

/// How many nearest products to show when nothing matches.
pub const FALLBACK_RESULTS: usize = 3;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));
static NON_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("Invalid regex"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("Invalid regex"));

/// Edit distance between two strings, counted in chars.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Lowercase, whitespace runs to `-`, drop anything else outside `[A-Za-z0-9_-]`.
#[must_use]
pub fn slugify(value: &str) -> String {
    let lower = value.to_lowercase();
    let dashed = WHITESPACE_RE.replace_all(&lower, "-");
    NON_SLUG_RE.replace_all(&dashed, "").into_owned()
}

fn name_matches(name: &str, term: &str) -> bool {
    let name = name.to_lowercase();
    name.contains(term) || levenshtein(&name, term) <= MAX_EDIT_DISTANCE
}

/// Whether a product category satisfies a category slug from the URL.
///
/// Matches on any of:
/// - the slugified category equals the slug
/// - every slug word overlaps (substring either way) some category word
/// - the de-dashed slug and the category contain one another
///
/// An uncategorised product (blank category) matches every slug.
#[must_use]
pub fn category_matches(product_category: &str, slug: &str) -> bool {
    let category = product_category.to_lowercase();
    let slug = slug.to_lowercase();
    if category.trim().is_empty() {
        return true;
    }

    if slugify(&category) == slug {
        return true;
    }

    let stripped = NON_WORD_RE.replace_all(&category, "");
    let category_words: Vec<&str> = stripped.split_whitespace().collect();
    let all_words = slug.split('-').filter(|w| !w.is_empty()).all(|word| {
        category_words
            .iter()
            .any(|cat| cat.contains(word) || word.contains(cat))
    });
    if all_words {
        return true;
    }

    let spaced = slug.replace('-', " ");
    category.contains(&spaced) || spaced.contains(category.as_str())
}

/// Filter the catalog by search term and category.
///
/// When a search term matches nothing, the [`FALLBACK_RESULTS`] products
/// with the closest names are returned instead.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [Product],
    search: Option<&str>,
    category: Option<&str>,
) -> Vec<&'a Product> {
    let term = search.filter(|s| !s.is_empty()).map(str::to_lowercase);
    let category = category.filter(|c| !c.is_empty());

    let matched: Vec<&Product> = products
        .iter()
        .filter(|p| term.as_deref().is_none_or(|t| name_matches(&p.name, t)))
        .filter(|p| category.is_none_or(|c| category_matches(&p.category, c)))
        .collect();

    match term {
        Some(term) if matched.is_empty() && !products.is_empty() => {
            let mut scored: Vec<(usize, &Product)> = products
                .iter()
                .map(|p| (levenshtein(&p.name.to_lowercase(), &term), p))
                .collect();
            // Stable, so ties keep catalog order
            scored.sort_by_key(|(score, _)| *score);
            scored
                .into_iter()
                .take(FALLBACK_RESULTS)
                .map(|(_, p)| p)
                .collect()
        }
        _ => matched,
    }
}

/// Heading for a product listing.
#[must_use]
pub fn page_title(search: Option<&str>, category: Option<&str>) -> String {
    if let Some(category) = category.filter(|c| !c.is_empty()) {
        return category
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ");
    }
    if let Some(search) = search.filter(|s| !s.is_empty()) {
        return format!("Search: {search}");
    }
    "All Products".to_string()
}

const CATALOG_KEY: &str = "catalog";

/// In-memory copy of the catalog.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl CatalogCache {
    /// Create a cache whose snapshot expires after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// The cached catalog, loading it on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the catalog has to be loaded and the query fails.
    #[instrument(skip_all)]
    pub async fn products(&self, pool: &PgPool) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.cache.get(CATALOG_KEY).await {
            debug!("Cache hit for catalog");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(pool).list_all().await?);
        debug!(count = products.len(), "Loaded catalog");
        self.cache.insert(CATALOG_KEY, Arc::clone(&products)).await;
        Ok(products)
    }

    /// Drop the snapshot so the next read reloads it.
    pub async fn invalidate(&self) {
        self.cache.invalidate(CATALOG_KEY).await;
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300)) // 5 minutes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use qui_core::{ProductId, StoreId};
    use rust_decimal::Decimal;

    use super::*;

    fn product(name: &str, category: &str) -> Product {
        Product {
            id: ProductId::generate(),
            store_id: StoreId::generate(),
            name: name.to_string(),
            slug: slugify(name),
            description: String::new(),
            mrp: Decimal::from(20),
            price: Decimal::from(15),
            images: vec![],
            category: category.to_string(),
            in_stock: true,
            created_at: Utc::now(),
        }
    }

    fn names(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.name.clone()).collect()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("Running Shoes", "Footwear"),
            product("Wireless Headphones", "Audio & Music"),
            product("Cotton T-Shirt", "Men's Clothing"),
            product("Shoe", "Footwear"),
        ]
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("shoe", "shoes"), 1);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Men's  Clothing"), "mens-clothing");
        assert_eq!(slugify("Audio & Music"), "audio--music");
    }

    #[test]
    fn test_search_substring_and_typo() {
        let products = catalog();
        let found = filter_products(&products, Some("SHOE"), None);
        assert_eq!(names(&found), ["Running Shoes", "Shoe"]);

        // "shoa" is one edit from "shoe" and nowhere a substring
        let found = filter_products(&products, Some("shoa"), None);
        assert_eq!(names(&found), ["Shoe"]);
    }

    #[test]
    fn test_fallback_only_when_nothing_matches() {
        let products = catalog();
        let found = filter_products(&products, Some("xylophone"), None);
        assert_eq!(found.len(), FALLBACK_RESULTS);

        // A direct match suppresses the fallback
        let found = filter_products(&products, Some("headphones"), None);
        assert_eq!(names(&found), ["Wireless Headphones"]);
    }

    #[test]
    fn test_fallback_orders_by_distance() {
        let products = catalog();
        let found = filter_products(&products, Some("shoez!!"), None);
        assert_eq!(found[0].name, "Shoe");
    }

    #[test]
    fn test_no_fallback_for_empty_catalog() {
        assert!(filter_products(&[], Some("anything"), None).is_empty());
    }

    #[test]
    fn test_category_matching() {
        assert!(category_matches("Footwear", "footwear"));
        assert!(category_matches("Men's Clothing", "mens-clothing"));
        assert!(category_matches("Audio & Music", "audio-music"));
        assert!(category_matches("Home Decor", "home"));
        assert!(!category_matches("Footwear", "audio"));
        assert!(category_matches("", "footwear"));
        assert!(category_matches("  ", "audio-music"));
    }

    #[test]
    fn test_uncategorised_products_appear_under_every_category() {
        let mut products = catalog();
        products.push(product("Gift Card", ""));

        let found = filter_products(&products, None, Some("footwear"));
        assert_eq!(names(&found), ["Running Shoes", "Shoe", "Gift Card"]);

        let found = filter_products(&products, None, Some("audio-music"));
        assert_eq!(names(&found), ["Wireless Headphones", "Gift Card"]);
    }

    #[test]
    fn test_category_filter_combines_with_search() {
        let products = catalog();
        let found = filter_products(&products, None, Some("footwear"));
        assert_eq!(names(&found), ["Running Shoes", "Shoe"]);

        let found = filter_products(&products, Some("running"), Some("footwear"));
        assert_eq!(names(&found), ["Running Shoes"]);
    }

    #[test]
    fn test_no_filters_returns_everything() {
        let products = catalog();
        assert_eq!(filter_products(&products, None, None).len(), products.len());
        assert_eq!(filter_products(&products, Some(""), Some("")).len(), products.len());
    }

    #[test]
    fn test_page_title() {
        assert_eq!(page_title(None, Some("mens-clothing")), "Mens Clothing");
        assert_eq!(page_title(Some("shoes"), None), "Search: shoes");
        assert_eq!(page_title(Some("shoes"), Some("footwear")), "Footwear");
        assert_eq!(page_title(None, None), "All Products");
    }
}
