//! Customer account types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qui_core::{ProductId, UserId};

/// A customer's cart: product id to quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<ProductId, u32>);

impl Cart {
    /// Build a cart, dropping lines with a zero quantity.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = (ProductId, u32)>) -> Self {
        Self(lines.into_iter().filter(|(_, qty)| *qty > 0).collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn quantity(&self, product: &ProductId) -> u32 {
        self.0.get(product).copied().unwrap_or(0)
    }

    pub fn into_lines(self) -> impl Iterator<Item = (ProductId, u32)> {
        self.0.into_iter()
    }
}

/// A storefront customer, created on first checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// May be empty for accounts created implicitly at checkout.
    pub email: String,
    pub image: String,
    pub cart: Cart,
    pub created_at: DateTime<Utc>,
}

/// The part of a user embedded in order views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub image: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_drops_zero_quantities() {
        let keep = ProductId::generate();
        let drop = ProductId::generate();
        let cart = Cart::from_lines([(keep, 2), (drop, 0)]);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity(&keep), 2);
        assert_eq!(cart.quantity(&drop), 0);
    }

    #[test]
    fn test_cart_json_is_plain_map() {
        let id = ProductId::generate();
        let cart = Cart::from_lines([(id, 3)]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json, serde_json::json!({ id.to_string(): 3 }));

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
