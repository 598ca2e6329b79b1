//! Shipping addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use qui_core::{AddressId, UserId};

/// A saved address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub district: String,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Copy of the address for embedding in an order.
    #[must_use]
    pub fn snapshot(&self) -> ShippingAddress {
        ShippingAddress {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            country: self.country.clone(),
            district: self.district.clone(),
        }
    }
}

/// Address data submitted by a client.
///
/// Missing fields deserialize as empty strings; callers decide which ones
/// are mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub district: String,
}

impl AddressInput {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// The address as it will be embedded in an order.
    #[must_use]
    pub fn to_snapshot(&self) -> ShippingAddress {
        ShippingAddress {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip: self.zip.clone(),
            country: self.country.clone(),
            district: self.district.clone(),
        }
    }
}

/// Address embedded in an order (a copy, not a reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    #[serde(default)]
    pub district: String,
}

impl ShippingAddress {
    /// Single-line form used on shipping labels.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.street.as_str(),
            self.district.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.zip.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_reports_blank_values() {
        let input = AddressInput {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            street: "  ".to_string(),
            city: "Dubai".to_string(),
            ..AddressInput::default()
        };
        assert_eq!(
            input.missing_fields(),
            vec!["phone", "street", "state", "country"]
        );
    }

    #[test]
    fn test_one_line_skips_empty_parts() {
        let address = ShippingAddress {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: "555".to_string(),
            street: "1 Palm Rd".to_string(),
            city: "Dubai".to_string(),
            state: "Dubai".to_string(),
            zip: String::new(),
            country: "UAE".to_string(),
            district: String::new(),
        };
        assert_eq!(address.one_line(), "1 Palm Rd, Dubai, Dubai, UAE");
    }
}
