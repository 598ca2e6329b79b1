//! Coupon records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use qui_core::{CouponRules, CouponTerms};

/// A discount coupon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Uppercase code customers type at checkout.
    pub code: String,
    pub description: String,
    #[serde(flatten)]
    pub terms: CouponTerms,
    #[serde(flatten)]
    pub rules: CouponRules,
    pub is_public: bool,
    pub expires_at: DateTime<Utc>,
    pub used_count: i32,
}

impl Coupon {
    /// Canonical form of a code typed by a customer.
    #[must_use]
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
