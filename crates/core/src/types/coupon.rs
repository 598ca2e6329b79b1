//! Coupon discount terms and eligibility rules.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a coupon's `discount` value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount` is a percentage of the order subtotal.
    Percentage,
    /// `discount` is a fixed amount, capped at the subtotal.
    Flat,
}

impl DiscountType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Flat => "flat",
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "flat" | "fixed" => Ok(Self::Flat),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

/// The arithmetic part of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponTerms {
    pub discount: Decimal,
    pub discount_type: DiscountType,
}

/// Who may redeem a coupon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRules {
    /// Only customers without any previous order.
    pub for_new_user: bool,
    /// Only plus-plan members.
    pub for_member: bool,
}

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Coupon valid for new users")]
    NotNewUser,
    #[error("Coupon valid for members only")]
    MembersOnly,
}

impl CouponRules {
    /// Check the rules against the customer's history and plan.
    ///
    /// The new-user rule is evaluated first.
    ///
    /// # Errors
    ///
    /// Returns the first rule the customer fails.
    pub const fn check(
        &self,
        has_previous_orders: bool,
        is_plus_member: bool,
    ) -> Result<(), CouponRejection> {
        if self.for_new_user && has_previous_orders {
            return Err(CouponRejection::NotNewUser);
        }
        if self.for_member && !is_plus_member {
            return Err(CouponRejection::MembersOnly);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_coupon_always_applies() {
        let rules = CouponRules::default();
        assert!(rules.check(true, false).is_ok());
        assert!(rules.check(false, false).is_ok());
    }

    #[test]
    fn test_new_user_coupon_rejects_returning_customer() {
        let rules = CouponRules {
            for_new_user: true,
            for_member: false,
        };
        assert_eq!(rules.check(true, true), Err(CouponRejection::NotNewUser));
        assert!(rules.check(false, false).is_ok());
    }

    #[test]
    fn test_member_coupon_requires_plus_plan() {
        let rules = CouponRules {
            for_new_user: false,
            for_member: true,
        };
        assert_eq!(rules.check(false, false), Err(CouponRejection::MembersOnly));
        assert!(rules.check(true, true).is_ok());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            CouponRejection::NotNewUser.to_string(),
            "Coupon valid for new users"
        );
        assert_eq!(
            CouponRejection::MembersOnly.to_string(),
            "Coupon valid for members only"
        );
    }

    #[test]
    fn test_discount_type_accepts_fixed_alias() {
        assert_eq!("fixed".parse::<DiscountType>(), Ok(DiscountType::Flat));
        assert_eq!(
            "percentage".parse::<DiscountType>(),
            Ok(DiscountType::Percentage)
        );
        assert!("bogus".parse::<DiscountType>().is_err());
    }
}
