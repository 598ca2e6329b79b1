//! Order pricing: coupon discounts, shipping and the multi-seller split.
//!
//! A cart containing products from several stores becomes one order per
//! store. The coupon and the shipping fee belong to the checkout as a
//! whole, so this module decides how they are distributed:
//!
//! - a percentage coupon applies to every seller's subtotal
//! - a flat coupon takes its full amount off every seller's subtotal
//! - shipping is charged once, on the first seller's order, and never for
//!   plus members

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{CouponTerms, DiscountType, round_money};

/// A product line in a seller's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of `price * quantity` over a seller's lines.
#[must_use]
pub fn line_subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::subtotal).sum()
}

/// Apply a coupon to one seller subtotal.
///
/// A flat amount is capped at the subtotal, so the result is never negative.
#[must_use]
pub fn apply_discount(subtotal: Decimal, terms: &CouponTerms) -> Decimal {
    let discount = match terms.discount_type {
        DiscountType::Percentage => {
            let pct = terms.discount.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            subtotal * pct / Decimal::ONE_HUNDRED
        }
        DiscountType::Flat => terms.discount.min(subtotal).max(Decimal::ZERO),
    };
    (subtotal - discount).max(Decimal::ZERO)
}

/// Totals for one seller's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// Shipping actually charged on this order.
    pub shipping: Decimal,
    /// Rounded to two decimal places.
    pub total: Decimal,
}

/// Result of splitting a checkout across sellers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitTotals {
    /// One entry per seller, in the order the subtotals were given.
    pub sellers: Vec<SellerTotals>,
    /// Sum of the rounded seller totals; the amount charged at payment.
    pub full_amount: Decimal,
}

/// Compute per-seller totals for a checkout.
///
/// `subtotals` holds each seller group's undiscounted subtotal in
/// first-seen order. A negative `shipping_fee` is treated as zero.
#[must_use]
pub fn split_totals(
    subtotals: &[Decimal],
    coupon: Option<&CouponTerms>,
    shipping_fee: Decimal,
    is_plus_member: bool,
) -> SplitTotals {
    let shipping_fee = if is_plus_member {
        Decimal::ZERO
    } else {
        shipping_fee.max(Decimal::ZERO)
    };

    let sellers: Vec<SellerTotals> = subtotals
        .iter()
        .enumerate()
        .map(|(index, &subtotal)| {
            let discounted =
                coupon.map_or(subtotal, |terms| apply_discount(subtotal, terms));
            let shipping = if index == 0 {
                shipping_fee
            } else {
                Decimal::ZERO
            };
            SellerTotals {
                subtotal,
                discount: subtotal - discounted,
                shipping,
                total: round_money(discounted + shipping),
            }
        })
        .collect();

    let full_amount = sellers.iter().map(|s| s.total).sum();
    SplitTotals {
        sellers,
        full_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(units: i64) -> Decimal {
        Decimal::from(units)
    }

    fn pct(value: i64) -> CouponTerms {
        CouponTerms {
            discount: dec(value),
            discount_type: DiscountType::Percentage,
        }
    }

    fn flat(value: i64) -> CouponTerms {
        CouponTerms {
            discount: dec(value),
            discount_type: DiscountType::Flat,
        }
    }

    #[test]
    fn test_line_subtotal() {
        let items = [
            LineItem {
                quantity: 2,
                unit_price: Decimal::new(1050, 2),
            },
            LineItem {
                quantity: 1,
                unit_price: dec(4),
            },
        ];
        assert_eq!(line_subtotal(&items), dec(25));
        assert_eq!(line_subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_single_seller_no_coupon_adds_shipping() {
        let split = split_totals(&[dec(100)], None, dec(5), false);
        assert_eq!(split.sellers[0].total, dec(105));
        assert_eq!(split.sellers[0].shipping, dec(5));
        assert_eq!(split.full_amount, dec(105));
    }

    #[test]
    fn test_plus_member_never_pays_shipping() {
        let split = split_totals(&[dec(100), dec(50)], None, dec(5), true);
        assert!(split.sellers.iter().all(|s| s.shipping.is_zero()));
        assert_eq!(split.full_amount, dec(150));
    }

    #[test]
    fn test_shipping_only_on_first_seller() {
        let split = split_totals(&[dec(40), dec(60), dec(10)], None, dec(7), false);
        let shipping: Vec<_> = split.sellers.iter().map(|s| s.shipping).collect();
        assert_eq!(shipping, vec![dec(7), Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(split.full_amount, dec(117));
    }

    #[test]
    fn test_percentage_coupon_applies_to_every_seller() {
        let split = split_totals(&[dec(100), dec(50)], Some(&pct(10)), Decimal::ZERO, false);
        assert_eq!(split.sellers[0].total, dec(90));
        assert_eq!(split.sellers[1].total, dec(45));
        assert_eq!(split.sellers[1].discount, dec(5));
        assert_eq!(split.full_amount, dec(135));
    }

    #[test]
    fn test_flat_coupon_applies_to_every_seller() {
        let split = split_totals(&[dec(30), dec(50)], Some(&flat(40)), Decimal::ZERO, false);
        assert_eq!(split.sellers[0].discount, dec(30));
        assert_eq!(split.sellers[0].total, Decimal::ZERO);
        assert_eq!(split.sellers[1].discount, dec(40));
        assert_eq!(split.sellers[1].total, dec(10));
        assert_eq!(split.full_amount, dec(10));
    }

    #[test]
    fn test_flat_coupon_larger_than_cart_never_goes_negative() {
        let split = split_totals(&[dec(20)], Some(&flat(500)), dec(5), false);
        assert_eq!(split.sellers[0].discount, dec(20));
        assert_eq!(split.sellers[0].total, dec(5));
    }

    #[test]
    fn test_totals_are_rounded_and_summed() {
        // 33.33 * 15% off = 28.3305 -> 28.33
        let split = split_totals(
            &[Decimal::new(3333, 2), Decimal::new(3333, 2)],
            Some(&pct(15)),
            Decimal::ZERO,
            false,
        );
        assert_eq!(split.sellers[0].total, Decimal::new(2833, 2));
        assert_eq!(split.full_amount, Decimal::new(5666, 2));
        assert_eq!(
            split.full_amount,
            split.sellers.iter().map(|s| s.total).sum::<Decimal>()
        );
    }

    #[test]
    fn test_negative_shipping_is_ignored() {
        let split = split_totals(&[dec(10)], None, dec(-3), false);
        assert_eq!(split.sellers[0].total, dec(10));
    }

    #[test]
    fn test_apply_discount_caps_flat_at_subtotal() {
        let terms = flat(25);
        assert_eq!(apply_discount(dec(10), &terms), Decimal::ZERO);
        assert_eq!(apply_discount(dec(100), &terms), dec(75));
        assert_eq!(apply_discount(dec(100), &pct(20)), dec(80));
    }
}
