//! Multi-seller checkout totals.
//!
//! Exercises the pricing rules the storefront uses when one cart becomes
//! an order per seller.

use qui_core::pricing::{LineItem, line_subtotal, split_totals};
use qui_core::{CouponTerms, DiscountType};
use rust_decimal::Decimal;

fn dec(value: &str) -> Decimal {
    value.parse().unwrap_or_default()
}

fn flat(amount: &str) -> CouponTerms {
    CouponTerms {
        discount: dec(amount),
        discount_type: DiscountType::Flat,
    }
}

fn percentage(amount: &str) -> CouponTerms {
    CouponTerms {
        discount: dec(amount),
        discount_type: DiscountType::Percentage,
    }
}

#[test]
fn test_two_seller_cart_with_flat_coupon_and_shipping() {
    // Seller A: 2 x 30.00, seller B: 1 x 15.50
    let a = line_subtotal(&[LineItem {
        quantity: 2,
        unit_price: dec("30.00"),
    }]);
    let b = line_subtotal(&[LineItem {
        quantity: 1,
        unit_price: dec("15.50"),
    }]);

    let split = split_totals(&[a, b], Some(&flat("20")), dec("10"), false);
    let totals: Vec<Decimal> = split.sellers.iter().map(|s| s.total).collect();

    // 20 off each order; B's 15.50 is capped at zero, shipping rides on A
    assert_eq!(totals, vec![dec("50"), Decimal::ZERO]);
    assert_eq!(split.full_amount, dec("50"));
}

#[test]
fn test_flat_coupon_larger_than_cart_never_goes_negative() {
    let split = split_totals(&[dec("20"), dec("5")], Some(&flat("500")), dec("0"), false);
    assert!(split.sellers.iter().all(|s| s.total >= Decimal::ZERO));
    assert_eq!(split.full_amount, Decimal::ZERO);
}

#[test]
fn test_percentage_coupon_rounds_each_order() {
    let split = split_totals(
        &[dec("33.33"), dec("10.01")],
        Some(&percentage("15")),
        dec("0"),
        false,
    );
    let totals: Vec<Decimal> = split.sellers.iter().map(|s| s.total).collect();
    assert_eq!(totals, vec![dec("28.33"), dec("8.51")]);
    assert_eq!(split.full_amount, dec("36.84"));
}

#[test]
fn test_plus_member_skips_shipping_on_every_order() {
    let split = split_totals(&[dec("40"), dec("60")], None, dec("12"), true);
    assert!(split.sellers.iter().all(|s| s.shipping.is_zero()));
    assert_eq!(split.full_amount, dec("100"));
}

#[test]
fn test_full_amount_is_sum_of_seller_totals() {
    let split = split_totals(
        &[dec("19.99"), dec("5.01"), dec("100")],
        Some(&percentage("10")),
        dec("7.5"),
        false,
    );
    let sum: Decimal = split.sellers.iter().map(|s| s.total).sum();
    assert_eq!(split.full_amount, sum);
    assert_eq!(split.sellers.first().map(|s| s.shipping), Some(dec("7.5")));
}
