//! Money helpers on top of `rust_decimal`.
//!
//! Amounts are plain [`Decimal`] values in the store currency's major unit.
//! Order totals are persisted with two decimal places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to two decimal places, halves away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount to integer minor units (e.g. paise or cents).
///
/// Returns `None` if the value does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(10_005, 3)), Decimal::new(1001, 2));
        assert_eq!(round_money(Decimal::new(10_004, 3)), Decimal::new(1000, 2));
        assert_eq!(round_money(Decimal::from(7)), Decimal::from(7));
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(1234, 2)), Some(1234));
        assert_eq!(to_minor_units(Decimal::new(5, 3)), Some(1));
        assert_eq!(to_minor_units(Decimal::from(499)), Some(49_900));
    }
}
