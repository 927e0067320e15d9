//! Money rounding with a single fixed precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every monetary amount produced by the depreciation engine is expressed in
//! `MONEY_SCALE` decimal places (the smallest currency subunit).

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of every stored or computed monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount the ledger stores (`NUMERIC(19, 4)` holds 15 integer digits).
#[must_use]
pub fn max_money_amount() -> Decimal {
    Decimal::new(99_999_999_999_999_999, MONEY_SCALE)
}

/// Returns true if the amount carries no digits past the money scale.
///
/// Trailing zeros do not count, so `5000.0000` read back from storage passes.
#[must_use]
pub fn fits_money_scale(amount: Decimal) -> bool {
    amount.round_dp(MONEY_SCALE) == amount
}

/// Rounds a computed amount to the money scale using banker's rounding
/// (round half to even) to minimize cumulative errors.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Truncates an amount toward zero at the money scale.
///
/// Used for constant per-period amounts whose remainder is absorbed later,
/// so the running total can never overshoot.
#[must_use]
pub fn truncate_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}

/// One rounding unit at the money scale (0.01).
#[must_use]
pub fn rounding_unit() -> Decimal {
    Decimal::new(1, MONEY_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_bankers() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.34));
        assert_eq!(round_money(dec!(2.355)), dec!(2.36));
        assert_eq!(round_money(dec!(10000)), dec!(10000));
    }

    #[test]
    fn test_truncate_money() {
        assert_eq!(truncate_money(dec!(33.339)), dec!(33.33));
        assert_eq!(truncate_money(dec!(0.019)), dec!(0.01));
        assert_eq!(truncate_money(dec!(5)), dec!(5));
    }

    #[test]
    fn test_fits_money_scale() {
        assert!(fits_money_scale(dec!(100.05)));
        assert!(fits_money_scale(dec!(5000.0000)));
        assert!(!fits_money_scale(dec!(100.005)));
    }

    #[test]
    fn test_max_money_amount() {
        assert_eq!(max_money_amount(), dec!(999999999999999.99));
    }

    #[test]
    fn test_rounding_unit() {
        assert_eq!(rounding_unit(), dec!(0.01));
    }
}
