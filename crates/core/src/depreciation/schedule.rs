//! Depreciation schedule generation.
//!
//! A schedule is a pure recomputation from the asset's terms: identical
//! inputs always give identical lines, and the amounts always sum to the
//! depreciable base exactly.
//!
//! Period `i` closes on `purchase_date + i months`, computed from the purchase
//! date each time (never chained) with the day clamped to the month end.

use chrono::{Months, NaiveDate};
use fixedledger_shared::types::{
    fits_money_scale, max_money_amount, round_money, rounding_unit, truncate_money,
};
use rust_decimal::Decimal;

use super::error::DepreciationError;
use super::types::{DepreciationMethod, FixedAsset, ScheduleLine};

/// Longest supported useful life (100 years).
pub const MAX_USEFUL_LIFE_MONTHS: u32 = 1200;

/// Generates full depreciation schedules.
pub struct ScheduleGenerator;

impl ScheduleGenerator {
    /// Produces the schedule from the purchase date through the end of the
    /// useful life (or earlier, when a declining-balance schedule reaches
    /// salvage value early).
    ///
    /// # Errors
    ///
    /// Returns `DepreciationError` if the asset's terms are invalid.
    pub fn generate(asset: &FixedAsset) -> Result<Vec<ScheduleLine>, DepreciationError> {
        validate_terms(
            asset.purchase_cost,
            asset.salvage_value,
            asset.useful_life_months,
        )?;

        let amounts = period_amounts(
            asset.depreciation_method,
            asset.purchase_cost,
            asset.salvage_value,
            asset.useful_life_months,
        );

        let mut lines = Vec::with_capacity(amounts.len());
        let mut accumulated = Decimal::ZERO;
        for (index, amount) in (1u32..).zip(amounts) {
            accumulated += amount;
            lines.push(ScheduleLine {
                period_index: index,
                date: period_date(asset.purchase_date, index)?,
                depreciation_amount: amount,
                accumulated_depreciation: accumulated,
                book_value: asset.purchase_cost - accumulated,
            });
        }

        Ok(lines)
    }
}

/// Validates the depreciation terms shared by every method.
///
/// # Errors
///
/// Returns `DepreciationError` if the life is zero or too long, an amount is
/// negative, too large or too precise, or salvage exceeds cost.
pub fn validate_terms(
    cost: Decimal,
    salvage: Decimal,
    useful_life_months: u32,
) -> Result<(), DepreciationError> {
    if useful_life_months == 0 {
        return Err(DepreciationError::ZeroUsefulLife);
    }
    if useful_life_months > MAX_USEFUL_LIFE_MONTHS {
        return Err(DepreciationError::UsefulLifeTooLong(useful_life_months));
    }
    if cost < Decimal::ZERO {
        return Err(DepreciationError::NegativeCost(cost));
    }
    if salvage < Decimal::ZERO {
        return Err(DepreciationError::NegativeSalvage(salvage));
    }
    for amount in [cost, salvage] {
        if !fits_money_scale(amount) {
            return Err(DepreciationError::ExcessPrecision(amount));
        }
        if amount > max_money_amount() {
            return Err(DepreciationError::AmountTooLarge(amount));
        }
    }
    if salvage > cost {
        return Err(DepreciationError::SalvageExceedsCost { salvage, cost });
    }
    Ok(())
}

/// Returns the closing date of schedule period `index`.
///
/// # Errors
///
/// Returns `DepreciationError::DateOutOfRange` if the date overflows the calendar.
pub fn period_date(purchase_date: NaiveDate, index: u32) -> Result<NaiveDate, DepreciationError> {
    purchase_date
        .checked_add_months(Months::new(index))
        .ok_or(DepreciationError::DateOutOfRange(purchase_date, index))
}

/// Dispatches to the per-method amount function.
fn period_amounts(
    method: DepreciationMethod,
    cost: Decimal,
    salvage: Decimal,
    life: u32,
) -> Vec<Decimal> {
    let base = cost - salvage;
    if base.is_zero() {
        return Vec::new();
    }

    match method {
        DepreciationMethod::StraightLine => straight_line(base, life),
        DepreciationMethod::DecliningBalance => declining_balance(cost, salvage, life, Decimal::ONE),
        DepreciationMethod::DoubleDeclining => declining_balance(cost, salvage, life, Decimal::TWO),
        DepreciationMethod::SumOfYearsDigits => sum_of_years_digits(base, life),
    }
}

/// Constant truncated amount; the final period takes the remainder.
fn straight_line(base: Decimal, life: u32) -> Vec<Decimal> {
    let monthly = truncate_money(base / Decimal::from(life));
    let mut amounts = vec![monthly; life as usize];
    if let Some(last) = amounts.last_mut() {
        *last = base - monthly * Decimal::from(life - 1);
    }
    amounts
}

/// Monthly rate `factor / life_months` (i.e. `(factor / life_years) / 12`)
/// applied to the current book value.
///
/// The period that would cross salvage value is clamped onto it and ends the
/// schedule. If the life runs out first, the final period takes the residual.
/// Every period depreciates at least one rounding unit so book value strictly
/// decreases.
fn declining_balance(cost: Decimal, salvage: Decimal, life: u32, factor: Decimal) -> Vec<Decimal> {
    let rate = factor / Decimal::from(life);
    let mut amounts = Vec::new();
    let mut book = cost;

    for period in 1..=life {
        let remaining = book - salvage;
        let mut amount = round_money(book * rate).max(rounding_unit());
        if amount >= remaining || period == life {
            amount = remaining;
        }
        amounts.push(amount);
        book -= amount;
        if book <= salvage {
            break;
        }
    }

    amounts
}

/// Year `y` of `N = ceil(life / 12)` carries weight `(N - y + 1) / sum(1..=N)`;
/// each month of the year takes a twelfth of the yearly amount, even in a
/// partial final year.
fn sum_of_years_digits(base: Decimal, life: u32) -> Vec<Decimal> {
    let years = u64::from(life.div_ceil(12));
    let digits_sum = Decimal::from(years * (years + 1) / 2);
    let mut amounts = Vec::with_capacity(life as usize);
    let mut allocated = Decimal::ZERO;

    for period in 1..=life {
        let year = u64::from((period - 1) / 12 + 1);
        let yearly = base * Decimal::from(years - year + 1) / digits_sum;
        let remaining = base - allocated;

        let amount = if period == life {
            remaining
        } else {
            round_money(yearly / Decimal::from(12)).min(remaining)
        };
        allocated += amount;
        amounts.push(amount);
    }

    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depreciation::types::AssetStatus;
    use fixedledger_shared::types::{AssetId, TenantId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn asset(
        method: DepreciationMethod,
        cost: Decimal,
        salvage: Decimal,
        life: u32,
    ) -> FixedAsset {
        FixedAsset {
            id: AssetId::new(),
            tenant_id: TenantId::new(),
            asset_number: "FA-1".to_string(),
            name: "Test asset".to_string(),
            purchase_date: date(2024, 1, 1),
            purchase_cost: cost,
            salvage_value: salvage,
            useful_life_months: life,
            depreciation_method: method,
            accumulated_depreciation: Decimal::ZERO,
            last_depreciation_date: None,
            status: AssetStatus::Active,
            version: 0,
        }
    }

    fn total(lines: &[ScheduleLine]) -> Decimal {
        lines.iter().map(|l| l.depreciation_amount).sum()
    }

    #[test]
    fn test_straight_line_even_split() {
        let a = asset(DepreciationMethod::StraightLine, dec!(120000), dec!(0), 12);
        let lines = ScheduleGenerator::generate(&a).unwrap();

        assert_eq!(lines.len(), 12);
        assert!(lines.iter().all(|l| l.depreciation_amount == dec!(10000)));
        assert_eq!(lines[2].accumulated_depreciation, dec!(30000));
        assert_eq!(lines[11].book_value, dec!(0));
        assert_eq!(lines[0].date, date(2024, 2, 1));
        assert_eq!(lines[11].date, date(2025, 1, 1));
    }

    #[test]
    fn test_straight_line_final_period_absorbs_remainder() {
        let a = asset(DepreciationMethod::StraightLine, dec!(1000), dec!(0), 3);
        let lines = ScheduleGenerator::generate(&a).unwrap();

        assert_eq!(lines[0].depreciation_amount, dec!(333.33));
        assert_eq!(lines[1].depreciation_amount, dec!(333.33));
        assert_eq!(lines[2].depreciation_amount, dec!(333.34));
        assert_eq!(total(&lines), dec!(1000));
    }

    #[test]
    fn test_double_declining_clamps_to_salvage_and_stops() {
        let a = asset(DepreciationMethod::DoubleDeclining, dec!(10000), dec!(9000), 24);
        let lines = ScheduleGenerator::generate(&a).unwrap();

        // 10000 * 2/24 = 833.33, then 9166.67 * 2/24 = 763.89 crosses 9000.
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].depreciation_amount, dec!(833.33));
        assert_eq!(lines[1].depreciation_amount, dec!(166.67));
        assert_eq!(lines[1].book_value, dec!(9000));
    }

    #[test]
    fn test_declining_balance_final_period_takes_residual() {
        let a = asset(DepreciationMethod::DecliningBalance, dec!(1200), dec!(0), 12);
        let lines = ScheduleGenerator::generate(&a).unwrap();

        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0].depreciation_amount, dec!(100));
        assert_eq!(lines[11].book_value, dec!(0));
        assert_eq!(total(&lines), dec!(1200));
    }

    #[test]
    fn test_sum_of_years_digits_three_year_life() {
        let a = asset(DepreciationMethod::SumOfYearsDigits, dec!(7200), dec!(0), 36);
        let lines = ScheduleGenerator::generate(&a).unwrap();

        // Weights 3/6, 2/6, 1/6 -> yearly 3600, 2400, 1200.
        assert_eq!(lines[0].depreciation_amount, dec!(300));
        assert_eq!(lines[12].depreciation_amount, dec!(200));
        assert_eq!(lines[24].depreciation_amount, dec!(100));
        assert_eq!(lines[11].accumulated_depreciation, dec!(3600));
        assert_eq!(total(&lines), dec!(7200));
    }

    #[test]
    fn test_sum_of_years_digits_partial_final_year() {
        let a = asset(DepreciationMethod::SumOfYearsDigits, dec!(900), dec!(0), 18);
        let lines = ScheduleGenerator::generate(&a).unwrap();

        // Weights 2/3, 1/3 -> yearly 600 and 300, each taken a twelfth per month.
        assert_eq!(lines.len(), 18);
        assert_eq!(lines[0].depreciation_amount, dec!(50));
        assert_eq!(lines[11].accumulated_depreciation, dec!(600));
        assert!(lines[12..17].iter().all(|l| l.depreciation_amount == dec!(25)));
        assert_eq!(lines[17].depreciation_amount, dec!(175));
        assert_eq!(total(&lines), dec!(900));
    }

    #[test]
    fn test_zero_depreciable_base_is_empty() {
        let a = asset(DepreciationMethod::StraightLine, dec!(500), dec!(500), 12);
        assert!(ScheduleGenerator::generate(&a).unwrap().is_empty());
    }

    #[rstest]
    #[case(dec!(100), dec!(0), 0, DepreciationError::ZeroUsefulLife)]
    #[case(dec!(-1), dec!(0), 12, DepreciationError::NegativeCost(dec!(-1)))]
    #[case(dec!(100), dec!(-1), 12, DepreciationError::NegativeSalvage(dec!(-1)))]
    #[case(
        dec!(100),
        dec!(101),
        12,
        DepreciationError::SalvageExceedsCost { salvage: dec!(101), cost: dec!(100) }
    )]
    #[case(dec!(100), dec!(0), 1_000_000, DepreciationError::UsefulLifeTooLong(1_000_000))]
    #[case(dec!(100.005), dec!(0), 2, DepreciationError::ExcessPrecision(dec!(100.005)))]
    #[case(dec!(100), dec!(0.125), 2, DepreciationError::ExcessPrecision(dec!(0.125)))]
    #[case(Decimal::MAX, dec!(0), 24, DepreciationError::AmountTooLarge(Decimal::MAX))]
    fn test_invalid_terms_rejected(
        #[case] cost: Decimal,
        #[case] salvage: Decimal,
        #[case] life: u32,
        #[case] expected: DepreciationError,
    ) {
        let a = asset(DepreciationMethod::StraightLine, cost, salvage, life);
        assert_eq!(ScheduleGenerator::generate(&a), Err(expected));
    }

    #[test]
    fn test_longest_life_generates_every_period() {
        for method in [
            DepreciationMethod::StraightLine,
            DepreciationMethod::SumOfYearsDigits,
        ] {
            let a = asset(method, max_money_amount(), dec!(0), MAX_USEFUL_LIFE_MONTHS);
            let lines = ScheduleGenerator::generate(&a).unwrap();
            assert_eq!(lines.len(), MAX_USEFUL_LIFE_MONTHS as usize);
            assert_eq!(total(&lines), max_money_amount());
        }
    }

    #[test]
    fn test_storage_scale_amounts_accepted() {
        let a = asset(DepreciationMethod::StraightLine, dec!(1200.0000), dec!(0.0000), 12);
        let lines = ScheduleGenerator::generate(&a).unwrap();
        assert_eq!(lines[0].depreciation_amount, dec!(100));
    }

    #[test]
    fn test_period_date_clamps_month_end_from_purchase() {
        let purchase = date(2024, 1, 31);
        assert_eq!(period_date(purchase, 1).unwrap(), date(2024, 2, 29));
        assert_eq!(period_date(purchase, 2).unwrap(), date(2024, 3, 31));
        assert_eq!(period_date(purchase, 13).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let a = asset(DepreciationMethod::DoubleDeclining, dec!(98765.43), dec!(1234.56), 55);
        assert_eq!(
            ScheduleGenerator::generate(&a).unwrap(),
            ScheduleGenerator::generate(&a).unwrap()
        );
    }
}
