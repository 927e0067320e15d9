//! Incremental depreciation calculation.
//!
//! The amount owed is read off the schedule: the schedule's running total at
//! the period reached by `as_of`, less what the asset has already accumulated.
//! This keeps partial postings exactly consistent with the full projection.

use chrono::{Datelike, NaiveDate};
use fixedledger_shared::types::YearMonth;
use rust_decimal::Decimal;

use super::error::DepreciationError;
use super::schedule::{ScheduleGenerator, period_date};
use super::types::{CalculationOutcome, DepreciationCalculation, FixedAsset};

/// Computes what an asset owes between its last posting and a target date.
pub struct DepreciationCalculator;

impl DepreciationCalculator {
    /// Calculates the incremental depreciation as of `as_of`.
    ///
    /// Months are counted on the schedule grid: period `i` has elapsed once
    /// `purchase_date + i months <= as_of`. `last_depreciation_date` is always
    /// written as a schedule date, so the periods elapsed since it are the
    /// periods reached at `as_of` less the periods reached at it.
    ///
    /// # Errors
    ///
    /// Returns `DepreciationError` if the asset terms are invalid, `as_of`
    /// precedes the last depreciation (or purchase) date, or the accumulated
    /// depreciation is already beyond the depreciable base.
    pub fn calculate(
        asset: &FixedAsset,
        as_of: NaiveDate,
    ) -> Result<CalculationOutcome, DepreciationError> {
        if !asset.status.is_depreciable() {
            return Ok(CalculationOutcome::NotApplicable {
                status: asset.status,
            });
        }

        let anchor = asset.depreciation_anchor();
        if as_of < anchor {
            return Err(DepreciationError::DateBeforeLastDepreciation { as_of, anchor });
        }

        let base = asset.depreciable_base();
        if asset.accumulated_depreciation > base {
            return Err(DepreciationError::AccumulatedExceedsBase {
                accumulated: asset.accumulated_depreciation,
                base,
            });
        }

        let schedule = ScheduleGenerator::generate(asset)?;
        let schedule_len = u32::try_from(schedule.len()).unwrap_or(u32::MAX);

        let posted = whole_months_between(asset.purchase_date, anchor)?.min(schedule_len);
        let target = whole_months_between(asset.purchase_date, as_of)?.min(schedule_len);
        let months_elapsed = target.saturating_sub(posted);

        let cumulative_at_target = target
            .checked_sub(1)
            .and_then(|i| schedule.get(i as usize))
            .map_or(Decimal::ZERO, |line| line.accumulated_depreciation);

        let depreciation_amount = (cumulative_at_target - asset.accumulated_depreciation)
            .max(Decimal::ZERO)
            .min(asset.remaining_base());
        let new_accumulated_depreciation = asset.accumulated_depreciation + depreciation_amount;

        let target_date = if target == 0 {
            None
        } else {
            Some(period_date(asset.purchase_date, target)?)
        };

        let mut periods = Vec::with_capacity(months_elapsed as usize);
        for index in (posted + 1)..=target {
            periods.push(YearMonth::from_date(period_date(asset.purchase_date, index)?));
        }

        Ok(CalculationOutcome::Calculated(DepreciationCalculation {
            asset_id: asset.id,
            as_of,
            months_elapsed,
            depreciation_amount,
            new_accumulated_depreciation,
            new_book_value: asset.purchase_cost - new_accumulated_depreciation,
            target_period_index: target,
            target_date,
            periods,
            fully_depreciated: new_accumulated_depreciation >= base,
        }))
    }
}

/// Counts whole months from `start` to `end`, with month-end clamping.
///
/// Returns 0 when `end` precedes `start`.
///
/// # Errors
///
/// Returns `DepreciationError::DateOutOfRange` if a candidate date overflows.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> Result<u32, DepreciationError> {
    if end <= start {
        return Ok(0);
    }

    let raw = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    let mut months = u32::try_from(raw.max(0)).unwrap_or(0);
    if months > 0 && period_date(start, months)? > end {
        months -= 1;
    }
    Ok(months)
}
