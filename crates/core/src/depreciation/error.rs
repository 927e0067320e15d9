//! Depreciation error types.
//!
//! Every variant is a validation failure: the input asset or date is
//! malformed and retrying with the same input cannot succeed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by schedule generation and depreciation calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepreciationError {
    /// Useful life must be at least one month.
    #[error("Useful life must be greater than zero months")]
    ZeroUsefulLife,

    /// Useful life is longer than the supported maximum.
    #[error("Useful life of {0} months exceeds the maximum of {max} months", max = crate::depreciation::MAX_USEFUL_LIFE_MONTHS)]
    UsefulLifeTooLong(u32),

    /// Purchase cost cannot be negative.
    #[error("Purchase cost cannot be negative: {0}")]
    NegativeCost(Decimal),

    /// Salvage value cannot be negative.
    #[error("Salvage value cannot be negative: {0}")]
    NegativeSalvage(Decimal),

    /// Salvage value exceeds purchase cost.
    #[error("Salvage value {salvage} exceeds purchase cost {cost}")]
    SalvageExceedsCost {
        /// Salvage value.
        salvage: Decimal,
        /// Purchase cost.
        cost: Decimal,
    },

    /// An amount has more decimal places than the money scale.
    #[error("Amount {0} has more than 2 decimal places")]
    ExcessPrecision(Decimal),

    /// An amount is larger than the ledger can store.
    #[error("Amount {0} exceeds the maximum storable amount")]
    AmountTooLarge(Decimal),

    /// Asset number is blank.
    #[error("Asset number cannot be empty")]
    EmptyAssetNumber,

    /// Requested date precedes the last posting (or the purchase date).
    #[error("Date {as_of} is before the last depreciation date {anchor}")]
    DateBeforeLastDepreciation {
        /// Requested date.
        as_of: NaiveDate,
        /// Last depreciation date, or purchase date if never posted.
        anchor: NaiveDate,
    },

    /// Accumulated depreciation already exceeds the depreciable base.
    #[error("Accumulated depreciation {accumulated} exceeds depreciable base {base}")]
    AccumulatedExceedsBase {
        /// Accumulated depreciation on the asset.
        accumulated: Decimal,
        /// Purchase cost less salvage value.
        base: Decimal,
    },

    /// A schedule date falls outside the supported calendar range.
    #[error("Schedule date out of range: {0} plus {1} months")]
    DateOutOfRange(NaiveDate, u32),
}

impl DepreciationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroUsefulLife => "ZERO_USEFUL_LIFE",
            Self::UsefulLifeTooLong(_) => "USEFUL_LIFE_TOO_LONG",
            Self::NegativeCost(_) => "NEGATIVE_COST",
            Self::NegativeSalvage(_) => "NEGATIVE_SALVAGE",
            Self::SalvageExceedsCost { .. } => "SALVAGE_EXCEEDS_COST",
            Self::ExcessPrecision(_) => "EXCESS_PRECISION",
            Self::AmountTooLarge(_) => "AMOUNT_TOO_LARGE",
            Self::EmptyAssetNumber => "EMPTY_ASSET_NUMBER",
            Self::DateBeforeLastDepreciation { .. } => "DATE_BEFORE_LAST_DEPRECIATION",
            Self::AccumulatedExceedsBase { .. } => "ACCUMULATED_EXCEEDS_BASE",
            Self::DateOutOfRange(..) => "DATE_OUT_OF_RANGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(DepreciationError::ZeroUsefulLife.error_code(), "ZERO_USEFUL_LIFE");
        assert_eq!(
            DepreciationError::SalvageExceedsCost {
                salvage: dec!(10),
                cost: dec!(5),
            }
            .error_code(),
            "SALVAGE_EXCEEDS_COST"
        );
    }

    #[test]
    fn test_error_display() {
        let err = DepreciationError::DateBeforeLastDepreciation {
            as_of: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            anchor: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Date 2024-01-15 is before the last depreciation date 2024-02-01"
        );

        assert_eq!(
            DepreciationError::UsefulLifeTooLong(1201).to_string(),
            "Useful life of 1201 months exceeds the maximum of 1200 months"
        );

        let err = DepreciationError::SalvageExceedsCost {
            salvage: dec!(150.00),
            cost: dec!(100.00),
        };
        assert_eq!(
            err.to_string(),
            "Salvage value 150.00 exceeds purchase cost 100.00"
        );
    }
}
