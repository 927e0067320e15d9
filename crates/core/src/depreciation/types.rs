//! Domain types for fixed assets and their depreciation.

use chrono::NaiveDate;
use fixedledger_shared::types::{AssetId, TenantId, YearMonth};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DepreciationError;

/// Depreciation method of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepreciationMethod {
    /// Equal amount every month.
    StraightLine,
    /// Single-rate declining balance (factor 1).
    DecliningBalance,
    /// Double-rate declining balance (factor 2).
    DoubleDeclining,
    /// Sum-of-the-years'-digits.
    SumOfYearsDigits,
}

impl DepreciationMethod {
    /// Returns the canonical string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StraightLine => "STRAIGHT_LINE",
            Self::DecliningBalance => "DECLINING_BALANCE",
            Self::DoubleDeclining => "DOUBLE_DECLINING",
            Self::SumOfYearsDigits => "SUM_OF_YEARS_DIGITS",
        }
    }
}

impl std::fmt::Display for DepreciationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DepreciationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STRAIGHT_LINE" => Ok(Self::StraightLine),
            "DECLINING_BALANCE" => Ok(Self::DecliningBalance),
            "DOUBLE_DECLINING" => Ok(Self::DoubleDeclining),
            "SUM_OF_YEARS_DIGITS" => Ok(Self::SumOfYearsDigits),
            _ => Err(format!("Unknown depreciation method: {s}")),
        }
    }
}

/// Lifecycle status of a fixed asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    /// In service and still depreciating.
    Active,
    /// Net book value has reached salvage value.
    FullyDepreciated,
    /// Removed from service.
    Disposed,
}

impl AssetStatus {
    /// Returns the canonical string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::FullyDepreciated => "FULLY_DEPRECIATED",
            Self::Disposed => "DISPOSED",
        }
    }

    /// Returns true if depreciation can still be posted.
    #[must_use]
    pub const fn is_depreciable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "FULLY_DEPRECIATED" => Ok(Self::FullyDepreciated),
            "DISPOSED" => Ok(Self::Disposed),
            _ => Err(format!("Unknown asset status: {s}")),
        }
    }
}

/// A fixed asset as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedAsset {
    /// Unique identifier.
    pub id: AssetId,
    /// Tenant owning the asset.
    pub tenant_id: TenantId,
    /// Asset number, unique per tenant.
    pub asset_number: String,
    /// Display name.
    pub name: String,
    /// Acquisition date; depreciation starts here.
    pub purchase_date: NaiveDate,
    /// Acquisition cost.
    pub purchase_cost: Decimal,
    /// Residual value at the end of the useful life.
    pub salvage_value: Decimal,
    /// Useful life in months.
    pub useful_life_months: u32,
    /// Depreciation method.
    pub depreciation_method: DepreciationMethod,
    /// Total depreciation posted so far.
    pub accumulated_depreciation: Decimal,
    /// Schedule date of the last posted period.
    pub last_depreciation_date: Option<NaiveDate>,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Optimistic-concurrency version, bumped on every update.
    pub version: i64,
}

impl FixedAsset {
    /// Total amount to expense over the useful life.
    #[must_use]
    pub fn depreciable_base(&self) -> Decimal {
        self.purchase_cost - self.salvage_value
    }

    /// Cost less accumulated depreciation.
    #[must_use]
    pub fn net_book_value(&self) -> Decimal {
        self.purchase_cost - self.accumulated_depreciation
    }

    /// Depreciable base not yet posted.
    #[must_use]
    pub fn remaining_base(&self) -> Decimal {
        (self.depreciable_base() - self.accumulated_depreciation).max(Decimal::ZERO)
    }

    /// Date from which unposted months are counted.
    #[must_use]
    pub fn depreciation_anchor(&self) -> NaiveDate {
        self.last_depreciation_date.unwrap_or(self.purchase_date)
    }
}

/// Input for registering a newly acquired asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFixedAsset {
    /// Tenant owning the asset.
    pub tenant_id: TenantId,
    /// Asset number, unique per tenant.
    pub asset_number: String,
    /// Display name.
    pub name: String,
    /// Acquisition date.
    pub purchase_date: NaiveDate,
    /// Acquisition cost.
    pub purchase_cost: Decimal,
    /// Residual value.
    pub salvage_value: Decimal,
    /// Useful life in months.
    pub useful_life_months: u32,
    /// Depreciation method.
    pub depreciation_method: DepreciationMethod,
}

impl NewFixedAsset {
    /// Validates the input and builds an active asset with nothing posted.
    ///
    /// # Errors
    ///
    /// Returns `DepreciationError` if the asset number is blank, the
    /// depreciation terms are invalid, or the useful life runs past the
    /// supported calendar.
    pub fn into_asset(self, id: AssetId) -> Result<FixedAsset, DepreciationError> {
        if self.asset_number.trim().is_empty() {
            return Err(DepreciationError::EmptyAssetNumber);
        }
        super::schedule::validate_terms(
            self.purchase_cost,
            self.salvage_value,
            self.useful_life_months,
        )?;
        super::schedule::period_date(self.purchase_date, self.useful_life_months)?;

        Ok(FixedAsset {
            id,
            tenant_id: self.tenant_id,
            asset_number: self.asset_number.trim().to_string(),
            name: self.name,
            purchase_date: self.purchase_date,
            purchase_cost: self.purchase_cost,
            salvage_value: self.salvage_value,
            useful_life_months: self.useful_life_months,
            depreciation_method: self.depreciation_method,
            accumulated_depreciation: Decimal::ZERO,
            last_depreciation_date: None,
            status: AssetStatus::Active,
            version: 0,
        })
    }
}

/// One period of a depreciation schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLine {
    /// 1-based period number.
    pub period_index: u32,
    /// Date the period closes on (purchase date plus `period_index` months).
    pub date: NaiveDate,
    /// Depreciation expensed in this period.
    pub depreciation_amount: Decimal,
    /// Running total through this period.
    pub accumulated_depreciation: Decimal,
    /// Cost less the running total.
    pub book_value: Decimal,
}

/// Incremental depreciation owed between the last posting and a target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationCalculation {
    /// Asset the calculation applies to.
    pub asset_id: AssetId,
    /// Requested date.
    pub as_of: NaiveDate,
    /// Whole schedule periods elapsed since the last posting.
    pub months_elapsed: u32,
    /// Amount owed for the elapsed periods.
    pub depreciation_amount: Decimal,
    /// Accumulated depreciation after posting this amount.
    pub new_accumulated_depreciation: Decimal,
    /// Net book value after posting this amount.
    pub new_book_value: Decimal,
    /// Schedule period reached at `as_of` (0 if none has closed yet).
    pub target_period_index: u32,
    /// Date of the target period, if one has closed.
    pub target_date: Option<NaiveDate>,
    /// Calendar months spanned by the elapsed periods, oldest first.
    pub periods: Vec<YearMonth>,
    /// True if posting this amount exhausts the depreciable base.
    pub fully_depreciated: bool,
}

impl DepreciationCalculation {
    /// The calendar month a posting of this calculation is keyed by.
    #[must_use]
    pub fn target_period(&self) -> Option<YearMonth> {
        self.target_date.map(YearMonth::from_date)
    }
}

/// Result of a depreciation calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CalculationOutcome {
    /// An amount (possibly zero) was computed.
    Calculated(DepreciationCalculation),
    /// The asset no longer depreciates; the amount owed is zero.
    NotApplicable {
        /// Status that made the asset ineligible.
        status: AssetStatus,
    },
}

impl CalculationOutcome {
    /// Amount owed, zero when not applicable.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Calculated(calc) => calc.depreciation_amount,
            Self::NotApplicable { .. } => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn new_asset() -> NewFixedAsset {
        NewFixedAsset {
            tenant_id: TenantId::new(),
            asset_number: " FA-001 ".to_string(),
            name: "Delivery van".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            purchase_cost: dec!(120000),
            salvage_value: dec!(20000),
            useful_life_months: 60,
            depreciation_method: DepreciationMethod::StraightLine,
        }
    }

    #[test]
    fn test_into_asset_starts_active_and_empty() {
        let asset = new_asset().into_asset(AssetId::new()).unwrap();
        assert_eq!(asset.asset_number, "FA-001");
        assert_eq!(asset.status, AssetStatus::Active);
        assert_eq!(asset.accumulated_depreciation, Decimal::ZERO);
        assert_eq!(asset.depreciable_base(), dec!(100000));
        assert_eq!(asset.net_book_value(), dec!(120000));
        assert_eq!(asset.depreciation_anchor(), asset.purchase_date);
    }

    #[test]
    fn test_into_asset_rejects_blank_number() {
        let mut input = new_asset();
        input.asset_number = "  ".to_string();
        assert!(matches!(
            input.into_asset(AssetId::new()),
            Err(DepreciationError::EmptyAssetNumber)
        ));
    }

    #[test]
    fn test_into_asset_rejects_salvage_above_cost() {
        let mut input = new_asset();
        input.salvage_value = dec!(120000.01);
        assert!(matches!(
            input.into_asset(AssetId::new()),
            Err(DepreciationError::SalvageExceedsCost { .. })
        ));
    }

    #[test]
    fn test_into_asset_rejects_unbounded_life() {
        let mut input = new_asset();
        input.useful_life_months = 1_000_000;
        input.depreciation_method = DepreciationMethod::SumOfYearsDigits;
        assert_eq!(
            input.into_asset(AssetId::new()),
            Err(DepreciationError::UsefulLifeTooLong(1_000_000))
        );
    }

    #[test]
    fn test_into_asset_rejects_life_past_calendar_end() {
        let mut input = new_asset();
        input.purchase_date = NaiveDate::MAX - chrono::Days::new(40);
        input.useful_life_months = 12;
        assert!(matches!(
            input.into_asset(AssetId::new()),
            Err(DepreciationError::DateOutOfRange(_, 12))
        ));
    }

    #[test]
    fn test_into_asset_rejects_sub_cent_cost() {
        let mut input = new_asset();
        input.purchase_cost = dec!(100.005);
        input.salvage_value = Decimal::ZERO;
        assert_eq!(
            input.into_asset(AssetId::new()),
            Err(DepreciationError::ExcessPrecision(dec!(100.005)))
        );
    }

    #[test]
    fn test_method_round_trips_through_str() {
        for method in [
            DepreciationMethod::StraightLine,
            DepreciationMethod::DecliningBalance,
            DepreciationMethod::DoubleDeclining,
            DepreciationMethod::SumOfYearsDigits,
        ] {
            assert_eq!(DepreciationMethod::from_str(method.as_str()), Ok(method));
        }
        assert!(DepreciationMethod::from_str("units_of_production").is_err());
        assert_eq!(
            DepreciationMethod::from_str("straight_line"),
            Ok(DepreciationMethod::StraightLine)
        );
    }

    #[test]
    fn test_status_depreciable() {
        assert!(AssetStatus::Active.is_depreciable());
        assert!(!AssetStatus::FullyDepreciated.is_depreciable());
        assert!(!AssetStatus::Disposed.is_depreciable());
        assert_eq!(AssetStatus::from_str("DISPOSED"), Ok(AssetStatus::Disposed));
    }
}
