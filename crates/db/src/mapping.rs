//! Conversions between `SeaORM` models and core domain types.

use chrono::Utc;
use fixedledger_core::depreciation::FixedAsset;
use fixedledger_core::period::{FinancialPeriod, PeriodLockState, PeriodTransition};
use fixedledger_core::posting::DepreciationEntry;
use fixedledger_core::store::StoreError;
use fixedledger_shared::types::{
    AssetId, DepreciationEntryId, JournalEntryId, TenantId, UserId, YearMonth,
};
use sea_orm::{DbErr, Set, SqlErr};

use crate::entities::{
    depreciation_entries, financial_periods, fixed_assets, period_lock_events,
};

/// Maps a database error, surfacing unique-key violations.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
        _ => StoreError::Backend(err.to_string()),
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("invalid stored {what}: {detail}"))
}

/// Splits a month key into its stored `(year, month)` columns.
pub(crate) fn period_columns(period: YearMonth) -> (i32, i32) {
    // Months are 1-12 by construction.
    (period.year, i32::try_from(period.month).unwrap_or_default())
}

pub(crate) fn year_month(year: i32, month: i32) -> Result<YearMonth, StoreError> {
    u32::try_from(month)
        .ok()
        .and_then(|m| YearMonth::new(year, m))
        .ok_or_else(|| corrupt("period", format!("{year}-{month}")))
}

pub(crate) fn asset_from_model(model: fixed_assets::Model) -> Result<FixedAsset, StoreError> {
    Ok(FixedAsset {
        id: AssetId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        asset_number: model.asset_number,
        name: model.name,
        purchase_date: model.purchase_date,
        purchase_cost: model.purchase_cost,
        salvage_value: model.salvage_value,
        useful_life_months: u32::try_from(model.useful_life_months)
            .map_err(|e| corrupt("useful life", e))?,
        depreciation_method: model
            .depreciation_method
            .parse()
            .map_err(|e: String| corrupt("depreciation method", e))?,
        accumulated_depreciation: model.accumulated_depreciation,
        last_depreciation_date: model.last_depreciation_date,
        status: model
            .status
            .parse()
            .map_err(|e: String| corrupt("asset status", e))?,
        version: model.version,
    })
}

pub(crate) fn asset_to_active_model(
    asset: &FixedAsset,
) -> Result<fixed_assets::ActiveModel, StoreError> {
    let now = Utc::now().into();
    Ok(fixed_assets::ActiveModel {
        id: Set(asset.id.into_inner()),
        tenant_id: Set(asset.tenant_id.into_inner()),
        asset_number: Set(asset.asset_number.clone()),
        name: Set(asset.name.clone()),
        purchase_date: Set(asset.purchase_date),
        purchase_cost: Set(asset.purchase_cost),
        salvage_value: Set(asset.salvage_value),
        useful_life_months: Set(i32::try_from(asset.useful_life_months)
            .map_err(|e| StoreError::Backend(format!("useful life out of range: {e}")))?),
        depreciation_method: Set(asset.depreciation_method.as_str().to_string()),
        accumulated_depreciation: Set(asset.accumulated_depreciation),
        last_depreciation_date: Set(asset.last_depreciation_date),
        status: Set(asset.status.as_str().to_string()),
        version: Set(asset.version),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

pub(crate) fn period_from_model(
    model: financial_periods::Model,
) -> Result<FinancialPeriod, StoreError> {
    Ok(FinancialPeriod {
        tenant_id: TenantId::from_uuid(model.tenant_id),
        period: year_month(model.period_year, model.period_month)?,
        state: PeriodLockState::from_locked(model.is_locked),
        locked_at: model.locked_at.map(|at| at.with_timezone(&Utc)),
        locked_by: model.locked_by.map(UserId::from_uuid),
        version: model.version,
    })
}

pub(crate) fn transition_from_model(
    model: period_lock_events::Model,
) -> Result<PeriodTransition, StoreError> {
    Ok(PeriodTransition {
        tenant_id: TenantId::from_uuid(model.tenant_id),
        period: year_month(model.period_year, model.period_month)?,
        from_state: model
            .from_state
            .parse()
            .map_err(|e: String| corrupt("lock state", e))?,
        to_state: model
            .to_state
            .parse()
            .map_err(|e: String| corrupt("lock state", e))?,
        actor: UserId::from_uuid(model.actor),
        occurred_at: model.occurred_at.with_timezone(&Utc),
    })
}

pub(crate) fn entry_from_model(
    model: depreciation_entries::Model,
) -> Result<DepreciationEntry, StoreError> {
    Ok(DepreciationEntry {
        id: DepreciationEntryId::from_uuid(model.id),
        asset_id: AssetId::from_uuid(model.asset_id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        period: year_month(model.period_year, model.period_month)?,
        amount: model.amount,
        journal_entry_id: JournalEntryId::from_uuid(model.journal_entry_id),
        posted_by: UserId::from_uuid(model.posted_by),
        posted_at: model.posted_at.with_timezone(&Utc),
    })
}

pub(crate) fn entry_to_active_model(entry: &DepreciationEntry) -> depreciation_entries::ActiveModel {
    let (period_year, period_month) = period_columns(entry.period);
    depreciation_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        asset_id: Set(entry.asset_id.into_inner()),
        tenant_id: Set(entry.tenant_id.into_inner()),
        period_year: Set(period_year),
        period_month: Set(period_month),
        amount: Set(entry.amount),
        journal_entry_id: Set(entry.journal_entry_id.into_inner()),
        posted_by: Set(entry.posted_by.into_inner()),
        posted_at: Set(entry.posted_at.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fixedledger_core::depreciation::{AssetStatus, DepreciationMethod};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn asset_model() -> fixed_assets::Model {
        let now = Utc::now().into();
        fixed_assets::Model {
            id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            asset_number: "FA-9".to_string(),
            name: "Lathe".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            purchase_cost: dec!(5000.0000),
            salvage_value: dec!(500.0000),
            useful_life_months: 36,
            depreciation_method: "SUM_OF_YEARS_DIGITS".to_string(),
            accumulated_depreciation: dec!(0),
            last_depreciation_date: None,
            status: "ACTIVE".to_string(),
            version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_asset_from_model() {
        let model = asset_model();
        let asset = asset_from_model(model.clone()).unwrap();

        assert_eq!(asset.id.into_inner(), model.id);
        assert_eq!(asset.depreciation_method, DepreciationMethod::SumOfYearsDigits);
        assert_eq!(asset.status, AssetStatus::Active);
        assert_eq!(asset.useful_life_months, 36);
        assert_eq!(asset.version, 4);
    }

    #[test]
    fn test_asset_from_model_rejects_unknown_method() {
        let mut model = asset_model();
        model.depreciation_method = "UNITS_OF_PRODUCTION".to_string();
        assert!(matches!(asset_from_model(model), Err(StoreError::Backend(_))));
    }

    #[test]
    fn test_year_month_validates_stored_month() {
        assert_eq!(year_month(2024, 3).unwrap(), YearMonth::new(2024, 3).unwrap());
        assert!(year_month(2024, 0).is_err());
        assert!(year_month(2024, -1).is_err());
        assert_eq!(period_columns(YearMonth::new(2025, 12).unwrap()), (2025, 12));
    }

    #[test]
    fn test_unrelated_db_error_is_backend() {
        let err = store_error(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
