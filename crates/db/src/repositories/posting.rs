//! Depreciation posting repository.
//!
//! A posting runs inside one `PostgreSQL` transaction. Touched period rows
//! are held `FOR SHARE` so a concurrent lock waits for the posting to end,
//! the entry insert is guarded by `uq_depreciation_entries_period` and the
//! locked-period trigger, and the asset update is a version compare-and-set.

use async_trait::async_trait;
use chrono::Utc;
use fixedledger_core::depreciation::FixedAsset;
use fixedledger_core::posting::{DepreciationEntry, JournalRequest};
use fixedledger_core::store::{AssetPatch, PostingStore, PostingTransaction, StoreError};
use fixedledger_shared::types::{AssetId, JournalEntryId, TenantId, YearMonth};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, warn};

use super::period::ensure_period_row;
use crate::entities::{depreciation_entries, financial_periods, fixed_assets, journal_entries};
use crate::mapping::{
    asset_from_model, entry_from_model, entry_to_active_model, period_columns, store_error,
};

/// Marker raised by the `reject_locked_period_posting` trigger.
const PERIOD_LOCKED_MARKER: &str = "FINANCIAL_PERIOD_LOCKED";

/// Depreciation entry repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    db: DatabaseConnection,
}

impl PostingRepository {
    /// Creates a new posting repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostingStore for PostingRepository {
    async fn begin(&self) -> Result<Box<dyn PostingTransaction>, StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(Box::new(PgPostingTransaction { txn }))
    }

    async fn find_entry(
        &self,
        asset_id: AssetId,
        period: YearMonth,
    ) -> Result<Option<DepreciationEntry>, StoreError> {
        let (period_year, period_month) = period_columns(period);
        depreciation_entries::Entity::find()
            .filter(depreciation_entries::Column::AssetId.eq(asset_id.into_inner()))
            .filter(depreciation_entries::Column::PeriodYear.eq(period_year))
            .filter(depreciation_entries::Column::PeriodMonth.eq(period_month))
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(entry_from_model)
            .transpose()
    }

    async fn list_entries(&self, asset_id: AssetId) -> Result<Vec<DepreciationEntry>, StoreError> {
        depreciation_entries::Entity::find()
            .filter(depreciation_entries::Column::AssetId.eq(asset_id.into_inner()))
            .order_by_asc(depreciation_entries::Column::PeriodYear)
            .order_by_asc(depreciation_entries::Column::PeriodMonth)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(entry_from_model)
            .collect()
    }
}

/// An open posting transaction.
#[derive(Debug)]
pub struct PgPostingTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl PostingTransaction for PgPostingTransaction {
    async fn ensure_periods_unlocked(
        &mut self,
        tenant_id: TenantId,
        periods: &[YearMonth],
    ) -> Result<(), StoreError> {
        for &period in periods {
            // The row must exist for FOR SHARE to hold anything.
            ensure_period_row(&self.txn, tenant_id, period).await?;

            let (period_year, period_month) = period_columns(period);
            let row = financial_periods::Entity::find_by_id((
                tenant_id.into_inner(),
                period_year,
                period_month,
            ))
            .lock_shared()
            .one(&self.txn)
            .await
            .map_err(store_error)?;

            if row.is_some_and(|r| r.is_locked) {
                return Err(StoreError::PeriodLocked { period });
            }
        }
        Ok(())
    }

    async fn insert_entry(&mut self, entry: &DepreciationEntry) -> Result<(), StoreError> {
        depreciation_entries::Entity::insert(entry_to_active_model(entry))
            .exec_without_returning(&self.txn)
            .await
            .map_err(|err| {
                if err.to_string().contains(PERIOD_LOCKED_MARKER) {
                    StoreError::PeriodLocked {
                        period: entry.period,
                    }
                } else {
                    store_error(err)
                }
            })?;
        Ok(())
    }

    async fn compare_and_update_asset(
        &mut self,
        asset_id: AssetId,
        expected_version: i64,
        patch: &AssetPatch,
    ) -> Result<FixedAsset, StoreError> {
        let result = fixed_assets::Entity::update_many()
            .col_expr(
                fixed_assets::Column::AccumulatedDepreciation,
                Expr::value(patch.accumulated_depreciation),
            )
            .col_expr(
                fixed_assets::Column::LastDepreciationDate,
                Expr::value(patch.last_depreciation_date),
            )
            .col_expr(fixed_assets::Column::Status, Expr::value(patch.status.as_str()))
            .col_expr(
                fixed_assets::Column::Version,
                Expr::col(fixed_assets::Column::Version).add(1),
            )
            .col_expr(fixed_assets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(fixed_assets::Column::Id.eq(asset_id.into_inner()))
            .filter(fixed_assets::Column::Version.eq(expected_version))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;

        let current = fixed_assets::Entity::find_by_id(asset_id.into_inner())
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound(format!("fixed asset {asset_id}")))?;

        if result.rows_affected == 0 {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual: Some(current.version),
            });
        }

        asset_from_model(current)
    }

    async fn append_journal(
        &mut self,
        request: &JournalRequest,
    ) -> Result<JournalEntryId, StoreError> {
        let row = journal_entries::ActiveModel {
            id: Set(request.id.into_inner()),
            tenant_id: Set(request.tenant_id.into_inner()),
            entry_date: Set(request.entry_date),
            amount: Set(request.amount),
            memo: Set(request.memo.clone()),
            source_type: Set(request.source_type.as_str().to_string()),
            source_id: Set(request.source_id.into_inner()),
            created_at: Set(Utc::now().into()),
        };

        journal_entries::Entity::insert(row)
            .exec_without_returning(&self.txn)
            .await
            .map_err(|err| {
                warn!(journal_entry_id = %request.id, error = %err, "Journal append rejected");
                StoreError::LedgerAppend(err.to_string())
            })?;
        Ok(request.id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(store_error)?;
        debug!("Posting transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fixedledger_core::depreciation::AssetStatus;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use uuid::Uuid;

    fn asset_model(id: Uuid, version: i64) -> fixed_assets::Model {
        let now = Utc::now().into();
        fixed_assets::Model {
            id,
            tenant_id: Uuid::now_v7(),
            asset_number: "FA-1".to_string(),
            name: "Forklift".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            purchase_cost: dec!(12000),
            salvage_value: dec!(0),
            useful_life_months: 12,
            depreciation_method: "STRAIGHT_LINE".to_string(),
            accumulated_depreciation: dec!(1000),
            last_depreciation_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            status: "ACTIVE".to_string(),
            version,
            created_at: now,
            updated_at: now,
        }
    }

    fn patch() -> AssetPatch {
        AssetPatch {
            accumulated_depreciation: dec!(4000),
            last_depreciation_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            status: AssetStatus::Active,
        }
    }

    const fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_stale_version_is_mismatch() {
        let id = Uuid::now_v7();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .append_query_results([vec![asset_model(id, 5)]])
            .into_connection();
        let repo = PostingRepository::new(db);

        let mut tx = repo.begin().await.unwrap();
        let err = tx
            .compare_and_update_asset(AssetId::from_uuid(id), 3, &patch())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionMismatch {
                expected: 3,
                actual: Some(5)
            }
        );
    }

    #[tokio::test]
    async fn test_matching_version_returns_updated_asset() {
        let id = Uuid::now_v7();
        let mut updated = asset_model(id, 4);
        updated.accumulated_depreciation = dec!(4000);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .append_query_results([vec![updated]])
            .into_connection();
        let repo = PostingRepository::new(db);

        let mut tx = repo.begin().await.unwrap();
        let asset = tx
            .compare_and_update_asset(AssetId::from_uuid(id), 3, &patch())
            .await
            .unwrap();
        assert_eq!(asset.version, 4);
        assert_eq!(asset.accumulated_depreciation, dec!(4000));
    }

    #[tokio::test]
    async fn test_locked_period_row_rejects_posting() {
        let tenant = Uuid::now_v7();
        let locked = financial_periods::Model {
            tenant_id: tenant,
            period_year: 2024,
            period_month: 3,
            is_locked: true,
            locked_at: Some(Utc::now().into()),
            locked_by: Some(Uuid::now_v7()),
            version: 1,
            updated_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .append_query_results([vec![locked]])
            .into_connection();
        let repo = PostingRepository::new(db);
        let period = YearMonth::new(2024, 3).unwrap();

        let mut tx = repo.begin().await.unwrap();
        let err = tx
            .ensure_periods_unlocked(TenantId::from_uuid(tenant), &[period])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::PeriodLocked { period });
    }

    #[tokio::test]
    async fn test_list_entries_maps_rows() {
        let asset_id = Uuid::now_v7();
        let row = |month: i32| depreciation_entries::Model {
            id: Uuid::now_v7(),
            asset_id,
            tenant_id: Uuid::now_v7(),
            period_year: 2024,
            period_month: month,
            amount: dec!(1000),
            journal_entry_id: Uuid::now_v7(),
            posted_by: Uuid::now_v7(),
            posted_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(1), row(4)]])
            .into_connection();
        let repo = PostingRepository::new(db);

        let entries = repo.list_entries(AssetId::from_uuid(asset_id)).await.unwrap();
        let periods: Vec<_> = entries.iter().map(|e| e.period.to_string()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-04"]);
    }
}
