//! Financial period repository.
//!
//! A lock transition is a conditional `UPDATE ... WHERE is_locked = <from>`
//! on the period row, committed together with its audit event. Two callers
//! racing from the same state cannot both match the row.

use async_trait::async_trait;
use chrono::Utc;
use fixedledger_core::period::{FinancialPeriod, PeriodLockState, PeriodTransition};
use fixedledger_core::store::{PeriodStore, StoreError};
use fixedledger_shared::types::{TenantId, UserId, YearMonth};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{financial_periods, period_lock_events};
use crate::mapping::{period_columns, period_from_model, store_error, transition_from_model};

/// Financial period repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    db: DatabaseConnection,
}

impl PeriodRepository {
    /// Creates a new period repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Inserts an unlocked row for the period unless one exists.
pub(crate) async fn ensure_period_row<C: ConnectionTrait>(
    db: &C,
    tenant_id: TenantId,
    period: YearMonth,
) -> Result<(), StoreError> {
    let (period_year, period_month) = period_columns(period);
    let row = financial_periods::ActiveModel {
        tenant_id: Set(tenant_id.into_inner()),
        period_year: Set(period_year),
        period_month: Set(period_month),
        is_locked: Set(false),
        locked_at: Set(None),
        locked_by: Set(None),
        version: Set(0),
        updated_at: Set(Utc::now().into()),
    };

    financial_periods::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                financial_periods::Column::TenantId,
                financial_periods::Column::PeriodYear,
                financial_periods::Column::PeriodMonth,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .map_err(store_error)?;
    Ok(())
}

fn period_key(tenant_id: TenantId, period: YearMonth) -> (Uuid, i32, i32) {
    let (year, month) = period_columns(period);
    (tenant_id.into_inner(), year, month)
}

#[async_trait]
impl PeriodStore for PeriodRepository {
    async fn get(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<Option<FinancialPeriod>, StoreError> {
        financial_periods::Entity::find_by_id(period_key(tenant_id, period))
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(period_from_model)
            .transpose()
    }

    async fn atomic_transition(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
        from: PeriodLockState,
        to: PeriodLockState,
        actor: UserId,
    ) -> Result<FinancialPeriod, StoreError> {
        let (period_year, period_month) = period_columns(period);
        let txn = self.db.begin().await.map_err(store_error)?;

        ensure_period_row(&txn, tenant_id, period).await?;

        let now = Utc::now();
        let mut update = financial_periods::Entity::update_many()
            .col_expr(financial_periods::Column::IsLocked, Expr::value(to.is_locked()))
            .col_expr(
                financial_periods::Column::Version,
                Expr::col(financial_periods::Column::Version).add(1),
            )
            .col_expr(financial_periods::Column::UpdatedAt, Expr::value(now));
        if to.is_locked() {
            update = update
                .col_expr(financial_periods::Column::LockedAt, Expr::value(now))
                .col_expr(
                    financial_periods::Column::LockedBy,
                    Expr::value(actor.into_inner()),
                );
        }

        let result = update
            .filter(financial_periods::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(financial_periods::Column::PeriodYear.eq(period_year))
            .filter(financial_periods::Column::PeriodMonth.eq(period_month))
            .filter(financial_periods::Column::IsLocked.eq(from.is_locked()))
            .exec(&txn)
            .await
            .map_err(store_error)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(store_error)?;
            return Err(StoreError::TransitionConflict(format!(
                "period {period} is no longer {from}"
            )));
        }

        let event = period_lock_events::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(tenant_id.into_inner()),
            period_year: Set(period_year),
            period_month: Set(period_month),
            from_state: Set(from.as_str().to_string()),
            to_state: Set(to.as_str().to_string()),
            actor: Set(actor.into_inner()),
            occurred_at: Set(now.into()),
        };
        period_lock_events::Entity::insert(event)
            .exec_without_returning(&txn)
            .await
            .map_err(store_error)?;

        let updated = financial_periods::Entity::find_by_id(period_key(tenant_id, period))
            .one(&txn)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound(format!("financial period {period}")))?;

        txn.commit().await.map_err(store_error)?;
        debug!(%tenant_id, %period, %from, %to, "Period transition committed");
        period_from_model(updated)
    }

    async fn history(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<Vec<PeriodTransition>, StoreError> {
        let (period_year, period_month) = period_columns(period);
        period_lock_events::Entity::find()
            .filter(period_lock_events::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(period_lock_events::Column::PeriodYear.eq(period_year))
            .filter(period_lock_events::Column::PeriodMonth.eq(period_month))
            .order_by_asc(period_lock_events::Column::OccurredAt)
            .order_by_asc(period_lock_events::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(transition_from_model)
            .collect()
    }
}
