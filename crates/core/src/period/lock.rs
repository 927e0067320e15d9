//! Period lock manager.
//!
//! Every read goes to the store; there is no cache, so a lock committed by
//! one caller is seen by the next `is_locked` call anywhere. Transitions are
//! compare-and-set: read the current state, then ask the store to move it
//! only if it is still that state.

use std::sync::Arc;

use chrono::NaiveDate;
use fixedledger_shared::types::{TenantId, UserId, YearMonth};
use tracing::{info, instrument, warn};

use super::error::PeriodError;
use super::types::{FinancialPeriod, PeriodLockState, PeriodStatus};
use crate::store::{PeriodStore, StoreError};

/// Guards financial periods against depreciation posting.
#[derive(Clone)]
pub struct PeriodLockManager {
    store: Arc<dyn PeriodStore>,
}

impl std::fmt::Debug for PeriodLockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodLockManager").finish_non_exhaustive()
    }
}

impl PeriodLockManager {
    /// Creates a lock manager over a period store.
    #[must_use]
    pub fn new(store: Arc<dyn PeriodStore>) -> Self {
        Self { store }
    }

    /// Returns true if the month containing `date` is locked for the tenant.
    ///
    /// A period never referenced before is unlocked.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::Store` if the store cannot be read.
    pub async fn is_locked(&self, tenant_id: TenantId, date: NaiveDate) -> Result<bool, PeriodError> {
        self.is_period_locked(tenant_id, YearMonth::from_date(date)).await
    }

    /// Returns true if `period` is locked for the tenant.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::Store` if the store cannot be read.
    pub async fn is_period_locked(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<bool, PeriodError> {
        Ok(self.current(tenant_id, period).await?.is_locked())
    }

    /// Returns the current state of a period.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::InvalidPeriod` for a month outside 1-12, or
    /// `PeriodError::Store` if the store cannot be read.
    pub async fn state(
        &self,
        tenant_id: TenantId,
        year: i32,
        month: u32,
    ) -> Result<FinancialPeriod, PeriodError> {
        self.current(tenant_id, parse_period(year, month)?).await
    }

    /// Returns the current state of a period and its transition history.
    ///
    /// # Errors
    ///
    /// Same as [`Self::state`].
    pub async fn status(
        &self,
        tenant_id: TenantId,
        year: i32,
        month: u32,
    ) -> Result<PeriodStatus, PeriodError> {
        let period = parse_period(year, month)?;
        let current = self.current(tenant_id, period).await?;
        let history = self.store.history(tenant_id, period).await?;
        Ok(PeriodStatus {
            period: current,
            history,
        })
    }

    /// Locks a period.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::InvalidTransition` if it is already locked, or
    /// `PeriodError::Conflict` if a concurrent transition won the race.
    pub async fn lock(
        &self,
        tenant_id: TenantId,
        year: i32,
        month: u32,
        actor: UserId,
    ) -> Result<FinancialPeriod, PeriodError> {
        self.transition(tenant_id, parse_period(year, month)?, PeriodLockState::Locked, actor)
            .await
    }

    /// Unlocks a period.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::InvalidTransition` if it is already unlocked, or
    /// `PeriodError::Conflict` if a concurrent transition won the race.
    pub async fn unlock(
        &self,
        tenant_id: TenantId,
        year: i32,
        month: u32,
        actor: UserId,
    ) -> Result<FinancialPeriod, PeriodError> {
        self.transition(tenant_id, parse_period(year, month)?, PeriodLockState::Unlocked, actor)
            .await
    }

    #[instrument(skip_all, fields(%tenant_id, %period, %target, %actor))]
    async fn transition(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
        target: PeriodLockState,
        actor: UserId,
    ) -> Result<FinancialPeriod, PeriodError> {
        let current = self.current(tenant_id, period).await?;
        if current.state == target {
            return Err(PeriodError::InvalidTransition {
                period,
                state: current.state,
            });
        }

        match self
            .store
            .atomic_transition(tenant_id, period, current.state, target, actor)
            .await
        {
            Ok(updated) => {
                info!(version = updated.version, "Financial period transitioned");
                Ok(updated)
            }
            Err(StoreError::TransitionConflict(reason)) => {
                warn!(%reason, "Lost period transition race");
                Err(PeriodError::Conflict { period })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn current(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<FinancialPeriod, PeriodError> {
        Ok(self
            .store
            .get(tenant_id, period)
            .await?
            .unwrap_or_else(|| FinancialPeriod::unreferenced(tenant_id, period)))
    }
}

fn parse_period(year: i32, month: u32) -> Result<YearMonth, PeriodError> {
    YearMonth::new(year, month).ok_or(PeriodError::InvalidPeriod { year, month })
}
