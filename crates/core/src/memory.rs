//! In-memory store implementations.
//!
//! Used by unit tests here and by the API crate's tests. A posting
//! transaction stages its writes and applies them at commit under the store
//! mutex, re-validating every constraint first, so it behaves like a
//! serializable database transaction: a period locked or an entry committed
//! by someone else after a write was staged still fails the commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use fixedledger_shared::types::{AssetId, JournalEntryId, TenantId, UserId, YearMonth};

use crate::depreciation::{AssetStatus, FixedAsset};
use crate::period::{FinancialPeriod, PeriodLockState, PeriodTransition};
use crate::posting::{DepreciationEntry, JournalRequest};
use crate::store::{
    AssetPatch, AssetStore, PeriodStore, PostingStore, PostingTransaction, StoreError,
};

#[derive(Debug, Default)]
struct State {
    assets: HashMap<AssetId, FixedAsset>,
    entries: BTreeMap<(AssetId, YearMonth), DepreciationEntry>,
    journal: Vec<JournalRequest>,
    periods: HashMap<(TenantId, YearMonth), FinancialPeriod>,
    transitions: Vec<PeriodTransition>,
    failing_ledger_appends: u32,
}

impl State {
    fn is_locked(&self, tenant_id: TenantId, period: YearMonth) -> bool {
        self.periods
            .get(&(tenant_id, period))
            .is_some_and(FinancialPeriod::is_locked)
    }
}

/// Shared in-memory store implementing every store trait.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        lock_state(&self.state)
    }

    /// Inserts or replaces an asset as-is.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the store mutex is poisoned.
    pub fn put_asset(&self, asset: FixedAsset) -> Result<(), StoreError> {
        self.state()?.assets.insert(asset.id, asset);
        Ok(())
    }

    /// Returns the stored asset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the store mutex is poisoned.
    pub fn asset(&self, asset_id: AssetId) -> Result<Option<FixedAsset>, StoreError> {
        Ok(self.state()?.assets.get(&asset_id).cloned())
    }

    /// Returns every journal entry appended so far.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the store mutex is poisoned.
    pub fn journal(&self) -> Result<Vec<JournalRequest>, StoreError> {
        Ok(self.state()?.journal.clone())
    }

    /// Makes the next `count` ledger appends fail.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backend` if the store mutex is poisoned.
    pub fn fail_ledger_appends(&self, count: u32) -> Result<(), StoreError> {
        self.state()?.failing_ledger_appends = count;
        Ok(())
    }
}

fn lock_state(state: &Mutex<State>) -> Result<MutexGuard<'_, State>, StoreError> {
    state
        .lock()
        .map_err(|_| StoreError::Backend("memory store mutex poisoned".to_string()))
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn load(&self, asset_id: AssetId) -> Result<Option<FixedAsset>, StoreError> {
        self.asset(asset_id)
    }

    async fn create(&self, asset: FixedAsset) -> Result<FixedAsset, StoreError> {
        let mut state = self.state()?;
        let duplicate = state
            .assets
            .values()
            .any(|a| a.tenant_id == asset.tenant_id && a.asset_number == asset.asset_number);
        if duplicate {
            return Err(StoreError::UniqueViolation(format!(
                "asset number {} already exists",
                asset.asset_number
            )));
        }
        state.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn list_active(&self, tenant_id: TenantId) -> Result<Vec<FixedAsset>, StoreError> {
        let state = self.state()?;
        let mut assets: Vec<_> = state
            .assets
            .values()
            .filter(|a| a.tenant_id == tenant_id && a.status == AssetStatus::Active)
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.asset_number.cmp(&b.asset_number));
        Ok(assets)
    }
}

#[async_trait]
impl PeriodStore for MemoryStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<Option<FinancialPeriod>, StoreError> {
        Ok(self.state()?.periods.get(&(tenant_id, period)).cloned())
    }

    async fn atomic_transition(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
        from: PeriodLockState,
        to: PeriodLockState,
        actor: UserId,
    ) -> Result<FinancialPeriod, StoreError> {
        let mut state = self.state()?;
        let current = state
            .periods
            .get(&(tenant_id, period))
            .cloned()
            .unwrap_or_else(|| FinancialPeriod::unreferenced(tenant_id, period));

        if current.state != from {
            return Err(StoreError::TransitionConflict(format!(
                "period {period} is {}, expected {from}",
                current.state
            )));
        }

        let now = Utc::now();
        let updated = FinancialPeriod {
            state: to,
            locked_at: if to.is_locked() { Some(now) } else { current.locked_at },
            locked_by: if to.is_locked() { Some(actor) } else { current.locked_by },
            version: current.version + 1,
            ..current
        };
        state.periods.insert((tenant_id, period), updated.clone());
        state.transitions.push(PeriodTransition {
            tenant_id,
            period,
            from_state: from,
            to_state: to,
            actor,
            occurred_at: now,
        });
        Ok(updated)
    }

    async fn history(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<Vec<PeriodTransition>, StoreError> {
        Ok(self
            .state()?
            .transitions
            .iter()
            .filter(|t| t.tenant_id == tenant_id && t.period == period)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn PostingTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            guarded_periods: Vec::new(),
            entries: Vec::new(),
            asset_updates: Vec::new(),
            journal: Vec::new(),
        }))
    }

    async fn find_entry(
        &self,
        asset_id: AssetId,
        period: YearMonth,
    ) -> Result<Option<DepreciationEntry>, StoreError> {
        Ok(self.state()?.entries.get(&(asset_id, period)).cloned())
    }

    async fn list_entries(&self, asset_id: AssetId) -> Result<Vec<DepreciationEntry>, StoreError> {
        Ok(self
            .state()?
            .entries
            .values()
            .filter(|e| e.asset_id == asset_id)
            .cloned()
            .collect())
    }
}

/// Staged posting writes, applied at commit.
struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    guarded_periods: Vec<(TenantId, YearMonth)>,
    entries: Vec<DepreciationEntry>,
    asset_updates: Vec<(i64, FixedAsset)>,
    journal: Vec<JournalRequest>,
}

impl MemoryTransaction {
    fn validate(&self, state: &State) -> Result<(), StoreError> {
        if let Some((_, period)) = self
            .guarded_periods
            .iter()
            .find(|(tenant, period)| state.is_locked(*tenant, *period))
        {
            return Err(StoreError::PeriodLocked { period: *period });
        }
        for entry in &self.entries {
            if state.entries.contains_key(&(entry.asset_id, entry.period)) {
                return Err(unique_entry_violation(entry));
            }
        }
        for (expected, updated) in &self.asset_updates {
            let actual = state.assets.get(&updated.id).map(|a| a.version);
            if actual != Some(*expected) {
                return Err(StoreError::VersionMismatch {
                    expected: *expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

fn unique_entry_violation(entry: &DepreciationEntry) -> StoreError {
    StoreError::UniqueViolation(format!(
        "depreciation entry for asset {} in {} already exists",
        entry.asset_id, entry.period
    ))
}

#[async_trait]
impl PostingTransaction for MemoryTransaction {
    async fn ensure_periods_unlocked(
        &mut self,
        tenant_id: TenantId,
        periods: &[YearMonth],
    ) -> Result<(), StoreError> {
        let state = lock_state(&self.state)?;
        if let Some(period) = periods.iter().find(|p| state.is_locked(tenant_id, **p)) {
            return Err(StoreError::PeriodLocked { period: *period });
        }
        drop(state);
        self.guarded_periods
            .extend(periods.iter().map(|p| (tenant_id, *p)));
        Ok(())
    }

    async fn insert_entry(&mut self, entry: &DepreciationEntry) -> Result<(), StoreError> {
        let exists = lock_state(&self.state)?
            .entries
            .contains_key(&(entry.asset_id, entry.period));
        let staged = self
            .entries
            .iter()
            .any(|e| e.asset_id == entry.asset_id && e.period == entry.period);
        if exists || staged {
            return Err(unique_entry_violation(entry));
        }
        self.entries.push(entry.clone());
        Ok(())
    }

    async fn compare_and_update_asset(
        &mut self,
        asset_id: AssetId,
        expected_version: i64,
        patch: &AssetPatch,
    ) -> Result<FixedAsset, StoreError> {
        let current = lock_state(&self.state)?
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("asset {asset_id}")))?;
        if current.version != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                actual: Some(current.version),
            });
        }
        let updated = patch.apply(&current);
        self.asset_updates.push((expected_version, updated.clone()));
        Ok(updated)
    }

    async fn append_journal(
        &mut self,
        request: &JournalRequest,
    ) -> Result<JournalEntryId, StoreError> {
        {
            let mut state = lock_state(&self.state)?;
            if state.failing_ledger_appends > 0 {
                state.failing_ledger_appends -= 1;
                return Err(StoreError::LedgerAppend(
                    "ledger rejected the journal entry".to_string(),
                ));
            }
        }
        self.journal.push(request.clone());
        Ok(request.id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut state = lock_state(&this.state)?;
        this.validate(&state)?;

        for entry in this.entries {
            state.entries.insert((entry.asset_id, entry.period), entry);
        }
        for (_, asset) in this.asset_updates {
            state.assets.insert(asset.id, asset);
        }
        state.journal.extend(this.journal);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depreciation::DepreciationMethod;
    use chrono::NaiveDate;
    use fixedledger_shared::types::DepreciationEntryId;
    use rust_decimal_macros::dec;

    fn asset(tenant_id: TenantId, number: &str) -> FixedAsset {
        FixedAsset {
            id: AssetId::new(),
            tenant_id,
            asset_number: number.to_string(),
            name: "Forklift".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            purchase_cost: dec!(1200),
            salvage_value: dec!(0),
            useful_life_months: 12,
            depreciation_method: DepreciationMethod::StraightLine,
            accumulated_depreciation: dec!(0),
            last_depreciation_date: None,
            status: AssetStatus::Active,
            version: 0,
        }
    }

    fn entry(asset: &FixedAsset, period: YearMonth) -> DepreciationEntry {
        DepreciationEntry {
            id: DepreciationEntryId::new(),
            asset_id: asset.id,
            tenant_id: asset.tenant_id,
            period,
            amount: dec!(100),
            journal_entry_id: JournalEntryId::new(),
            posted_by: UserId::new(),
            posted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_number_per_tenant() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        store.create(asset(tenant, "FA-1")).await.unwrap();

        let err = store.create(asset(tenant, "FA-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));

        store.create(asset(TenantId::new(), "FA-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        let fa = asset(TenantId::new(), "FA-1");
        store.put_asset(fa.clone()).unwrap();
        let period = YearMonth::new(2024, 2).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_entry(&entry(&fa, period)).await.unwrap();
        assert!(store.find_entry(fa.id, period).await.unwrap().is_none());

        tx.rollback().await.unwrap();
        assert!(store.find_entry(fa.id, period).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_revalidates_entry_uniqueness() {
        let store = MemoryStore::new();
        let fa = asset(TenantId::new(), "FA-1");
        store.put_asset(fa.clone()).unwrap();
        let period = YearMonth::new(2024, 2).unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_entry(&entry(&fa, period)).await.unwrap();
        second.insert_entry(&entry(&fa, period)).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_commit_revalidates_period_locks() {
        let store = MemoryStore::new();
        let fa = asset(TenantId::new(), "FA-1");
        let period = YearMonth::new(2024, 2).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.ensure_periods_unlocked(fa.tenant_id, &[period]).await.unwrap();
        store
            .atomic_transition(
                fa.tenant_id,
                period,
                PeriodLockState::Unlocked,
                PeriodLockState::Locked,
                UserId::new(),
            )
            .await
            .unwrap();

        let err = tx.commit().await.unwrap_err();
        assert_eq!(err, StoreError::PeriodLocked { period });
    }

    #[tokio::test]
    async fn test_transition_requires_expected_state() {
        let store = MemoryStore::new();
        let tenant = TenantId::new();
        let period = YearMonth::new(2024, 5).unwrap();

        let err = store
            .atomic_transition(
                tenant,
                period,
                PeriodLockState::Locked,
                PeriodLockState::Unlocked,
                UserId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TransitionConflict(_)));
        assert!(store.history(tenant, period).await.unwrap().is_empty());
    }
}
