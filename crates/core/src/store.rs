//! Persistence contracts consumed by the core services.
//!
//! The core never talks to a database directly. Uniqueness of depreciation
//! entries, optimistic asset versions and period compare-and-set are all
//! enforced by the implementations of these traits, inside the store.

use async_trait::async_trait;
use chrono::NaiveDate;
use fixedledger_shared::types::{AssetId, JournalEntryId, TenantId, UserId, YearMonth};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::depreciation::{AssetStatus, FixedAsset};
use crate::period::{FinancialPeriod, PeriodLockState, PeriodTransition};
use crate::posting::{DepreciationEntry, JournalRequest};

/// Errors reported by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique key is already taken.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The row changed since it was read.
    #[error("Version mismatch: expected {expected}, found {actual:?}")]
    VersionMismatch {
        /// Version the caller read.
        expected: i64,
        /// Version currently stored, if known.
        actual: Option<i64>,
    },

    /// A compare-and-set transition found a different current state.
    #[error("Transition conflict: {0}")]
    TransitionConflict(String),

    /// A touched financial period is locked.
    #[error("Financial period {period} is locked")]
    PeriodLocked {
        /// The locked month.
        period: YearMonth,
    },

    /// The ledger refused the journal entry.
    #[error("Ledger append failed: {0}")]
    LedgerAppend(String),

    /// Any other storage failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Fields a posting writes back to the asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPatch {
    /// New accumulated depreciation.
    pub accumulated_depreciation: Decimal,
    /// Schedule date of the last posted period.
    pub last_depreciation_date: NaiveDate,
    /// New lifecycle status.
    pub status: AssetStatus,
}

impl AssetPatch {
    /// Applies the patch to an asset snapshot, bumping its version.
    #[must_use]
    pub fn apply(&self, asset: &FixedAsset) -> FixedAsset {
        FixedAsset {
            accumulated_depreciation: self.accumulated_depreciation,
            last_depreciation_date: Some(self.last_depreciation_date),
            status: self.status,
            version: asset.version + 1,
            ..asset.clone()
        }
    }
}

/// Fixed asset persistence.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Loads an asset by ID.
    async fn load(&self, asset_id: AssetId) -> Result<Option<FixedAsset>, StoreError>;

    /// Stores a newly registered asset. A duplicate asset number within the
    /// tenant is a `UniqueViolation`.
    async fn create(&self, asset: FixedAsset) -> Result<FixedAsset, StoreError>;

    /// Lists a tenant's active assets ordered by asset number.
    async fn list_active(&self, tenant_id: TenantId) -> Result<Vec<FixedAsset>, StoreError>;
}

/// Financial period lock state and its audit log.
#[async_trait]
pub trait PeriodStore: Send + Sync {
    /// Reads the latest committed state of a period, `None` if never referenced.
    async fn get(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<Option<FinancialPeriod>, StoreError>;

    /// Moves a period from `from` to `to` if and only if it is currently in
    /// `from`, appending an audit record in the same unit of work. A missing
    /// period record counts as unlocked. Any other current state is a
    /// `TransitionConflict`.
    async fn atomic_transition(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
        from: PeriodLockState,
        to: PeriodLockState,
        actor: UserId,
    ) -> Result<FinancialPeriod, StoreError>;

    /// Lists the transitions of a period, oldest first.
    async fn history(
        &self,
        tenant_id: TenantId,
        period: YearMonth,
    ) -> Result<Vec<PeriodTransition>, StoreError>;
}

/// Depreciation entry persistence and the posting unit of work.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Starts a unit of work spanning the entry, asset and ledger writes.
    async fn begin(&self) -> Result<Box<dyn PostingTransaction>, StoreError>;

    /// Finds the entry posted for an asset in a month.
    async fn find_entry(
        &self,
        asset_id: AssetId,
        period: YearMonth,
    ) -> Result<Option<DepreciationEntry>, StoreError>;

    /// Lists an asset's entries ordered by period.
    async fn list_entries(&self, asset_id: AssetId) -> Result<Vec<DepreciationEntry>, StoreError>;
}

/// One atomic posting. Nothing written through it is visible to other
/// callers until `commit` succeeds; dropping or rolling back discards it.
#[async_trait]
pub trait PostingTransaction: Send {
    /// Verifies, against the authoritative period rows and holding them
    /// until the unit of work ends, that none of `periods` is locked.
    async fn ensure_periods_unlocked(
        &mut self,
        tenant_id: TenantId,
        periods: &[YearMonth],
    ) -> Result<(), StoreError>;

    /// Inserts an entry; a second entry for the same asset and month is a
    /// `UniqueViolation`.
    async fn insert_entry(&mut self, entry: &DepreciationEntry) -> Result<(), StoreError>;

    /// Applies `patch` if the stored version still equals `expected_version`.
    async fn compare_and_update_asset(
        &mut self,
        asset_id: AssetId,
        expected_version: i64,
        patch: &AssetPatch,
    ) -> Result<FixedAsset, StoreError>;

    /// Appends the journal entry to the ledger.
    async fn append_journal(&mut self, request: &JournalRequest)
    -> Result<JournalEntryId, StoreError>;

    /// Commits every write as one unit. On failure nothing is applied.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every write.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
