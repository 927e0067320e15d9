//! Posting coordinator.
//!
//! Turns a depreciation calculation into a committed entry, an updated asset
//! and a journal entry, all in one store transaction. The sequence is:
//!
//! 1. Load the asset and calculate what it owes as of the requested date.
//! 2. If the target month already has an entry, return it unchanged.
//! 3. Reject the request if any touched month is locked.
//! 4. Return a no-op if nothing is owed.
//! 5. In one transaction: re-check the locks against the authoritative
//!    period rows, insert the entry, compare-and-update the asset, append the
//!    journal entry, commit.
//!
//! Step 5 is what makes the result correct under concurrency. Steps 2 and 3
//! only give a cheap, precise answer in the common case.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use fixedledger_shared::types::{
    AssetId, DepreciationEntryId, JournalEntryId, TenantId, UserId, YearMonth,
};
use tracing::{debug, info, instrument, warn};

use super::error::PostingError;
use super::types::{
    BatchItem, BatchItemResult, BatchRunReport, DepreciationEntry, JournalRequest,
    JournalSourceType, PostingOutcome, PostingReceipt,
};
use crate::depreciation::{
    AssetStatus, CalculationOutcome, DepreciationCalculation, DepreciationCalculator, FixedAsset,
    NewFixedAsset, ScheduleGenerator, ScheduleLine,
};
use crate::period::PeriodLockManager;
use crate::store::{AssetPatch, AssetStore, PostingStore, PostingTransaction, StoreError};

/// Posts depreciation for assets.
#[derive(Clone)]
pub struct PostingCoordinator {
    assets: Arc<dyn AssetStore>,
    postings: Arc<dyn PostingStore>,
    locks: PeriodLockManager,
}

impl std::fmt::Debug for PostingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostingCoordinator")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl PostingCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        assets: Arc<dyn AssetStore>,
        postings: Arc<dyn PostingStore>,
        locks: PeriodLockManager,
    ) -> Self {
        Self {
            assets,
            postings,
            locks,
        }
    }

    /// Returns the lock manager used to guard postings.
    #[must_use]
    pub fn locks(&self) -> &PeriodLockManager {
        &self.locks
    }

    /// Registers a new asset.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::Depreciation` for invalid terms, or
    /// `PostingError::DuplicateAssetNumber` if the tenant already has an
    /// asset with that number.
    #[instrument(skip_all, fields(tenant_id = %input.tenant_id, asset_number = %input.asset_number))]
    pub async fn register_asset(&self, input: NewFixedAsset) -> Result<FixedAsset, PostingError> {
        let tenant_id = input.tenant_id;
        let asset = input.into_asset(AssetId::new())?;
        let number = asset.asset_number.clone();

        match self.assets.create(asset).await {
            Ok(created) => {
                info!(asset_id = %created.id, "Asset registered");
                Ok(created)
            }
            Err(StoreError::UniqueViolation(_)) => Err(PostingError::DuplicateAssetNumber(number)),
            Err(err) => Err(PostingError::from_store(err, tenant_id)),
        }
    }

    /// Projects the full depreciation schedule of an asset.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::AssetNotFound` or a validation error.
    pub async fn schedule(&self, asset_id: AssetId) -> Result<Vec<ScheduleLine>, PostingError> {
        let asset = self.load_asset(asset_id).await?;
        Ok(ScheduleGenerator::generate(&asset)?)
    }

    /// Calculates what an asset owes as of `as_of` without posting anything.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::AssetNotFound` or a validation error.
    pub async fn calculate(
        &self,
        asset_id: AssetId,
        as_of: NaiveDate,
    ) -> Result<CalculationOutcome, PostingError> {
        let asset = self.load_asset(asset_id).await?;
        Ok(DepreciationCalculator::calculate(&asset, as_of)?)
    }

    /// Lists the entries posted for an asset, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::AssetNotFound` or a storage error.
    pub async fn entries(&self, asset_id: AssetId) -> Result<Vec<DepreciationEntry>, PostingError> {
        let asset = self.load_asset(asset_id).await?;
        self.postings
            .list_entries(asset.id)
            .await
            .map_err(|e| PostingError::from_store(e, asset.tenant_id))
    }

    /// Posts the depreciation an asset owes as of `as_of`.
    ///
    /// Posting is idempotent per target month: repeating a call that already
    /// succeeded returns `AlreadyPosted` with the original entry, and of any
    /// number of concurrent calls for the same asset and month exactly one
    /// commits.
    ///
    /// # Errors
    ///
    /// - `AssetNotFound` if the asset does not exist
    /// - `Depreciation` if `as_of` precedes the last posting or the asset is invalid
    /// - `PeriodLocked` if any touched month is locked, checked again at commit
    /// - `Conflict` if a concurrent posting changed the asset
    /// - `LedgerAppend` if the ledger refused the journal entry
    #[instrument(skip(self), fields(tenant_id = tracing::field::Empty))]
    pub async fn post(
        &self,
        asset_id: AssetId,
        as_of: NaiveDate,
        actor: UserId,
    ) -> Result<PostingOutcome, PostingError> {
        let asset = self.load_asset(asset_id).await?;
        tracing::Span::current().record("tenant_id", tracing::field::display(asset.tenant_id));

        let calc = match DepreciationCalculator::calculate(&asset, as_of)? {
            CalculationOutcome::Calculated(calc) => calc,
            CalculationOutcome::NotApplicable { status } => {
                debug!(%status, "Asset is not depreciable");
                return Ok(PostingOutcome::NotApplicable { status });
            }
        };

        if let Some(target) = calc.target_period()
            && let Some(existing) = self.find_entry(&asset, target).await?
        {
            info!(%target, entry_id = %existing.id, "Target period already posted");
            return Ok(PostingOutcome::AlreadyPosted(existing));
        }

        for period in &calc.periods {
            if self.locks.is_period_locked(asset.tenant_id, *period).await? {
                warn!(%period, "Posting rejected: period is locked");
                return Err(PostingError::PeriodLocked {
                    tenant_id: asset.tenant_id,
                    period: *period,
                });
            }
        }

        let Some(target_date) = calc.target_date.filter(|_| !calc.depreciation_amount.is_zero())
        else {
            debug!(months = calc.months_elapsed, "Nothing to post");
            return Ok(PostingOutcome::NoOp { as_of });
        };

        self.commit_posting(&asset, &calc, target_date, actor).await
    }

    /// Posts every active asset of a tenant as of `as_of`.
    ///
    /// Each asset is posted independently; a failure on one asset is
    /// recorded in the report and does not stop the run.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::Store` only if the asset list cannot be read.
    #[instrument(skip(self))]
    pub async fn run_batch(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        actor: UserId,
    ) -> Result<BatchRunReport, PostingError> {
        let assets = self
            .assets
            .list_active(tenant_id)
            .await
            .map_err(|e| PostingError::from_store(e, tenant_id))?;

        let mut items = Vec::with_capacity(assets.len());
        for asset in assets {
            let result = match self.post(asset.id, as_of, actor).await {
                Ok(PostingOutcome::Posted(receipt)) => BatchItemResult::Posted {
                    amount: receipt.entry.amount,
                    period: receipt.entry.period,
                },
                Ok(PostingOutcome::AlreadyPosted(entry)) => BatchItemResult::AlreadyPosted {
                    period: entry.period,
                },
                Ok(PostingOutcome::NoOp { .. }) => BatchItemResult::NoOp,
                Ok(PostingOutcome::NotApplicable { status }) => {
                    BatchItemResult::NotApplicable { status }
                }
                Err(err) => {
                    warn!(asset_id = %asset.id, error = %err, "Batch posting failed for asset");
                    BatchItemResult::Failed {
                        code: err.error_code().to_string(),
                        message: err.to_string(),
                    }
                }
            };
            items.push(BatchItem {
                asset_id: asset.id,
                asset_number: asset.asset_number,
                result,
            });
        }

        let report = BatchRunReport::new(tenant_id, as_of, items);
        info!(
            posted = report.posted_count,
            failed = report.failed_count,
            total = %report.total_posted,
            "Depreciation run complete"
        );
        Ok(report)
    }

    async fn commit_posting(
        &self,
        asset: &FixedAsset,
        calc: &DepreciationCalculation,
        target_date: NaiveDate,
        actor: UserId,
    ) -> Result<PostingOutcome, PostingError> {
        let target = YearMonth::from_date(target_date);
        let entry = DepreciationEntry {
            id: DepreciationEntryId::new(),
            asset_id: asset.id,
            tenant_id: asset.tenant_id,
            period: target,
            amount: calc.depreciation_amount,
            journal_entry_id: JournalEntryId::new(),
            posted_by: actor,
            posted_at: Utc::now(),
        };
        let patch = AssetPatch {
            accumulated_depreciation: calc.new_accumulated_depreciation,
            last_depreciation_date: target_date,
            status: if calc.fully_depreciated {
                AssetStatus::FullyDepreciated
            } else {
                AssetStatus::Active
            },
        };
        let journal = JournalRequest {
            id: entry.journal_entry_id,
            tenant_id: asset.tenant_id,
            entry_date: target_date,
            amount: calc.depreciation_amount,
            memo: format!(
                "Depreciation {} ({}) {} month(s) to {}",
                asset.asset_number, asset.depreciation_method, calc.months_elapsed, target
            ),
            source_type: JournalSourceType::Depreciation,
            source_id: entry.id,
        };

        let mut tx = self
            .postings
            .begin()
            .await
            .map_err(|e| PostingError::from_store(e, asset.tenant_id))?;

        let result = match write_posting(tx.as_mut(), asset, calc, &entry, &patch, &journal).await
        {
            Ok(updated) => tx.commit().await.map(|()| updated),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed after posting error");
                }
                Err(err)
            }
        };

        match result {
            Ok(updated) => {
                info!(
                    entry_id = %entry.id,
                    %target,
                    amount = %entry.amount,
                    months = calc.months_elapsed,
                    status = %updated.status,
                    "Depreciation posted"
                );
                Ok(PostingOutcome::Posted(PostingReceipt {
                    entry,
                    asset: updated,
                    months_elapsed: calc.months_elapsed,
                    periods: calc.periods.clone(),
                }))
            }
            Err(StoreError::UniqueViolation(reason)) => {
                // Lost the race for the target month; the winner's entry is now visible.
                match self.find_entry(asset, target).await? {
                    Some(existing) => {
                        info!(%target, entry_id = %existing.id, "Concurrent posting won the period");
                        Ok(PostingOutcome::AlreadyPosted(existing))
                    }
                    None => Err(PostingError::Conflict(reason)),
                }
            }
            Err(err) => {
                warn!(error = %err, "Posting rolled back");
                Err(PostingError::from_store(err, asset.tenant_id))
            }
        }
    }

    async fn load_asset(&self, asset_id: AssetId) -> Result<FixedAsset, PostingError> {
        self.assets
            .load(asset_id)
            .await
            .map_err(|e| PostingError::Store(e.to_string()))?
            .ok_or(PostingError::AssetNotFound(asset_id))
    }

    async fn find_entry(
        &self,
        asset: &FixedAsset,
        period: YearMonth,
    ) -> Result<Option<DepreciationEntry>, PostingError> {
        self.postings
            .find_entry(asset.id, period)
            .await
            .map_err(|e| PostingError::from_store(e, asset.tenant_id))
    }
}

async fn write_posting(
    tx: &mut dyn PostingTransaction,
    asset: &FixedAsset,
    calc: &DepreciationCalculation,
    entry: &DepreciationEntry,
    patch: &AssetPatch,
    journal: &JournalRequest,
) -> Result<FixedAsset, StoreError> {
    tx.ensure_periods_unlocked(asset.tenant_id, &calc.periods)
        .await?;
    tx.insert_entry(entry).await?;
    let updated = tx
        .compare_and_update_asset(asset.id, asset.version, patch)
        .await?;
    let journal_id = tx.append_journal(journal).await?;
    debug!(%journal_id, "Journal entry appended");
    Ok(updated)
}
