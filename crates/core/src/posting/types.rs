//! Posting records and outcomes.

use chrono::{DateTime, NaiveDate, Utc};
use fixedledger_shared::types::{
    AssetId, DepreciationEntryId, JournalEntryId, TenantId, UserId, YearMonth,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::depreciation::{AssetStatus, FixedAsset};

/// A committed depreciation posting for one asset and one month.
///
/// At most one exists per `(asset_id, period)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationEntry {
    /// Entry ID.
    pub id: DepreciationEntryId,
    /// Depreciated asset.
    pub asset_id: AssetId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Month the posting is attributed to (the target schedule month).
    pub period: YearMonth,
    /// Amount posted.
    pub amount: Decimal,
    /// Journal entry recording the expense.
    pub journal_entry_id: JournalEntryId,
    /// Who posted it.
    pub posted_by: UserId,
    /// When it was posted.
    pub posted_at: DateTime<Utc>,
}

/// Origin of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalSourceType {
    /// Periodic depreciation expense.
    Depreciation,
}

impl JournalSourceType {
    /// Returns the stored string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Depreciation => "DEPRECIATION",
        }
    }
}

/// Journal entry to append to the ledger alongside a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRequest {
    /// Pre-assigned journal entry ID.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Accounting date (the target schedule date).
    pub entry_date: NaiveDate,
    /// Expense amount.
    pub amount: Decimal,
    /// Human-readable description.
    pub memo: String,
    /// Origin of the entry.
    pub source_type: JournalSourceType,
    /// Record that produced the entry.
    pub source_id: DepreciationEntryId,
}

/// Result of a successful post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingReceipt {
    /// The new entry.
    pub entry: DepreciationEntry,
    /// Asset after the update.
    pub asset: FixedAsset,
    /// Months covered by the posting.
    pub months_elapsed: u32,
    /// Every month the posting touched.
    pub periods: Vec<YearMonth>,
}

/// What a call to `post` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PostingOutcome {
    /// A new entry was committed.
    Posted(PostingReceipt),
    /// The target month already had an entry; nothing was written.
    AlreadyPosted(DepreciationEntry),
    /// Nothing was owed as of the requested date.
    NoOp {
        /// Requested date.
        as_of: NaiveDate,
    },
    /// The asset is not depreciable.
    NotApplicable {
        /// Current status of the asset.
        status: AssetStatus,
    },
}

impl PostingOutcome {
    /// Amount newly posted by this call.
    #[must_use]
    pub fn posted_amount(&self) -> Decimal {
        match self {
            Self::Posted(receipt) => receipt.entry.amount,
            _ => Decimal::ZERO,
        }
    }
}

/// Per-asset result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BatchItemResult {
    /// The asset was posted.
    Posted {
        /// Amount posted.
        amount: Decimal,
        /// Target month.
        period: YearMonth,
    },
    /// The target month was already posted.
    AlreadyPosted {
        /// Target month.
        period: YearMonth,
    },
    /// Nothing was owed.
    NoOp,
    /// The asset is not depreciable.
    NotApplicable {
        /// Current status.
        status: AssetStatus,
    },
    /// Posting failed; the asset was left untouched.
    Failed {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },
}

/// One asset's line in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// The asset.
    pub asset_id: AssetId,
    /// Its asset number.
    pub asset_number: String,
    /// What happened.
    #[serde(flatten)]
    pub result: BatchItemResult,
}

/// Summary of a tenant-wide depreciation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRunReport {
    /// Tenant that was run.
    pub tenant_id: TenantId,
    /// Run date.
    pub as_of: NaiveDate,
    /// One item per active asset, in asset number order.
    pub items: Vec<BatchItem>,
    /// Number of assets posted.
    pub posted_count: usize,
    /// Number of assets that failed.
    pub failed_count: usize,
    /// Sum of the amounts posted.
    pub total_posted: Decimal,
}

impl BatchRunReport {
    /// Builds a report, deriving the totals from `items`.
    #[must_use]
    pub fn new(tenant_id: TenantId, as_of: NaiveDate, items: Vec<BatchItem>) -> Self {
        let mut posted_count = 0;
        let mut failed_count = 0;
        let mut total_posted = Decimal::ZERO;
        for item in &items {
            match &item.result {
                BatchItemResult::Posted { amount, .. } => {
                    posted_count += 1;
                    total_posted += *amount;
                }
                BatchItemResult::Failed { .. } => failed_count += 1,
                _ => {}
            }
        }
        Self {
            tenant_id,
            as_of,
            items,
            posted_count,
            failed_count,
            total_posted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(result: BatchItemResult) -> BatchItem {
        BatchItem {
            asset_id: AssetId::new(),
            asset_number: "FA-1".to_string(),
            result,
        }
    }

    #[test]
    fn test_batch_report_totals() {
        let period = YearMonth::new(2024, 4).unwrap();
        let report = BatchRunReport::new(
            TenantId::new(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            vec![
                item(BatchItemResult::Posted {
                    amount: dec!(100.50),
                    period,
                }),
                item(BatchItemResult::Posted {
                    amount: dec!(49.50),
                    period,
                }),
                item(BatchItemResult::AlreadyPosted { period }),
                item(BatchItemResult::Failed {
                    code: "PERIOD_LOCKED".to_string(),
                    message: "locked".to_string(),
                }),
                item(BatchItemResult::NoOp),
            ],
        );

        assert_eq!(report.posted_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.total_posted, dec!(150.00));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = PostingOutcome::NotApplicable {
            status: AssetStatus::Disposed,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "not_applicable");
        assert_eq!(json["status"], "DISPOSED");
        assert_eq!(outcome.posted_amount(), Decimal::ZERO);
    }
}
