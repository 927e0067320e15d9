//! Posting error types.

use fixedledger_shared::types::{AssetId, TenantId, YearMonth};
use thiserror::Error;

use crate::depreciation::DepreciationError;
use crate::period::PeriodError;
use crate::store::StoreError;

/// Errors raised by the posting coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    // ========== Validation Errors ==========
    /// The asset or requested date is invalid.
    #[error(transparent)]
    Depreciation(#[from] DepreciationError),

    /// Asset not found.
    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    /// Asset number already registered for the tenant.
    #[error("Asset number already exists: {0}")]
    DuplicateAssetNumber(String),

    // ========== Period Errors ==========
    /// A month the posting would touch is locked.
    #[error("Financial period {period} is locked for tenant {tenant_id}")]
    PeriodLocked {
        /// Owning tenant.
        tenant_id: TenantId,
        /// The first locked month found.
        period: YearMonth,
    },

    // ========== Concurrency Errors ==========
    /// Another posting changed the asset concurrently.
    #[error("Concurrent posting conflict: {0}")]
    Conflict(String),

    // ========== Ledger Errors ==========
    /// The ledger refused the journal entry; nothing was committed.
    #[error("Ledger append failed: {0}")]
    LedgerAppend(String),

    // ========== Database Errors ==========
    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(String),
}

impl PostingError {
    /// Maps a store error raised while posting for `tenant_id`.
    #[must_use]
    pub fn from_store(err: StoreError, tenant_id: TenantId) -> Self {
        match err {
            StoreError::PeriodLocked { period } => Self::PeriodLocked { tenant_id, period },
            StoreError::UniqueViolation(msg) | StoreError::TransitionConflict(msg) => {
                Self::Conflict(msg)
            }
            StoreError::VersionMismatch { expected, actual } => Self::Conflict(format!(
                "asset version changed: expected {expected}, found {actual:?}"
            )),
            StoreError::LedgerAppend(msg) => Self::LedgerAppend(msg),
            StoreError::NotFound(msg) | StoreError::Backend(msg) => Self::Store(msg),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Depreciation(err) => err.error_code(),
            Self::AssetNotFound(_) => "ASSET_NOT_FOUND",
            Self::DuplicateAssetNumber(_) => "DUPLICATE_ASSET_NUMBER",
            Self::PeriodLocked { .. } => "PERIOD_LOCKED",
            Self::Conflict(_) => "CONCURRENT_MODIFICATION",
            Self::LedgerAppend(_) => "LEDGER_APPEND_FAILED",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Depreciation(_) => 400,

            // 404 Not Found
            Self::AssetNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateAssetNumber(_) | Self::Conflict(_) => 409,

            // 423 Locked
            Self::PeriodLocked { .. } => 423,

            // 502 Bad Gateway - downstream ledger
            Self::LedgerAppend(_) => 502,

            // 500 Internal Server Error
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::LedgerAppend(_))
    }
}

impl From<PeriodError> for PostingError {
    // Only lock reads reach here, and those fail solely on storage.
    fn from(err: PeriodError) -> Self {
        Self::Store(err.to_string())
    }
}
