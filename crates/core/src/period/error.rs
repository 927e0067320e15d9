//! Period locking error types.

use fixedledger_shared::types::YearMonth;
use thiserror::Error;

use super::types::PeriodLockState;
use crate::store::StoreError;

/// Errors raised by the period lock manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Year/month pair is not a calendar month.
    #[error("Invalid financial period: {year}-{month}")]
    InvalidPeriod {
        /// Requested year.
        year: i32,
        /// Requested month.
        month: u32,
    },

    /// The period is already in the requested state.
    #[error("Financial period {period} is already {state}")]
    InvalidTransition {
        /// The period.
        period: YearMonth,
        /// Its current state.
        state: PeriodLockState,
    },

    /// Another caller changed the period between our read and write.
    #[error("Concurrent change to financial period {period}, please retry")]
    Conflict {
        /// The period.
        period: YearMonth,
    },

    /// Storage failure.
    #[error("Period storage error: {0}")]
    Store(#[from] StoreError),
}

impl PeriodError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::InvalidTransition { .. } => "INVALID_PERIOD_TRANSITION",
            Self::Conflict { .. } => "PERIOD_CONFLICT",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidPeriod { .. } => 400,
            Self::InvalidTransition { .. } | Self::Conflict { .. } => 409,
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_status() {
        let period = YearMonth::new(2024, 3).unwrap();

        let err = PeriodError::InvalidTransition {
            period,
            state: PeriodLockState::Locked,
        };
        assert_eq!(err.error_code(), "INVALID_PERIOD_TRANSITION");
        assert_eq!(err.http_status_code(), 409);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Financial period 2024-03 is already LOCKED");

        let err = PeriodError::Conflict { period };
        assert!(err.is_retryable());

        let err = PeriodError::InvalidPeriod { year: 2024, month: 13 };
        assert_eq!(err.http_status_code(), 400);
    }
}
