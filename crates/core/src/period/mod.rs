//! Financial period locking.
//!
//! A locked period accepts no depreciation postings. The lock state lives in
//! the store and is read fresh on every check.

pub mod error;
pub mod lock;
pub mod types;

pub use error::PeriodError;
pub use lock::PeriodLockManager;
pub use types::{FinancialPeriod, PeriodLockState, PeriodStatus, PeriodTransition};
