//! Depreciation posting.
//!
//! The only mutating path for asset depreciation. Each successful post
//! writes one entry, one asset update and one journal entry atomically.

pub mod coordinator;
pub mod error;
pub mod types;


pub use coordinator::PostingCoordinator;
pub use error::PostingError;
pub use types::{
    BatchItem, BatchItemResult, BatchRunReport, DepreciationEntry, JournalRequest,
    JournalSourceType, PostingOutcome, PostingReceipt,
};
