//! Repository implementations of the core store traits.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod asset;
pub mod period;
pub mod posting;

pub use asset::AssetRepository;
pub use period::PeriodRepository;
pub use posting::{PgPostingTransaction, PostingRepository};
