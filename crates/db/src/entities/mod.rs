//! `SeaORM` entity definitions.

pub mod depreciation_entries;
pub mod financial_periods;
pub mod fixed_assets;
pub mod journal_entries;
pub mod period_lock_events;
