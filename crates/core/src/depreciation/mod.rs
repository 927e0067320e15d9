//! Fixed-asset depreciation.
//!
//! This module implements the pure depreciation engine:
//! - Asset and schedule types
//! - Schedule generation for every supported method
//! - Incremental calculation of the amount owed as of a date
//! - Error types for invalid asset terms and dates

pub mod calculator;
pub mod error;
pub mod schedule;
pub mod types;


pub use calculator::{DepreciationCalculator, whole_months_between};
pub use error::DepreciationError;
pub use schedule::{MAX_USEFUL_LIFE_MONTHS, ScheduleGenerator, period_date};
pub use types::{
    AssetStatus, CalculationOutcome, DepreciationCalculation, DepreciationMethod, FixedAsset,
    NewFixedAsset, ScheduleLine,
};
