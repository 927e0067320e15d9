//! Core business logic for Fixedledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the traits in [`store`].
//!
//! # Modules
//!
//! - `depreciation` - Schedules and incremental depreciation calculation
//! - `period` - Financial period locking
//! - `posting` - Atomic, idempotent depreciation posting
//! - `store` - Persistence contracts

pub mod depreciation;
pub mod period;
pub mod posting;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod memory;
