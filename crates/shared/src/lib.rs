//! Shared types, errors, and configuration for Fixedledger.
//!
//! This crate provides common types used across all other crates:
//! - Money rounding with one fixed decimal precision
//! - Typed IDs for type-safe entity references
//! - Calendar month keys for financial periods
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::AppError;
