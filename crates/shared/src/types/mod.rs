//! Common types used across the application.

pub mod id;
pub mod money;
pub mod period;

pub use id::*;
pub use money::{
    MONEY_SCALE, fits_money_scale, max_money_amount, round_money, rounding_unit, truncate_money,
};
pub use period::YearMonth;
