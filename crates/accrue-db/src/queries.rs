//! Query functions, one module per table.

pub mod accrual_times;
pub mod claims;
pub mod factors;
pub mod indexes;
