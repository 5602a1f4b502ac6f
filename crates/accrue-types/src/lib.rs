//! # accrue-types
//!
//! Shared domain types used across the Accrue workspace: the fixed-point
//! [`dec::Dec`], multi-denomination [`coins::Coins`], reward parameters,
//! claims, messages, events and genesis state.
//!
//! ## Modules
//!
//! - [`dec`] — 18-digit fixed-point decimal
//! - [`coins`] — Coin and sorted multi-denomination amounts
//! - [`params`] — Reward periods, multiplier schedules and engine params
//! - [`claim`] — Reward indexes and per-category claims
//! - [`msgs`] — Claim messages consumed by the engine
//! - [`events`] — Events emitted by the engine
//! - [`genesis`] — Genesis import/export state

pub mod claim;
pub mod coins;
pub mod dec;
pub mod events;
pub mod genesis;
pub mod msgs;
pub mod params;

/// Account address. Compared and stored as raw UTF-8 bytes.
pub type AccountId = String;

/// Reward category name, e.g. `"hard-supply"`.
pub type Category = String;

/// Sub-denomination within a category, e.g. `"bnb"`.
pub type SubDenom = String;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Maximum length of an account, category, sub-denom or denom identifier.
pub const MAX_ID_LEN: usize = 128;

/// Error types for domain type validation and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Subtraction would produce a negative value.
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Malformed decimal string.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Malformed coin amounts.
    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    /// Parameter validation failed.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Message failed stateless validation.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Genesis state failed validation.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),
}

/// Convenience result type for domain types.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Check an identifier is non-empty, bounded and free of whitespace.
pub fn validate_id(kind: &str, id: &str) -> std::result::Result<(), String> {
    if id.is_empty() {
        return Err(format!("{kind} must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(format!("{kind} exceeds {MAX_ID_LEN} bytes"));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(format!("{kind} '{id}' contains whitespace"));
    }
    Ok(())
}
