//! # accrue-vesting
//!
//! Vesting multiplier resolution.
//!
//! At claim time a [`MultiplierSchedule`](accrue_types::params::MultiplierSchedule)
//! decides what fraction of the claimable balance is released. The rest is
//! forfeited to the reserve. Resolution is a pure function of the schedule,
//! the claim's eligibility start and the current time; callers own every
//! state change.
//!
//! ## Modules
//!
//! - [`multiplier`] — Threshold lookup and release split

pub mod multiplier;

/// Error types for vesting operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VestingError {
    /// No vesting period has fully elapsed yet.
    #[error("claim not yet vested: {elapsed}s elapsed, first release after {first_release}s")]
    NotYetVested {
        /// Seconds since eligibility.
        elapsed: u64,
        /// Seconds until the first period completes.
        first_release: u64,
    },

    /// The schedule has no periods.
    #[error("multiplier schedule '{0}' is empty")]
    EmptySchedule(String),

    /// Arithmetic failure while splitting amounts.
    #[error(transparent)]
    Types(#[from] accrue_types::TypesError),
}

/// Convenience result type for vesting operations.
pub type Result<T> = std::result::Result<T, VestingError>;
