//! Threshold lookup and release split.
//!
//! A schedule `[(5s, 0.5), (5s, 1.0)]` has cumulative thresholds `[5, 10]`.
//! A period is *reached* once its threshold is at or below the elapsed time;
//! the fraction of the last reached period applies.
//!
//! ```text
//! elapsed  0..5   -> not vested
//! elapsed  5..10  -> 0.5
//! elapsed  10..   -> 1.0
//! ```

use accrue_types::coins::Coins;
use accrue_types::dec::Dec;
use accrue_types::params::MultiplierSchedule;
use accrue_types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{Result, VestingError};

/// Outcome of applying a schedule to a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Fraction that applied.
    pub fraction: Dec,
    /// Transferable now.
    pub released: Coins,
    /// Sent to the reserve.
    pub forfeited: Coins,
}

/// Fraction released after `elapsed` seconds, or `None` before the first threshold.
///
/// Binary search over the cumulative thresholds: `partition_point` counts the
/// periods whose threshold is `<= elapsed`.
pub fn resolve_fraction(schedule: &MultiplierSchedule, elapsed: u64) -> Option<Dec> {
    let thresholds = schedule.cumulative_thresholds();
    let reached = thresholds.partition_point(|&threshold| threshold <= elapsed);
    reached
        .checked_sub(1)
        .and_then(|i| schedule.periods.get(i))
        .map(|p| p.fraction)
}

/// Split `amount` into released and forfeited parts.
///
/// # Errors
///
/// - [`VestingError::EmptySchedule`] if the schedule has no periods
/// - [`VestingError::NotYetVested`] if no period has elapsed since `eligible_since`
pub fn apply_multiplier(
    amount: &Coins,
    schedule: &MultiplierSchedule,
    eligible_since: Timestamp,
    now: Timestamp,
) -> Result<Release> {
    let first = schedule
        .periods
        .first()
        .ok_or_else(|| VestingError::EmptySchedule(schedule.name.clone()))?;

    let elapsed = now.saturating_sub(eligible_since);
    let fraction = resolve_fraction(schedule, elapsed)
        .filter(|f| !f.is_zero())
        .ok_or(VestingError::NotYetVested {
            elapsed,
            first_release: first.length_secs,
        })?;

    let released = amount.mul_dec_floor(fraction)?;
    let forfeited = amount.checked_sub(&released)?;

    tracing::trace!(
        schedule = %schedule.name,
        elapsed,
        %fraction,
        %released,
        %forfeited,
        "vesting: applied multiplier"
    );

    Ok(Release {
        fraction,
        released,
        forfeited,
    })
}
