//! Reward factor ledger.
//!
//! Each `(category, sub_denom)` pair owns one monotonically non-decreasing
//! factor per reward denom it pays: the cumulative reward paid per unit of
//! weight. Advancing the factors distributes the emission of the elapsed
//! window over the weight eligible at that moment.
//!
//! ## Formula
//!
//! ```text
//! emitted[denom]  = sum(period.rewards_per_second[denom] * overlap(period, [previous, now]))
//! factor[denom]  += emitted[denom] / total_weight
//! ```
//!
//! A window with zero total weight forfeits its emission: the accrual time
//! still moves to `now`, so the emission is never paid out later.

use accrue_db::queries::{accrual_times, factors};
use accrue_types::claim::RewardIndexes;
use accrue_types::coins::Coins;
use accrue_types::dec::Dec;
use accrue_types::events::Event;
use accrue_types::params::Params;
use accrue_types::{Timestamp, TypesError};
use rusqlite::Connection;

use crate::expected::{BankKeeper, ParticipationOracle};
use crate::{Keeper, KeeperError, Result};

/// Outcome of advancing the factors of one pair over a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// `emitted` was spread over the eligible weight.
    Accrued { factor: RewardIndexes, emitted: Coins },
    /// `emitted` had no eligible weight behind it and was dropped.
    Forfeited { factor: RewardIndexes, emitted: Coins },
}

impl Advance {
    /// Factors after the advance.
    pub fn factor(&self) -> &RewardIndexes {
        match self {
            Advance::Accrued { factor, .. } | Advance::Forfeited { factor, .. } => factor,
        }
    }
}

/// Compute the advance of one pair's factors over `[previous, now]` without
/// touching the store.
///
/// # Errors
///
/// - [`KeeperError::RewardPeriodNotFound`] if no period of the pair touches the window
/// - [`KeeperError::Types`] on arithmetic overflow
pub fn compute_advance(
    params: &Params,
    category: &str,
    sub_denom: &str,
    stored: &RewardIndexes,
    previous: Timestamp,
    now: Timestamp,
    total_weight: u128,
) -> Result<Advance> {
    let mut touched = false;
    let mut emitted = Coins::new();
    for period in params.periods_for(category, sub_denom) {
        if !period.touches(previous, now) {
            continue;
        }
        touched = true;
        let seconds = u128::from(period.overlap(previous, now));
        for (denom, rate) in period.rewards_per_second.iter() {
            let amount = rate.checked_mul(seconds).ok_or(TypesError::Overflow)?;
            emitted.add_amount(denom, amount)?;
        }
    }

    if !touched {
        return Err(KeeperError::RewardPeriodNotFound {
            category: category.to_string(),
            sub_denom: sub_denom.to_string(),
            at: now,
        });
    }
    if emitted.is_empty() {
        return Ok(Advance::Accrued {
            factor: stored.clone(),
            emitted,
        });
    }
    if total_weight == 0 {
        return Ok(Advance::Forfeited {
            factor: stored.clone(),
            emitted,
        });
    }

    let mut factor = stored.clone();
    for (denom, amount) in emitted.iter() {
        let current = factor.get(denom).unwrap_or(Dec::ZERO);
        factor.set(denom, current.checked_add(Dec::from_ratio(amount, total_weight)?)?);
    }
    Ok(Advance::Accrued { factor, emitted })
}

/// Reject any factor update that would move a denom backwards.
pub fn ensure_non_decreasing(
    category: &str,
    sub_denom: &str,
    stored: &RewardIndexes,
    computed: &RewardIndexes,
) -> Result<()> {
    for (denom, before) in stored.iter() {
        let after = computed.get(denom).unwrap_or(Dec::ZERO);
        if after < before {
            return Err(KeeperError::DecreasingRewardFactor {
                category: category.to_string(),
                sub_denom: sub_denom.to_string(),
                denom: denom.to_string(),
                stored: before,
                computed: after,
            });
        }
    }
    Ok(())
}

impl<O: ParticipationOracle, B: BankKeeper> Keeper<O, B> {
    /// Advance every category to `now`.
    ///
    /// Runs as one transaction: a fatal error in any category rolls back the
    /// whole step.
    pub fn begin_block(&mut self, conn: &mut Connection, now: Timestamp) -> Result<()> {
        let categories: Vec<String> = self
            .params
            .categories()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.atomic(conn, |keeper, tx| {
            for category in &categories {
                keeper.advance_category(tx, category, now)?;
            }
            tracing::debug!(now, categories = categories.len(), "begin block: factors advanced");
            Ok(())
        })
    }

    /// Advance every sub-denom of `category` with a configured period.
    pub(crate) fn advance_category(
        &mut self,
        conn: &Connection,
        category: &str,
        now: Timestamp,
    ) -> Result<()> {
        let sub_denoms: Vec<String> = self
            .params
            .sub_denoms(category)
            .into_iter()
            .map(str::to_string)
            .collect();
        for sub_denom in &sub_denoms {
            self.advance_factor(conn, category, sub_denom, now)?;
        }
        Ok(())
    }

    /// Advance the factors of one pair to `now` and return their new values.
    ///
    /// Idempotent for repeated calls at the same `now`. The first call for a
    /// pair only records the accrual time and zero factors.
    pub(crate) fn advance_factor(
        &mut self,
        conn: &Connection,
        category: &str,
        sub_denom: &str,
        now: Timestamp,
    ) -> Result<RewardIndexes> {
        let stored = self.stored_factor(conn, category, sub_denom)?;
        let Some(previous) = accrual_times::get(conn, category, sub_denom)? else {
            accrual_times::set(conn, category, sub_denom, now)?;
            factors::set(conn, category, sub_denom, &stored)?;
            tracing::debug!(category, sub_denom, now, "accrual time initialized");
            return Ok(stored);
        };
        if now <= previous {
            return Ok(stored);
        }

        let total_weight = self.oracle.total_eligible_weight(category, sub_denom);
        let advance = match compute_advance(
            &self.params,
            category,
            sub_denom,
            &stored,
            previous,
            now,
            total_weight,
        ) {
            Ok(advance) => advance,
            Err(skipped @ KeeperError::RewardPeriodNotFound { .. }) => {
                tracing::debug!(%skipped, "accrual skipped");
                accrual_times::set(conn, category, sub_denom, now)?;
                return Ok(stored);
            }
            Err(e) => return Err(e),
        };

        ensure_non_decreasing(category, sub_denom, &stored, advance.factor())?;

        let factor = match advance {
            Advance::Accrued { factor, emitted } => {
                tracing::trace!(
                    category,
                    sub_denom,
                    previous,
                    now,
                    %emitted,
                    total_weight,
                    "reward factors advanced"
                );
                factor
            }
            Advance::Forfeited { factor, emitted } => {
                tracing::warn!(
                    category,
                    sub_denom,
                    previous,
                    now,
                    %emitted,
                    "no eligible weight: emission forfeited"
                );
                self.emit(Event::EmissionForfeited {
                    category: category.to_string(),
                    sub_denom: sub_denom.to_string(),
                    from: previous,
                    to: now,
                    amount: emitted,
                });
                factor
            }
        };

        factors::set(conn, category, sub_denom, &factor)?;
        accrual_times::set(conn, category, sub_denom, now)?;
        Ok(factor)
    }

    /// Values the factors would have at `now`, without writing anything.
    pub(crate) fn project_factor(
        &self,
        conn: &Connection,
        category: &str,
        sub_denom: &str,
        now: Timestamp,
    ) -> Result<RewardIndexes> {
        let stored = self.stored_factor(conn, category, sub_denom)?;
        let Some(previous) = accrual_times::get(conn, category, sub_denom)? else {
            return Ok(stored);
        };
        if now <= previous {
            return Ok(stored);
        }
        let total_weight = self.oracle.total_eligible_weight(category, sub_denom);
        match compute_advance(
            &self.params,
            category,
            sub_denom,
            &stored,
            previous,
            now,
            total_weight,
        ) {
            Ok(Advance::Accrued { factor, .. } | Advance::Forfeited { factor, .. }) => Ok(factor),
            Err(KeeperError::RewardPeriodNotFound { .. }) => Ok(stored),
            Err(e) => Err(e),
        }
    }

    /// Stored factors of a pair, with every configured reward denom present
    /// (zero when never advanced).
    pub(crate) fn stored_factor(
        &self,
        conn: &Connection,
        category: &str,
        sub_denom: &str,
    ) -> Result<RewardIndexes> {
        let mut factor = factors::get(conn, category, sub_denom)?.unwrap_or_default();
        for denom in self.params.reward_denoms(category, sub_denom) {
            if factor.get(denom).is_none() {
                factor.set(denom, Dec::ZERO);
            }
        }
        Ok(factor)
    }
}
