//! Reward periods, multiplier schedules and engine parameters.
//!
//! Parameters are configuration: the engine reads them but never writes
//! them. A [`RewardPeriod`] says how fast the factors of one
//! `(category, sub_denom)` pair grow between `start` and `end`, for each
//! reward denom it pays. A [`MultiplierSchedule`] says what
//! fraction of a claim is released after a given time since eligibility.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::coins::Coins;
use crate::dec::Dec;
use crate::{validate_id, AccountId, Category, Result, SubDenom, Timestamp, TypesError};

/// Emission for a `(category, sub_denom)` pair, in one or more reward denoms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPeriod {
    pub category: Category,
    pub sub_denom: SubDenom,
    /// Inclusive start of emission.
    pub start: Timestamp,
    /// End of emission. Nothing accrues past this instant.
    pub end: Timestamp,
    pub rewards_per_second: Coins,
}

impl RewardPeriod {
    /// Seconds of this period falling inside `[from, to]`.
    pub fn overlap(&self, from: Timestamp, to: Timestamp) -> u64 {
        let lo = from.max(self.start);
        let hi = to.min(self.end);
        hi.saturating_sub(lo)
    }

    /// Whether `[from, to]` touches this period at all.
    pub fn touches(&self, from: Timestamp, to: Timestamp) -> bool {
        from <= self.end && to >= self.start
    }

    /// Stateless validation.
    pub fn validate(&self) -> Result<()> {
        validate_id("category", &self.category).map_err(TypesError::InvalidParams)?;
        validate_id("sub_denom", &self.sub_denom).map_err(TypesError::InvalidParams)?;
        if self.rewards_per_second.is_empty() {
            return Err(TypesError::InvalidParams(format!(
                "reward period {}/{} pays nothing",
                self.category, self.sub_denom
            )));
        }
        for (denom, _) in self.rewards_per_second.iter() {
            validate_id("reward denom", denom).map_err(TypesError::InvalidParams)?;
        }
        if self.end <= self.start {
            return Err(TypesError::InvalidParams(format!(
                "reward period {}/{} ends ({}) before it starts ({})",
                self.category, self.sub_denom, self.end, self.start
            )));
        }
        Ok(())
    }
}

/// One step of a vesting schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingPeriod {
    /// Length of this step in seconds.
    pub length_secs: u64,
    /// Fraction of the claim released once this step has fully elapsed.
    pub fraction: Dec,
}

/// Named vesting schedule applied at claim time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierSchedule {
    pub name: String,
    pub periods: Vec<VestingPeriod>,
    /// A partial schedule may end below a full release.
    #[serde(default)]
    pub partial: bool,
}

impl MultiplierSchedule {
    /// Total schedule length in seconds.
    pub fn total_length(&self) -> u64 {
        self.periods
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.length_secs))
    }

    /// Cumulative end offsets of each period, measured from eligibility.
    pub fn cumulative_thresholds(&self) -> Vec<u64> {
        self.periods
            .iter()
            .scan(0u64, |acc, p| {
                *acc = acc.saturating_add(p.length_secs);
                Some(*acc)
            })
            .collect()
    }

    /// Stateless validation.
    pub fn validate(&self) -> Result<()> {
        validate_id("multiplier name", &self.name).map_err(TypesError::InvalidParams)?;
        let last = self.periods.last().ok_or_else(|| {
            TypesError::InvalidParams(format!("multiplier '{}' has no periods", self.name))
        })?;

        let mut previous = Dec::ZERO;
        for period in &self.periods {
            if period.fraction > Dec::ONE {
                return Err(TypesError::InvalidParams(format!(
                    "multiplier '{}' fraction {} exceeds 1",
                    self.name, period.fraction
                )));
            }
            if period.fraction < previous {
                return Err(TypesError::InvalidParams(format!(
                    "multiplier '{}' fractions must be non-decreasing",
                    self.name
                )));
            }
            previous = period.fraction;
        }

        if !self.partial && last.fraction != Dec::ONE {
            return Err(TypesError::InvalidParams(format!(
                "multiplier '{}' must end at a full release unless marked partial",
                self.name
            )));
        }
        Ok(())
    }
}

/// Engine parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub reward_periods: Vec<RewardPeriod>,
    #[serde(default)]
    pub multipliers: Vec<MultiplierSchedule>,
    /// Claims submitted after this instant are rejected.
    pub claim_end: Timestamp,
    /// Account that funds released rewards.
    pub payout_account: AccountId,
    /// Account receiving forfeited rewards.
    pub reserve_account: AccountId,
}

impl Params {
    /// Every category with at least one reward period, sorted.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.reward_periods
            .iter()
            .map(|p| p.category.as_str())
            .collect()
    }

    /// Every sub-denom of `category` with at least one reward period, sorted.
    pub fn sub_denoms(&self, category: &str) -> BTreeSet<&str> {
        self.reward_periods
            .iter()
            .filter(|p| p.category == category)
            .map(|p| p.sub_denom.as_str())
            .collect()
    }

    /// Reward periods of one `(category, sub_denom)` pair.
    pub fn periods_for<'a: 'b, 'b>(
        &'a self,
        category: &'b str,
        sub_denom: &'b str,
    ) -> impl Iterator<Item = &'a RewardPeriod> + 'b {
        self.reward_periods
            .iter()
            .filter(move |p| p.category == category && p.sub_denom == sub_denom)
    }

    /// Every reward denom paid for `(category, sub_denom)`, sorted.
    pub fn reward_denoms(&self, category: &str, sub_denom: &str) -> BTreeSet<&str> {
        self.periods_for(category, sub_denom)
            .flat_map(|p| p.rewards_per_second.iter().map(|(denom, _)| denom))
            .collect()
    }

    /// Look up a multiplier schedule by name.
    pub fn multiplier(&self, name: &str) -> Option<&MultiplierSchedule> {
        self.multipliers.iter().find(|m| m.name == name)
    }

    /// Validate periods, schedules and accounts.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidParams`] if any period or schedule is malformed,
    ///   two periods of the same pair pay the same denom over overlapping
    ///   windows, or two schedules share a name
    pub fn validate(&self) -> Result<()> {
        validate_id("payout account", &self.payout_account).map_err(TypesError::InvalidParams)?;
        validate_id("reserve account", &self.reserve_account)
            .map_err(TypesError::InvalidParams)?;

        for period in &self.reward_periods {
            period.validate()?;
        }

        for category in self.categories() {
            for sub_denom in self.sub_denoms(category) {
                for denom in self.reward_denoms(category, sub_denom) {
                    let mut windows: Vec<(Timestamp, Timestamp)> = self
                        .periods_for(category, sub_denom)
                        .filter(|p| p.rewards_per_second.amount_of(denom) > 0)
                        .map(|p| (p.start, p.end))
                        .collect();
                    windows.sort_unstable();
                    if windows.windows(2).any(|pair| pair[1].0 < pair[0].1) {
                        return Err(TypesError::InvalidParams(format!(
                            "reward periods for {category}/{sub_denom} overlap in {denom}"
                        )));
                    }
                }
            }
        }

        let mut names = BTreeSet::new();
        for schedule in &self.multipliers {
            schedule.validate()?;
            if !names.insert(schedule.name.as_str()) {
                return Err(TypesError::InvalidParams(format!(
                    "duplicate multiplier '{}'",
                    schedule.name
                )));
            }
        }
        Ok(())
    }
}
