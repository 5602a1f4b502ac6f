//! # accrue-engine
//!
//! Reward accrual and claim synchronization.
//!
//! The [`Keeper`] owns the engine parameters and the two external
//! collaborators (participation oracle and bank). The store is never owned:
//! every operation receives the `rusqlite::Connection` explicitly, and every
//! public mutating operation runs inside one SQLite transaction so it either
//! commits entirely or leaves no writes behind.
//!
//! ## Accumulator pattern
//!
//! ```text
//! factor(t)  += rewards_per_second * elapsed / total_weight   (per block)
//! owed        = (factor(now) - index(account)) * weight(account)
//! index       = factor(now)                                   (per interaction)
//! ```
//!
//! Each line applies per reward denom: a sub-denom paying two denoms keeps
//! two factors, and an account holds one index for each.
//!
//! Only the cumulative factor and a per-account snapshot are stored, so no
//! operation ever scans the participant set except an explicit sweep.
//!
//! ## Modules
//!
//! - [`expected`] — Collaborator traits (oracle, bank)
//! - [`accrual`] — Reward factor ledger
//! - [`sync`] — Index synchronizer and participation hooks
//! - [`claims`] — Claim payout, on-behalf claims and cleanup
//! - [`queries`] — Read-only queries
//! - [`genesis`] — Genesis import/export
//! - [`stub`] — In-memory oracle and bank

pub mod accrual;
pub mod claims;
pub mod expected;
pub mod genesis;
pub mod queries;
pub mod stub;
pub mod sync;

use accrue_db::DbError;
use accrue_types::dec::Dec;
use accrue_types::events::Event;
use accrue_types::params::Params;
use accrue_types::{AccountId, Category, SubDenom, Timestamp, TypesError};
use accrue_vesting::VestingError;
use rusqlite::Connection;

use crate::expected::{BankError, BankKeeper, ParticipationOracle};

/// Error types for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
    /// No claim record for this account and category.
    #[error("no claim found for {owner} in {category}")]
    ClaimNotFound {
        owner: AccountId,
        category: Category,
    },

    /// No vesting period has elapsed yet; retry later.
    #[error("claim not yet vested: {elapsed}s elapsed, first release after {first_release}s")]
    ClaimNotYetVested { elapsed: u64, first_release: u64 },

    /// Nothing to pay out.
    #[error("zero claim amount for {owner} in {category}")]
    ZeroClaimAmount {
        owner: AccountId,
        category: Category,
    },

    /// No emission period covers the requested window.
    #[error("no reward period for {category}/{sub_denom} at {at}")]
    RewardPeriodNotFound {
        category: Category,
        sub_denom: SubDenom,
        at: Timestamp,
    },

    /// A computed factor fell below the stored one.
    #[error(
        "reward factor for {category}/{sub_denom} in {denom} would decrease from {stored} to {computed}"
    )]
    DecreasingRewardFactor {
        category: Category,
        sub_denom: SubDenom,
        denom: String,
        stored: Dec,
        computed: Dec,
    },

    /// An account index is ahead of the global factor.
    #[error(
        "negative reward delta for {owner} in {category}/{sub_denom} ({denom}): index {index} > factor {factor}"
    )]
    NegativeRewardDelta {
        owner: AccountId,
        category: Category,
        sub_denom: SubDenom,
        denom: String,
        index: Dec,
        factor: Dec,
    },

    /// Claims are closed.
    #[error("claim period ended at {claim_end}, now {now}")]
    ClaimExpired { claim_end: Timestamp, now: Timestamp },

    /// Unknown multiplier schedule name.
    #[error("invalid multiplier: {0}")]
    InvalidMultiplier(String),

    /// The balance transfer failed; nothing was paid.
    #[error("transfer failed: {0}")]
    Transfer(#[from] BankError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl KeeperError {
    /// Whether the error is an invariant violation or storage failure that
    /// must halt processing of the current step.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KeeperError::DecreasingRewardFactor { .. }
                | KeeperError::NegativeRewardDelta { .. }
                | KeeperError::Db(_)
        )
    }
}

impl From<VestingError> for KeeperError {
    fn from(err: VestingError) -> Self {
        match err {
            VestingError::NotYetVested {
                elapsed,
                first_release,
            } => KeeperError::ClaimNotYetVested {
                elapsed,
                first_release,
            },
            VestingError::EmptySchedule(name) => KeeperError::InvalidMultiplier(name),
            VestingError::Types(e) => KeeperError::Types(e),
        }
    }
}

impl From<rusqlite::Error> for KeeperError {
    fn from(err: rusqlite::Error) -> Self {
        KeeperError::Db(DbError::Sqlite(err))
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, KeeperError>;

/// The reward engine.
pub struct Keeper<O, B> {
    params: Params,
    oracle: O,
    bank: B,
    events: Vec<Event>,
}

impl<O: ParticipationOracle, B: BankKeeper> Keeper<O, B> {
    /// Create a keeper over validated params.
    ///
    /// # Errors
    ///
    /// - [`KeeperError::Types`] if the params fail validation
    pub fn new(params: Params, oracle: O, bank: B) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            oracle,
            bank,
            events: Vec::new(),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Mutable oracle access, for drivers that apply participation changes.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Events committed so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drain committed events.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Run `op` inside one transaction.
    ///
    /// On error the transaction is dropped (rolled back) and any events the
    /// operation emitted are discarded.
    pub(crate) fn atomic<T>(
        &mut self,
        conn: &mut Connection,
        op: impl FnOnce(&mut Self, &Connection) -> Result<T>,
    ) -> Result<T> {
        let mark = self.events.len();
        let tx = conn.transaction()?;
        let result = op(self, &tx).and_then(|value| {
            tx.commit()?;
            Ok(value)
        });
        if result.is_err() {
            self.events.truncate(mark);
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use accrue_db::queries::factors;
    use accrue_types::coins::{Coin, Coins};
    use accrue_types::dec::Dec;
    use accrue_types::params::{MultiplierSchedule, Params, RewardPeriod, VestingPeriod};

    use crate::stub::{StubBank, StubOracle};
    use crate::Keeper;

    pub const CATEGORY: &str = "hard-supply";
    pub const PAYOUT: &str = "incentive";
    pub const RESERVE: &str = "community";

    pub fn period(sub_denom: &str, start: u64, end: u64, rate: u128) -> RewardPeriod {
        RewardPeriod {
            category: CATEGORY.to_string(),
            sub_denom: sub_denom.to_string(),
            start,
            end,
            rewards_per_second: Coins::from_coin(Coin::new("hard", rate)),
        }
    }

    /// A period paying every `(denom, rate)` in `rates`.
    pub fn multi_period(sub_denom: &str, start: u64, end: u64, rates: &[(&str, u128)]) -> RewardPeriod {
        let mut rewards_per_second = Coins::new();
        for (denom, rate) in rates {
            rewards_per_second.add_amount(denom, *rate).expect("rate");
        }
        RewardPeriod {
            category: CATEGORY.to_string(),
            sub_denom: sub_denom.to_string(),
            start,
            end,
            rewards_per_second,
        }
    }

    /// Stored factor of one `(sub_denom, denom)` pair in [`CATEGORY`].
    pub fn factor_of(conn: &rusqlite::Connection, sub_denom: &str, denom: &str) -> Option<Dec> {
        factors::get(conn, CATEGORY, sub_denom)
            .expect("get factor")
            .and_then(|f| f.get(denom))
    }

    pub fn schedule(name: &str, steps: &[(u64, &str)]) -> MultiplierSchedule {
        MultiplierSchedule {
            name: name.to_string(),
            periods: steps
                .iter()
                .map(|(length_secs, fraction)| VestingPeriod {
                    length_secs: *length_secs,
                    fraction: fraction.parse().expect("dec"),
                })
                .collect(),
            partial: false,
        }
    }

    pub fn params(periods: Vec<RewardPeriod>) -> Params {
        Params {
            reward_periods: periods,
            multipliers: vec![
                schedule("small", &[(0, "1")]),
                schedule("medium", &[(5, "0.5"), (5, "1")]),
            ],
            claim_end: 1_000_000,
            payout_account: PAYOUT.to_string(),
            reserve_account: RESERVE.to_string(),
        }
    }

    pub fn keeper(periods: Vec<RewardPeriod>) -> Keeper<StubOracle, StubBank> {
        let mut bank = StubBank::new();
        bank.fund(PAYOUT, "hard", 1_000_000_000).expect("fund");
        bank.fund(PAYOUT, "ukava", 1_000_000_000).expect("fund");
        Keeper::new(params(periods), StubOracle::new(), bank).expect("keeper")
    }

    pub fn db() -> rusqlite::Connection {
        accrue_db::open_memory().expect("open db")
    }
}
