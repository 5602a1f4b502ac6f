//! Collaborators the engine expects from its host.
//!
//! Neither trait is implemented here for production use; the host ledger
//! provides them. [`crate::stub`] has in-memory versions for tests and
//! scenario replay.

use accrue_types::coins::Coins;
use accrue_types::{AccountId, SubDenom};

/// Reports who participates in a category and with what weight.
///
/// Weights are read at synchronization time, so a host must invoke the
/// synchronizer *before* it changes an account's weight.
pub trait ParticipationOracle {
    /// Weight of `account` in `(category, sub_denom)`; zero if absent.
    fn eligible_weight(&self, category: &str, sub_denom: &str, account: &str) -> u128;

    /// Sum of all weights in `(category, sub_denom)`.
    fn total_eligible_weight(&self, category: &str, sub_denom: &str) -> u128;

    /// Sub-denoms of `category` in which `account` holds a positive weight.
    fn sub_denoms_of(&self, category: &str, account: &str) -> Vec<SubDenom>;

    /// Every account with a positive weight in `category`, sorted.
    fn eligible_accounts(&self, category: &str) -> Vec<AccountId>;
}

/// Moves reward funds.
pub trait BankKeeper {
    /// Atomically send `outputs` from `from`. Either every output is paid or
    /// none is.
    fn send(&mut self, from: &str, outputs: &[(AccountId, Coins)]) -> Result<(), BankError>;
}

/// Errors reported by a [`BankKeeper`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("insufficient funds in {account}: need {needed}, have {held}")]
    InsufficientFunds {
        account: AccountId,
        needed: Coins,
        held: Coins,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}
