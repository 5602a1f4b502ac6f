//! Events emitted by the engine.
//!
//! Events are collected per interaction and discarded if the interaction is
//! rolled back.

use serde::{Deserialize, Serialize};

use crate::coins::Coins;
use crate::dec::Dec;
use crate::{AccountId, Category, SubDenom, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A claim was paid out.
    Claim {
        claimed_by: AccountId,
        owner: AccountId,
        receiver: AccountId,
        category: Category,
        multiplier_name: String,
        fraction: Dec,
        released: Coins,
        forfeited: Coins,
        timestamp: Timestamp,
    },
    /// Emission with no eligible weight behind it was dropped.
    EmissionForfeited {
        category: Category,
        sub_denom: SubDenom,
        from: Timestamp,
        to: Timestamp,
        amount: Coins,
    },
    /// A fully paid claim of a non-participant was deleted.
    ClaimPruned {
        owner: AccountId,
        category: Category,
    },
}
