//! Scripted scenario replay.
//!
//! A scenario is a genesis state, initial balances and a list of blocks.
//! Each block advances every factor to its time, then applies its actions
//! in order. Participation changes run through the before/after hooks so
//! accrual under the old weight is settled first.
//!
//! Validation failures (unknown claim, not yet vested, ...) are recorded and
//! replay continues. Invariant violations abort the replay.

use std::collections::BTreeMap;

use accrue_engine::claims::ClaimReceipt;
use accrue_engine::genesis::init_genesis;
use accrue_engine::stub::{StubBank, StubOracle};
use accrue_engine::{Keeper, KeeperError};
use accrue_types::claim::Claim;
use accrue_types::coins::Coins;
use accrue_types::events::Event;
use accrue_types::genesis::GenesisState;
use accrue_types::msgs::{MsgClaimReward, MsgClaimRewardOnBehalf};
use accrue_types::{AccountId, Category, SubDenom, Timestamp};
use anyhow::{bail, Context};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// A scripted run.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub genesis: GenesisState,
    #[serde(default)]
    pub funds: Vec<Funding>,
    pub blocks: Vec<Block>,
}

/// Initial balance credited before the first block.
#[derive(Debug, Clone, Deserialize)]
pub struct Funding {
    pub account: AccountId,
    pub denom: String,
    pub amount: u128,
}

/// One block: its time and the interactions it carries.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub time: Timestamp,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A single interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SetWeight {
        account: AccountId,
        category: Category,
        sub_denom: SubDenom,
        weight: u128,
    },
    Claim {
        account: AccountId,
        category: Category,
        multiplier: String,
    },
    ClaimOnBehalf {
        account: AccountId,
        receiver: AccountId,
        category: Category,
        multiplier: String,
    },
    Sync {
        account: AccountId,
        category: Category,
    },
    SyncAll {
        category: Category,
    },
    Prune {
        category: Category,
    },
}

/// An action the engine refused.
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub time: Timestamp,
    pub action: Action,
    pub error: String,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub blocks: usize,
    pub final_time: Option<Timestamp>,
    pub receipts: Vec<ClaimReceipt>,
    pub rejections: Vec<Rejection>,
    pub events: Vec<Event>,
    pub claims: Vec<Claim>,
    pub balances: BTreeMap<AccountId, Coins>,
}

/// Replay options taken from the node configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    pub prune_zero_claims: bool,
}

/// Import the scenario genesis into `conn` and replay every block.
///
/// # Errors
///
/// Fails on invalid genesis, non-increasing block times and any fatal
/// engine error. The store is left at the last committed block.
pub fn run(
    conn: &mut Connection,
    scenario: &Scenario,
    options: ReplayOptions,
) -> anyhow::Result<ReplaySummary> {
    init_genesis(conn, &scenario.genesis).context("importing scenario genesis")?;

    let mut bank = StubBank::new();
    for funding in &scenario.funds {
        bank.fund(&funding.account, &funding.denom, funding.amount)
            .with_context(|| format!("funding {}", funding.account))?;
    }
    let mut keeper = Keeper::new(scenario.genesis.params.clone(), StubOracle::new(), bank)?;
    let categories: Vec<Category> = keeper
        .params()
        .categories()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut receipts = Vec::new();
    let mut rejections = Vec::new();
    let mut last_time: Option<Timestamp> = None;

    for block in &scenario.blocks {
        if let Some(last) = last_time {
            if block.time <= last {
                bail!("block time {} does not follow {}", block.time, last);
            }
        }
        last_time = Some(block.time);

        keeper
            .begin_block(conn, block.time)
            .with_context(|| format!("begin block at {}", block.time))?;

        for action in &block.actions {
            match apply(&mut keeper, conn, action, block.time) {
                Ok(Some(receipt)) => receipts.push(receipt),
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    error!(time = block.time, ?action, error = %e, "fatal invariant violation");
                    return Err(anyhow::Error::new(e)
                        .context(format!("fatal error at {}: {action:?}", block.time)));
                }
                Err(e) => {
                    warn!(time = block.time, ?action, error = %e, "action rejected");
                    rejections.push(Rejection {
                        time: block.time,
                        action: action.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if options.prune_zero_claims {
            for category in &categories {
                keeper.prune_zero_claims(conn, category)?;
            }
        }
    }

    let claims = keeper.export_genesis(conn)?.claims;
    info!(
        blocks = scenario.blocks.len(),
        receipts = receipts.len(),
        rejections = rejections.len(),
        "replay finished"
    );

    Ok(ReplaySummary {
        blocks: scenario.blocks.len(),
        final_time: last_time,
        receipts,
        rejections,
        events: keeper.take_events(),
        claims,
        balances: keeper.bank().balances().clone(),
    })
}

fn apply(
    keeper: &mut Keeper<StubOracle, StubBank>,
    conn: &mut Connection,
    action: &Action,
    now: Timestamp,
) -> Result<Option<ClaimReceipt>, KeeperError> {
    match action {
        Action::SetWeight {
            account,
            category,
            sub_denom,
            weight,
        } => {
            keeper.before_participation_modified(conn, account, category, now)?;
            keeper
                .oracle_mut()
                .set_weight(category, sub_denom, account, *weight);
            keeper.after_participation_modified(conn, account, category, now)?;
            Ok(None)
        }
        Action::Claim {
            account,
            category,
            multiplier,
        } => {
            let msg = MsgClaimReward::new(account.as_str(), category.as_str(), multiplier.as_str());
            keeper.claim_reward(conn, &msg, now).map(Some)
        }
        Action::ClaimOnBehalf {
            account,
            receiver,
            category,
            multiplier,
        } => {
            let msg = MsgClaimRewardOnBehalf::new(
                account.as_str(),
                receiver.as_str(),
                category.as_str(),
                multiplier.as_str(),
            );
            keeper.claim_reward_on_behalf(conn, &msg, now).map(Some)
        }
        Action::Sync { account, category } => {
            keeper.synchronize(conn, account, category, now)?;
            Ok(None)
        }
        Action::SyncAll { category } => {
            keeper.sync_all(conn, category, now)?;
            Ok(None)
        }
        Action::Prune { category } => {
            keeper.prune_zero_claims(conn, category)?;
            Ok(None)
        }
    }
}
