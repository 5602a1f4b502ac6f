//! Claim payout and cleanup.
//!
//! A payout synchronizes the owner, applies the named vesting schedule to
//! the whole balance, zeroes the claim and issues one multi-send from the
//! payout account: the released part to the recipient, the forfeited part
//! to the reserve. All of it runs in one transaction, so a failed transfer
//! leaves the balance exactly as it was.

use accrue_db::queries::claims;
use accrue_types::coins::Coins;
use accrue_types::dec::Dec;
use accrue_types::events::Event;
use accrue_types::msgs::{MsgClaimReward, MsgClaimRewardOnBehalf};
use accrue_types::{AccountId, Category, Timestamp};
use accrue_vesting::multiplier::apply_multiplier;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::expected::{BankKeeper, ParticipationOracle};
use crate::{Keeper, KeeperError, Result};

/// What a successful claim paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub owner: AccountId,
    pub receiver: AccountId,
    pub category: Category,
    pub multiplier_name: String,
    pub fraction: Dec,
    pub released: Coins,
    pub forfeited: Coins,
}

impl<O: ParticipationOracle, B: BankKeeper> Keeper<O, B> {
    /// Pay out the sender's claim in `msg.category` to the sender.
    ///
    /// # Errors
    ///
    /// - [`KeeperError::Types`] if the message fails basic validation
    /// - [`KeeperError::ClaimExpired`] after the claim window closed
    /// - [`KeeperError::InvalidMultiplier`] for an unknown schedule
    /// - [`KeeperError::ClaimNotFound`] if the sender has no claim
    /// - [`KeeperError::ZeroClaimAmount`] if nothing would be released
    /// - [`KeeperError::ClaimNotYetVested`] before the first vesting threshold
    /// - [`KeeperError::Transfer`] if the bank rejects the payout
    ///
    /// On any error the claim is left unchanged.
    pub fn claim_reward(
        &mut self,
        conn: &mut Connection,
        msg: &MsgClaimReward,
        now: Timestamp,
    ) -> Result<ClaimReceipt> {
        msg.validate_basic()?;
        self.atomic(conn, |keeper, tx| {
            keeper.pay_out(
                tx,
                &msg.sender,
                &msg.sender,
                &msg.category,
                &msg.multiplier_name,
                now,
            )
        })
    }

    /// Pay out the sender's claim in `msg.category` to `msg.receiver`.
    ///
    /// Same checks and atomicity as [`Keeper::claim_reward`].
    pub fn claim_reward_on_behalf(
        &mut self,
        conn: &mut Connection,
        msg: &MsgClaimRewardOnBehalf,
        now: Timestamp,
    ) -> Result<ClaimReceipt> {
        msg.validate_basic()?;
        self.atomic(conn, |keeper, tx| {
            keeper.pay_out(
                tx,
                &msg.sender,
                &msg.receiver,
                &msg.category,
                &msg.multiplier_name,
                now,
            )
        })
    }

    /// Delete paid claims of accounts that no longer participate in `category`.
    ///
    /// Returns the number of claims removed.
    pub fn prune_zero_claims(&mut self, conn: &mut Connection, category: &str) -> Result<usize> {
        self.atomic(conn, |keeper, tx| {
            let mut pruned = 0usize;
            for claim in claims::list(tx, category)? {
                if !claim.is_paid() {
                    continue;
                }
                if !keeper.oracle.sub_denoms_of(category, &claim.owner).is_empty() {
                    continue;
                }
                claims::delete(tx, category, &claim.owner)?;
                keeper.emit(Event::ClaimPruned {
                    owner: claim.owner,
                    category: category.to_string(),
                });
                pruned += 1;
            }
            if pruned > 0 {
                tracing::info!(category, pruned, "pruned zero-balance claims");
            }
            Ok(pruned)
        })
    }

    fn pay_out(
        &mut self,
        conn: &Connection,
        owner: &str,
        receiver: &str,
        category: &str,
        multiplier_name: &str,
        now: Timestamp,
    ) -> Result<ClaimReceipt> {
        if now > self.params.claim_end {
            return Err(KeeperError::ClaimExpired {
                claim_end: self.params.claim_end,
                now,
            });
        }
        let schedule = self
            .params
            .multiplier(multiplier_name)
            .cloned()
            .ok_or_else(|| KeeperError::InvalidMultiplier(multiplier_name.to_string()))?;
        let not_found = || KeeperError::ClaimNotFound {
            owner: owner.to_string(),
            category: category.to_string(),
        };
        if !claims::exists(conn, category, owner)? {
            return Err(not_found());
        }

        self.sync_in(conn, owner, category, now)?;
        let mut claim = claims::get(conn, category, owner)?.ok_or_else(not_found)?;
        let zero = || KeeperError::ZeroClaimAmount {
            owner: owner.to_string(),
            category: category.to_string(),
        };
        if claim.reward.is_empty() {
            return Err(zero());
        }

        let release = apply_multiplier(&claim.reward, &schedule, claim.eligible_since, now)?;
        if release.released.is_empty() {
            return Err(zero());
        }

        claim.reward = Coins::new();
        claims::set(conn, &claim)?;

        let mut outputs = vec![(receiver.to_string(), release.released.clone())];
        if !release.forfeited.is_empty() {
            outputs.push((self.params.reserve_account.clone(), release.forfeited.clone()));
        }
        let payout_account = self.params.payout_account.clone();
        self.bank.send(&payout_account, &outputs)?;

        tracing::info!(
            owner,
            receiver,
            category,
            multiplier = multiplier_name,
            fraction = %release.fraction,
            released = %release.released,
            forfeited = %release.forfeited,
            "claim paid"
        );
        self.emit(Event::Claim {
            claimed_by: owner.to_string(),
            owner: owner.to_string(),
            receiver: receiver.to_string(),
            category: category.to_string(),
            multiplier_name: multiplier_name.to_string(),
            fraction: release.fraction,
            released: release.released.clone(),
            forfeited: release.forfeited.clone(),
            timestamp: now,
        });

        Ok(ClaimReceipt {
            owner: owner.to_string(),
            receiver: receiver.to_string(),
            category: category.to_string(),
            multiplier_name: multiplier_name.to_string(),
            fraction: release.fraction,
            released: release.released,
            forfeited: release.forfeited,
        })
    }
}
