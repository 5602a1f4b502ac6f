//! Index synchronizer and participation hooks.
//!
//! Synchronizing an account moves its claim forward to `now`:
//!
//! 1. Advance the category's factors.
//! 2. For every sub-denom the account holds (stored index or live weight)
//!    and every reward denom of that sub-denom, credit
//!    `(factor - index) * weight`, truncated.
//! 3. Overwrite the indexes with the factors.
//!
//! A sub-denom without indexes defaults to the current factors, so an
//! account never earns emission from before it first participated. A reward
//! denom missing from an existing sub-denom entry accrues from zero: the
//! account held the sub-denom for the whole life of that denom's factor.

use std::collections::BTreeSet;

use accrue_db::queries::claims;
use accrue_types::claim::{Claim, RewardIndexes};
use accrue_types::coins::Coins;
use accrue_types::dec::Dec;
use accrue_types::{AccountId, SubDenom, Timestamp};
use rusqlite::Connection;

use crate::expected::{BankKeeper, ParticipationOracle};
use crate::{Keeper, KeeperError, Result};

impl<O: ParticipationOracle, B: BankKeeper> Keeper<O, B> {
    /// Synchronize one account in one category and return the credited delta.
    ///
    /// Idempotent at a fixed `now`: the second call credits nothing.
    ///
    /// # Errors
    ///
    /// - [`KeeperError::NegativeRewardDelta`] if a stored index is ahead of
    ///   its factor; nothing is written
    pub fn synchronize(
        &mut self,
        conn: &mut Connection,
        account: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<Coins> {
        self.atomic(conn, |keeper, tx| keeper.sync_in(tx, account, category, now))
    }

    /// Settle accrual under the weight that is about to change.
    ///
    /// Must run before the oracle reports the new weight.
    pub fn before_participation_modified(
        &mut self,
        conn: &mut Connection,
        account: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<()> {
        self.synchronize(conn, account, category, now).map(|_| ())
    }

    /// Start tracking sub-denoms the account has just entered.
    ///
    /// Runs after the oracle reports the new weight. New indexes start at the
    /// current factor; existing ones are left alone, so nothing is credited.
    pub fn after_participation_modified(
        &mut self,
        conn: &mut Connection,
        account: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<()> {
        self.atomic(conn, |keeper, tx| {
            keeper.advance_category(tx, category, now)?;
            let held = keeper.oracle.sub_denoms_of(category, account);
            let existing = claims::get(tx, category, account)?;
            if existing.is_none() && held.is_empty() {
                return Ok(());
            }

            let mut claim = existing.unwrap_or_else(|| Claim::new(account, category, now));
            let mut added = 0usize;
            for sub_denom in &held {
                if claim.indexes.get(sub_denom).is_none() {
                    let factor = keeper.stored_factor(tx, category, sub_denom)?;
                    claim.indexes.set(sub_denom, factor);
                    added += 1;
                }
            }
            claims::set(tx, &claim)?;
            tracing::debug!(account, category, now, added, "participation indexes initialized");
            Ok(())
        })
    }

    /// Synchronize every participant of `category`: all accounts the oracle
    /// reports plus every stored claim, in sorted order.
    ///
    /// Returns the number of accounts visited.
    pub fn sync_all(
        &mut self,
        conn: &mut Connection,
        category: &str,
        now: Timestamp,
    ) -> Result<usize> {
        self.atomic(conn, |keeper, tx| {
            let mut accounts: BTreeSet<AccountId> =
                keeper.oracle.eligible_accounts(category).into_iter().collect();
            accounts.extend(claims::list(tx, category)?.into_iter().map(|c| c.owner));

            for account in &accounts {
                keeper.sync_in(tx, account, category, now)?;
            }
            tracing::debug!(category, now, accounts = accounts.len(), "full sync sweep");
            Ok(accounts.len())
        })
    }

    /// Project the claim of `account` as if it were synchronized at `now`.
    ///
    /// Performs no writes. Returns `None` if the account has neither a claim
    /// nor any weight in the category.
    pub fn simulate_synchronize(
        &self,
        conn: &Connection,
        account: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<Option<Claim>> {
        let Some(mut claim) = self.load_or_open(conn, account, category, now)? else {
            return Ok(None);
        };
        self.accumulate(&mut claim, |sub_denom| {
            self.project_factor(conn, category, sub_denom, now)
        })?;
        Ok(Some(claim))
    }

    /// Synchronize inside an open transaction.
    pub(crate) fn sync_in(
        &mut self,
        conn: &Connection,
        account: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<Coins> {
        self.advance_category(conn, category, now)?;

        let Some(mut claim) = self.load_or_open(conn, account, category, now)? else {
            return Ok(Coins::new());
        };
        let delta = self.accumulate(&mut claim, |sub_denom| {
            self.stored_factor(conn, category, sub_denom)
        })?;
        claims::set(conn, &claim)?;

        tracing::debug!(account, category, now, %delta, "claim synchronized");
        Ok(delta)
    }

    /// Stored claim, or a fresh one if the account participates without one.
    fn load_or_open(
        &self,
        conn: &Connection,
        account: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<Option<Claim>> {
        if let Some(claim) = claims::get(conn, category, account)? {
            return Ok(Some(claim));
        }
        if self.oracle.sub_denoms_of(category, account).is_empty() {
            return Ok(None);
        }
        Ok(Some(Claim::new(account, category, now)))
    }

    /// Credit accrued reward into `claim` and move its indexes to the current
    /// factors. Returns the credited delta.
    fn accumulate(
        &self,
        claim: &mut Claim,
        mut current_factor: impl FnMut(&str) -> Result<RewardIndexes>,
    ) -> Result<Coins> {
        let mut sub_denoms: BTreeSet<SubDenom> =
            claim.indexes.sub_denoms().map(str::to_string).collect();
        sub_denoms.extend(self.oracle.sub_denoms_of(&claim.category, &claim.owner));

        let mut delta = Coins::new();
        for sub_denom in &sub_denoms {
            let factor = current_factor(sub_denom)?;
            let previous = claim.indexes.get(sub_denom).cloned();
            let weight = self
                .oracle
                .eligible_weight(&claim.category, sub_denom, &claim.owner);

            for (denom, global) in factor.iter() {
                let index = match &previous {
                    Some(indexes) => indexes.get(denom).unwrap_or(Dec::ZERO),
                    None => global,
                };
                if global < index {
                    return Err(KeeperError::NegativeRewardDelta {
                        owner: claim.owner.clone(),
                        category: claim.category.clone(),
                        sub_denom: sub_denom.clone(),
                        denom: denom.to_string(),
                        index,
                        factor: global,
                    });
                }
                let earned = global.checked_sub(index)?.mul_int_floor(weight)?;
                delta.add_amount(denom, earned)?;
            }
            claim.indexes.set(sub_denom, factor);
        }

        claim.reward = claim.reward.checked_add(&delta)?;
        Ok(delta)
    }
}
