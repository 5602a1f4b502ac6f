//! Read-only queries.

use std::collections::BTreeSet;

use accrue_db::queries::{claims, factors};
use accrue_types::claim::Claim;
use accrue_types::genesis::RewardFactor;
use accrue_types::params::Params;
use accrue_types::{Category, Timestamp};
use rusqlite::Connection;

use crate::expected::{BankKeeper, ParticipationOracle};
use crate::{Keeper, Result};

impl<O: ParticipationOracle, B: BankKeeper> Keeper<O, B> {
    pub fn query_params(&self) -> &Params {
        &self.params
    }

    /// Stored factors of one category, or of all categories.
    pub fn query_reward_factors(
        &self,
        conn: &Connection,
        category: Option<&str>,
    ) -> Result<Vec<RewardFactor>> {
        let factors = match category {
            Some(category) => factors::list(conn, category)?,
            None => factors::list_all(conn)?,
        };
        Ok(factors)
    }

    /// Claims of `owner`, optionally limited to one category.
    ///
    /// With `unsynced` the stored claims are returned as-is. Otherwise each
    /// claim is projected to `now` as if synchronized, without writing.
    pub fn query_rewards(
        &self,
        conn: &Connection,
        owner: &str,
        category: Option<&str>,
        unsynced: bool,
        now: Timestamp,
    ) -> Result<Vec<Claim>> {
        let stored: Vec<Claim> = claims::list_by_owner(conn, owner)?
            .into_iter()
            .filter(|c| category.map_or(true, |wanted| c.category == wanted))
            .collect();
        if unsynced {
            return Ok(stored);
        }

        let mut categories: BTreeSet<Category> = stored.into_iter().map(|c| c.category).collect();
        match category {
            Some(category) => {
                categories.insert(category.to_string());
            }
            None => categories.extend(self.params.categories().into_iter().map(str::to_string)),
        }

        let mut projected = Vec::new();
        for category in &categories {
            if let Some(claim) = self.simulate_synchronize(conn, owner, category, now)? {
                projected.push(claim);
            }
        }
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use accrue_types::dec::Dec;

    #[test]
    fn test_query_reward_factors() {
        let mut keeper = keeper(vec![period("bnb", 0, 100, 10), period("btcb", 0, 100, 10)]);
        let mut conn = db();
        keeper.oracle_mut().set_weight(CATEGORY, "bnb", "kava1a", 1);
        keeper.begin_block(&mut conn, 0).expect("block");
        keeper.begin_block(&mut conn, 2).expect("block");

        let listed = keeper
            .query_reward_factors(&conn, Some(CATEGORY))
            .expect("query");
        let values: Vec<(&str, Option<Dec>)> = listed
            .iter()
            .map(|f| (f.sub_denom.as_str(), f.factors.get("hard")))
            .collect();
        assert_eq!(
            values,
            vec![("bnb", Some(Dec::from_int(20).expect("dec"))), ("btcb", Some(Dec::ZERO))]
        );
        assert!(keeper
            .query_reward_factors(&conn, Some("delegator"))
            .expect("query")
            .is_empty());
        assert_eq!(keeper.query_reward_factors(&conn, None).expect("query").len(), 2);
    }

    #[test]
    fn test_query_rewards_synced_and_unsynced() {
        let mut keeper = keeper(vec![period("bnb", 0, 100, 10)]);
        let mut conn = db();
        keeper.oracle_mut().set_weight(CATEGORY, "bnb", "kava1a", 1);
        keeper
            .synchronize(&mut conn, "kava1a", CATEGORY, 0)
            .expect("sync");

        let unsynced = keeper
            .query_rewards(&conn, "kava1a", None, true, 5)
            .expect("query");
        assert_eq!(unsynced.len(), 1);
        assert!(unsynced[0].reward.is_empty());

        let synced = keeper
            .query_rewards(&conn, "kava1a", Some(CATEGORY), false, 5)
            .expect("query");
        assert_eq!(synced.len(), 1);
        assert_eq!(synced[0].reward.amount_of("hard"), 50);

        assert!(keeper
            .query_rewards(&conn, "kava1z", None, false, 5)
            .expect("query")
            .is_empty());
    }
}
