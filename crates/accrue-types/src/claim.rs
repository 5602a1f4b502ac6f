//! Reward indexes and claims.
//!
//! A sub-denom may pay several reward denoms, so both the global factors and
//! an account's snapshot of them are per-denom maps ([`RewardIndexes`]),
//! grouped per sub-denom ([`MultiRewardIndexes`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coins::Coins;
use crate::dec::Dec;
use crate::{validate_id, AccountId, Category, Result, SubDenom, Timestamp, TypesError};

/// Factor of one reward denom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardIndex {
    pub denom: String,
    pub factor: Dec,
}

/// Factors of every reward denom paid for one sub-denom, ordered by denom.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RewardIndex>", into = "Vec<RewardIndex>")]
pub struct RewardIndexes(BTreeMap<String, Dec>);

impl RewardIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RewardIndexes::set`].
    pub fn with(mut self, denom: &str, factor: Dec) -> Self {
        self.set(denom, factor);
        self
    }

    pub fn get(&self, denom: &str) -> Option<Dec> {
        self.0.get(denom).copied()
    }

    /// Insert or overwrite the factor of `denom`.
    pub fn set(&mut self, denom: &str, factor: Dec) {
        self.0.insert(denom.to_string(), factor);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `(denom, factor)` in denom order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Dec)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<Vec<RewardIndex>> for RewardIndexes {
    fn from(indexes: Vec<RewardIndex>) -> Self {
        Self(indexes.into_iter().map(|i| (i.denom, i.factor)).collect())
    }
}

impl From<RewardIndexes> for Vec<RewardIndex> {
    fn from(indexes: RewardIndexes) -> Self {
        indexes
            .0
            .into_iter()
            .map(|(denom, factor)| RewardIndex { denom, factor })
            .collect()
    }
}

impl FromIterator<(String, Dec)> for RewardIndexes {
    fn from_iter<I: IntoIterator<Item = (String, Dec)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Reward indexes of one sub-denom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRewardIndex {
    pub sub_denom: SubDenom,
    pub indexes: RewardIndexes,
}

/// Reward indexes of one category, keyed and ordered by sub-denom.
///
/// Sub-denoms without any reward denom are not kept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MultiRewardIndex>", into = "Vec<MultiRewardIndex>")]
pub struct MultiRewardIndexes(BTreeMap<SubDenom, RewardIndexes>);

impl MultiRewardIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sub_denom: &str) -> Option<&RewardIndexes> {
        self.0.get(sub_denom)
    }

    /// Index of one `(sub_denom, denom)` pair.
    pub fn factor(&self, sub_denom: &str, denom: &str) -> Option<Dec> {
        self.0.get(sub_denom).and_then(|indexes| indexes.get(denom))
    }

    /// Insert or overwrite the indexes of `sub_denom`.
    pub fn set(&mut self, sub_denom: &str, indexes: RewardIndexes) {
        if indexes.is_empty() {
            self.0.remove(sub_denom);
        } else {
            self.0.insert(sub_denom.to_string(), indexes);
        }
    }

    pub fn remove(&mut self, sub_denom: &str) -> Option<RewardIndexes> {
        self.0.remove(sub_denom)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Sub-denoms in sorted order.
    pub fn sub_denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(sub_denom, indexes)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RewardIndexes)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Vec<MultiRewardIndex>> for MultiRewardIndexes {
    fn from(entries: Vec<MultiRewardIndex>) -> Self {
        let mut indexes = Self::new();
        for entry in entries {
            indexes.set(&entry.sub_denom, entry.indexes);
        }
        indexes
    }
}

impl From<MultiRewardIndexes> for Vec<MultiRewardIndex> {
    fn from(indexes: MultiRewardIndexes) -> Self {
        indexes
            .0
            .into_iter()
            .map(|(sub_denom, indexes)| MultiRewardIndex { sub_denom, indexes })
            .collect()
    }
}

/// Accumulated, not-yet-paid rewards of one account in one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub owner: AccountId,
    pub category: Category,
    /// Claimable balance, one entry per reward denom.
    pub reward: Coins,
    /// Factor values observed at the last synchronization.
    pub indexes: MultiRewardIndexes,
    /// First participation; vesting schedules are measured from here.
    ///
    /// Not reset by a payout. Once the longest vesting threshold has passed,
    /// every later claim of this record releases the final fraction. Only a
    /// pruned and recreated claim starts vesting again.
    pub eligible_since: Timestamp,
}

impl Claim {
    /// An empty claim created at first participation.
    pub fn new(owner: impl Into<AccountId>, category: impl Into<Category>, now: Timestamp) -> Self {
        Self {
            owner: owner.into(),
            category: category.into(),
            reward: Coins::new(),
            indexes: MultiRewardIndexes::new(),
            eligible_since: now,
        }
    }

    /// Whether the claimable balance is zero.
    pub fn is_paid(&self) -> bool {
        self.reward.is_empty()
    }

    /// Stateless validation.
    pub fn validate(&self) -> Result<()> {
        validate_id("claim owner", &self.owner).map_err(TypesError::InvalidGenesis)?;
        validate_id("claim category", &self.category).map_err(TypesError::InvalidGenesis)?;
        for (sub_denom, indexes) in self.indexes.iter() {
            validate_id("index sub_denom", sub_denom).map_err(TypesError::InvalidGenesis)?;
            for (denom, _) in indexes.iter() {
                validate_id("index denom", denom).map_err(TypesError::InvalidGenesis)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Dec {
        s.parse().expect("dec")
    }

    #[test]
    fn test_multi_reward_indexes_sorted() {
        let mut indexes = MultiRewardIndexes::new();
        indexes.set("btcb", RewardIndexes::new().with("hard", d("0.2")));
        indexes.set("bnb", RewardIndexes::new().with("hard", d("0.1")));
        indexes.set("xrpb", RewardIndexes::new().with("hard", d("0.3")));
        let order: Vec<&str> = indexes.sub_denoms().collect();
        assert_eq!(order, vec!["bnb", "btcb", "xrpb"]);
    }

    #[test]
    fn test_empty_sub_denom_not_kept() {
        let mut indexes = MultiRewardIndexes::new();
        indexes.set("bnb", RewardIndexes::new().with("hard", d("1")));
        indexes.set("bnb", RewardIndexes::new());
        assert!(indexes.is_empty());
        assert_eq!(indexes.factor("bnb", "hard"), None);
    }

    #[test]
    fn test_multi_reward_indexes_serialize_as_nested_lists() {
        let mut indexes = MultiRewardIndexes::new();
        indexes.set(
            "btcb",
            RewardIndexes::new()
                .with("ukava", d("0.3"))
                .with("hard", d("0.2")),
        );
        indexes.set("bnb", RewardIndexes::new().with("hard", d("0.1")));

        let json = serde_json::to_value(&indexes).expect("serialize");
        assert_eq!(json[0]["sub_denom"], "bnb");
        assert_eq!(json[1]["sub_denom"], "btcb");
        assert_eq!(json[1]["indexes"][0]["denom"], "hard");
        assert_eq!(json[1]["indexes"][1]["denom"], "ukava");

        let parsed: MultiRewardIndexes = serde_json::from_value(json).expect("parse");
        assert_eq!(parsed, indexes);
        assert_eq!(parsed.factor("btcb", "ukava"), Some(d("0.3")));
    }

    #[test]
    fn test_new_claim_is_paid() {
        let claim = Claim::new("kava1a", "hard-supply", 10);
        assert!(claim.is_paid());
        assert_eq!(claim.eligible_since, 10);
        claim.validate().expect("valid");
    }

    #[test]
    fn test_claim_validation() {
        let claim = Claim::new("", "hard-supply", 10);
        assert!(claim.validate().is_err());
    }
}
