//! Genesis import/export state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::claim::{Claim, RewardIndexes};
use crate::dec::Dec;
use crate::params::Params;
use crate::{validate_id, Category, Result, SubDenom, Timestamp, TypesError};

/// Last accrual instant of one factor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualTime {
    pub category: Category,
    pub sub_denom: SubDenom,
    pub timestamp: Timestamp,
}

/// Global reward factors of one `(category, sub_denom)` pair, one per
/// reward denom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFactor {
    pub category: Category,
    pub sub_denom: SubDenom,
    pub factors: RewardIndexes,
}

/// Complete engine state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    #[serde(default)]
    pub accrual_times: Vec<AccrualTime>,
    #[serde(default)]
    pub reward_factors: Vec<RewardFactor>,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl GenesisState {
    /// Genesis with the given params and no state.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            accrual_times: Vec::new(),
            reward_factors: Vec::new(),
            claims: Vec::new(),
        }
    }

    /// Validate params, reject duplicate keys and claim indexes ahead of
    /// their global factor.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        let mut seen = BTreeSet::new();
        for at in &self.accrual_times {
            validate_id("category", &at.category).map_err(TypesError::InvalidGenesis)?;
            validate_id("sub_denom", &at.sub_denom).map_err(TypesError::InvalidGenesis)?;
            if !seen.insert((&at.category, &at.sub_denom)) {
                return Err(TypesError::InvalidGenesis(format!(
                    "duplicate accrual time {}/{}",
                    at.category, at.sub_denom
                )));
            }
        }

        let mut factors: BTreeMap<(&str, &str), &RewardIndexes> = BTreeMap::new();
        for rf in &self.reward_factors {
            validate_id("category", &rf.category).map_err(TypesError::InvalidGenesis)?;
            validate_id("sub_denom", &rf.sub_denom).map_err(TypesError::InvalidGenesis)?;
            for (denom, _) in rf.factors.iter() {
                validate_id("factor denom", denom).map_err(TypesError::InvalidGenesis)?;
            }
            let key = (rf.category.as_str(), rf.sub_denom.as_str());
            if factors.insert(key, &rf.factors).is_some() {
                return Err(TypesError::InvalidGenesis(format!(
                    "duplicate reward factor {}/{}",
                    rf.category, rf.sub_denom
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for claim in &self.claims {
            claim.validate()?;
            if !seen.insert((&claim.category, &claim.owner)) {
                return Err(TypesError::InvalidGenesis(format!(
                    "duplicate claim {}/{}",
                    claim.category, claim.owner
                )));
            }
            for (sub_denom, indexes) in claim.indexes.iter() {
                let global = factors.get(&(claim.category.as_str(), sub_denom));
                for (denom, index) in indexes.iter() {
                    let factor = global
                        .and_then(|f| f.get(denom))
                        .unwrap_or(Dec::ZERO);
                    if index > factor {
                        return Err(TypesError::InvalidGenesis(format!(
                            "claim {}/{} index {index} for {sub_denom}/{denom} exceeds factor {factor}",
                            claim.category, claim.owner
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params {
            claim_end: 100,
            payout_account: "incentive".to_string(),
            reserve_account: "community".to_string(),
            ..Params::default()
        }
    }

    #[test]
    fn test_empty_genesis_valid() {
        GenesisState::new(params()).validate().expect("valid");
    }

    #[test]
    fn test_duplicate_claims_rejected() {
        let mut genesis = GenesisState::new(params());
        genesis.claims.push(Claim::new("kava1a", "hard-supply", 0));
        genesis.claims.push(Claim::new("kava1a", "hard-supply", 5));
        assert!(genesis.validate().is_err());
    }

    #[test]
    fn test_duplicate_accrual_times_rejected() {
        let mut genesis = GenesisState::new(params());
        for timestamp in [1, 2] {
            genesis.accrual_times.push(AccrualTime {
                category: "swap".to_string(),
                sub_denom: "bnb:usdx".to_string(),
                timestamp,
            });
        }
        assert!(genesis.validate().is_err());
    }

    fn d(s: &str) -> Dec {
        s.parse().expect("dec")
    }

    fn indexed_claim(index: &str) -> Claim {
        let mut claim = Claim::new("kava1a", "hard-supply", 0);
        claim
            .indexes
            .set("bnb", RewardIndexes::new().with("hard", d(index)));
        claim
    }

    #[test]
    fn test_claim_index_ahead_of_factor_rejected() {
        let mut genesis = GenesisState::new(params());
        genesis.reward_factors.push(RewardFactor {
            category: "hard-supply".to_string(),
            sub_denom: "bnb".to_string(),
            factors: RewardIndexes::new().with("hard", d("1")),
        });
        genesis.claims.push(indexed_claim("5"));
        let err = genesis.validate().expect_err("index above factor");
        assert!(matches!(err, TypesError::InvalidGenesis(_)));

        genesis.claims[0] = indexed_claim("1");
        genesis.validate().expect("index equal to factor");
    }

    #[test]
    fn test_claim_index_without_factor_must_be_zero() {
        let mut genesis = GenesisState::new(params());
        genesis.claims.push(indexed_claim("0.5"));
        assert!(genesis.validate().is_err());

        genesis.claims[0] = indexed_claim("0");
        genesis.validate().expect("zero index");
    }

    #[test]
    fn test_genesis_json_defaults() {
        let json = r#"{"params":{"claim_end":5,"payout_account":"a","reserve_account":"b"}}"#;
        let genesis: GenesisState = serde_json::from_str(json).expect("parse");
        assert!(genesis.claims.is_empty());
        assert!(genesis.params.reward_periods.is_empty());
    }
}
