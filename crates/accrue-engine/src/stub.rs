//! In-memory oracle and bank.
//!
//! Used by tests and by the node's scenario replay, where participation is
//! scripted instead of read from a live ledger.

use std::collections::{BTreeMap, BTreeSet};

use accrue_types::coins::Coins;
use accrue_types::{AccountId, Category, SubDenom, TypesError};

use crate::expected::{BankError, BankKeeper, ParticipationOracle};

/// Scripted participation weights.
#[derive(Debug, Clone, Default)]
pub struct StubOracle {
    weights: BTreeMap<(Category, SubDenom), BTreeMap<AccountId, u128>>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight of `account`. A zero weight removes the account.
    pub fn set_weight(&mut self, category: &str, sub_denom: &str, account: &str, weight: u128) {
        let key = (category.to_string(), sub_denom.to_string());
        if weight == 0 {
            if let Some(accounts) = self.weights.get_mut(&key) {
                accounts.remove(account);
                if accounts.is_empty() {
                    self.weights.remove(&key);
                }
            }
            return;
        }
        self.weights
            .entry(key)
            .or_default()
            .insert(account.to_string(), weight);
    }
}

impl ParticipationOracle for StubOracle {
    fn eligible_weight(&self, category: &str, sub_denom: &str, account: &str) -> u128 {
        self.weights
            .get(&(category.to_string(), sub_denom.to_string()))
            .and_then(|accounts| accounts.get(account))
            .copied()
            .unwrap_or(0)
    }

    fn total_eligible_weight(&self, category: &str, sub_denom: &str) -> u128 {
        self.weights
            .get(&(category.to_string(), sub_denom.to_string()))
            .map(|accounts| accounts.values().fold(0u128, |acc, w| acc.saturating_add(*w)))
            .unwrap_or(0)
    }

    fn sub_denoms_of(&self, category: &str, account: &str) -> Vec<SubDenom> {
        self.weights
            .iter()
            .filter(|((c, _), accounts)| c == category && accounts.contains_key(account))
            .map(|((_, sub_denom), _)| sub_denom.clone())
            .collect()
    }

    fn eligible_accounts(&self, category: &str) -> Vec<AccountId> {
        let accounts: BTreeSet<&AccountId> = self
            .weights
            .iter()
            .filter(|((c, _), _)| c == category)
            .flat_map(|(_, accounts)| accounts.keys())
            .collect();
        accounts.into_iter().cloned().collect()
    }
}

/// Balance book with atomic multi-send.
#[derive(Debug, Clone, Default)]
pub struct StubBank {
    balances: BTreeMap<AccountId, Coins>,
    sends: u64,
}

impl StubBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `denom` to `account`.
    pub fn fund(&mut self, account: &str, denom: &str, amount: u128) -> Result<(), TypesError> {
        self.balances
            .entry(account.to_string())
            .or_default()
            .add_amount(denom, amount)
    }

    pub fn balance(&self, account: &str) -> Coins {
        self.balances.get(account).cloned().unwrap_or_default()
    }

    /// Number of successful sends.
    pub fn send_count(&self) -> u64 {
        self.sends
    }

    /// Every non-empty balance, ordered by account.
    pub fn balances(&self) -> &BTreeMap<AccountId, Coins> {
        &self.balances
    }
}

impl BankKeeper for StubBank {
    fn send(&mut self, from: &str, outputs: &[(AccountId, Coins)]) -> Result<(), BankError> {
        let mut needed = Coins::new();
        for (_, amount) in outputs {
            needed = needed
                .checked_add(amount)
                .map_err(|e| BankError::Rejected(e.to_string()))?;
        }

        let held = self.balance(from);
        let remaining = held
            .checked_sub(&needed)
            .map_err(|_| BankError::InsufficientFunds {
                account: from.to_string(),
                needed: needed.clone(),
                held: held.clone(),
            })?;

        let mut credited = self.balances.clone();
        credited.insert(from.to_string(), remaining);
        for (to, amount) in outputs {
            let balance = credited.entry(to.clone()).or_default();
            *balance = balance
                .checked_add(amount)
                .map_err(|e| BankError::Rejected(e.to_string()))?;
        }
        credited.retain(|_, coins| !coins.is_empty());

        self.balances = credited;
        self.sends += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_types::coins::Coin;

    fn hard(amount: u128) -> Coins {
        Coins::from_coin(Coin::new("hard", amount))
    }

    #[test]
    fn test_oracle_weights() {
        let mut oracle = StubOracle::new();
        oracle.set_weight("hard-supply", "bnb", "kava1b", 3);
        oracle.set_weight("hard-supply", "bnb", "kava1a", 1);
        oracle.set_weight("hard-supply", "btcb", "kava1a", 5);
        oracle.set_weight("delegator", "ukava", "kava1c", 9);

        assert_eq!(oracle.eligible_weight("hard-supply", "bnb", "kava1b"), 3);
        assert_eq!(oracle.total_eligible_weight("hard-supply", "bnb"), 4);
        assert_eq!(oracle.sub_denoms_of("hard-supply", "kava1a"), vec!["bnb", "btcb"]);
        assert_eq!(oracle.eligible_accounts("hard-supply"), vec!["kava1a", "kava1b"]);

        oracle.set_weight("hard-supply", "bnb", "kava1b", 0);
        assert_eq!(oracle.total_eligible_weight("hard-supply", "bnb"), 1);
        assert_eq!(oracle.eligible_weight("hard-supply", "bnb", "kava1b"), 0);
    }

    #[test]
    fn test_bank_multi_send() {
        let mut bank = StubBank::new();
        bank.fund("incentive", "hard", 100).expect("fund");
        bank.send(
            "incentive",
            &[("kava1a".to_string(), hard(60)), ("community".to_string(), hard(40))],
        )
        .expect("send");
        assert_eq!(bank.balance("kava1a"), hard(60));
        assert_eq!(bank.balance("community"), hard(40));
        assert!(bank.balance("incentive").is_empty());
        assert_eq!(bank.send_count(), 1);
    }

    #[test]
    fn test_bank_send_is_all_or_nothing() {
        let mut bank = StubBank::new();
        bank.fund("incentive", "hard", 50).expect("fund");
        let result = bank.send(
            "incentive",
            &[("kava1a".to_string(), hard(40)), ("community".to_string(), hard(40))],
        );
        assert!(matches!(result, Err(BankError::InsufficientFunds { .. })));
        assert_eq!(bank.balance("incentive"), hard(50));
        assert!(bank.balance("kava1a").is_empty());
        assert_eq!(bank.send_count(), 0);
    }
}
