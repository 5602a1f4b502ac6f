//! Coin amounts.
//!
//! [`Coins`] is a sorted, zero-free multiset of denominations. Sorting comes
//! from the backing `BTreeMap`, so iteration and serialization are
//! deterministic across nodes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dec::Dec;
use crate::{validate_id, Result, TypesError};

/// A single denomination and amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    /// Create a coin.
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Validate the denomination.
    pub fn validate(&self) -> Result<()> {
        validate_id("denom", &self.denom).map_err(TypesError::InvalidCoins)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Multi-denomination amount. Never stores zero entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u128>", into = "BTreeMap<String, u128>")]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    /// Empty amount.
    pub fn new() -> Self {
        Self::default()
    }

    /// An amount holding a single coin (empty if the coin is zero).
    pub fn from_coin(coin: Coin) -> Self {
        let mut coins = Self::new();
        if coin.amount > 0 {
            coins.0.insert(coin.denom, coin.amount);
        }
        coins
    }

    /// Whether no denomination has a positive amount.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Amount held of `denom`, zero if absent.
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    /// Iterate `(denom, amount)` in denom order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> {
        self.0.iter().map(|(denom, amount)| (denom.as_str(), *amount))
    }

    /// Add `amount` of `denom` in place.
    pub fn add_amount(&mut self, denom: &str, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.0.entry(denom.to_string()).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(TypesError::Overflow)?;
        Ok(())
    }

    /// Checked sum of two amounts.
    pub fn checked_add(&self, other: &Coins) -> Result<Coins> {
        let mut sum = self.clone();
        for (denom, amount) in other.iter() {
            sum.add_amount(denom, amount)?;
        }
        Ok(sum)
    }

    /// Checked difference.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Underflow`] if any denomination of `other` exceeds `self`
    pub fn checked_sub(&self, other: &Coins) -> Result<Coins> {
        let mut diff = self.clone();
        for (denom, amount) in other.iter() {
            let held = diff.amount_of(denom);
            let left = held.checked_sub(amount).ok_or(TypesError::Underflow)?;
            if left == 0 {
                diff.0.remove(denom);
            } else {
                diff.0.insert(denom.to_string(), left);
            }
        }
        Ok(diff)
    }

    /// Scale every denomination by `fraction`, truncating each amount.
    pub fn mul_dec_floor(&self, fraction: Dec) -> Result<Coins> {
        let mut scaled = Coins::new();
        for (denom, amount) in self.iter() {
            scaled.add_amount(denom, fraction.mul_int_floor(amount)?)?;
        }
        Ok(scaled)
    }

    /// Whether every denomination held by `other` is held in at least that amount.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|(denom, amount)| self.amount_of(denom) >= amount)
    }
}

impl TryFrom<BTreeMap<String, u128>> for Coins {
    type Error = TypesError;

    fn try_from(map: BTreeMap<String, u128>) -> Result<Self> {
        for (denom, amount) in &map {
            validate_id("denom", denom).map_err(TypesError::InvalidCoins)?;
            if *amount == 0 {
                return Err(TypesError::InvalidCoins(format!(
                    "zero amount for denom '{denom}'"
                )));
            }
        }
        Ok(Coins(map))
    }
}

impl From<Coins> for BTreeMap<String, u128> {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(denom, amount)| format!("{amount}{denom}"))
            .collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(pairs: &[(&str, u128)]) -> Coins {
        let mut coins = Coins::new();
        for (denom, amount) in pairs {
            coins.add_amount(denom, *amount).expect("add");
        }
        coins
    }

    #[test]
    fn test_zero_amounts_not_stored() {
        let coins = Coins::from_coin(Coin::new("hard", 0));
        assert!(coins.is_empty());

        let mut coins = Coins::new();
        coins.add_amount("hard", 0).expect("add zero");
        assert!(coins.is_empty());
    }

    #[test]
    fn test_add_and_sub() {
        let a = cs(&[("hard", 10), ("ukava", 5)]);
        let b = cs(&[("hard", 10)]);
        let sum = a.checked_add(&b).expect("add");
        assert_eq!(sum.amount_of("hard"), 20);

        let diff = a.checked_sub(&b).expect("sub");
        assert_eq!(diff, cs(&[("ukava", 5)]));
        assert_eq!(diff.amount_of("hard"), 0);
    }

    #[test]
    fn test_sub_underflow() {
        let a = cs(&[("hard", 1)]);
        let b = cs(&[("hard", 2)]);
        assert_eq!(a.checked_sub(&b), Err(TypesError::Underflow));
        assert_eq!(Coins::new().checked_sub(&b), Err(TypesError::Underflow));
    }

    #[test]
    fn test_mul_dec_floor() {
        let coins = cs(&[("hard", 1001), ("ukava", 1)]);
        let half: Dec = "0.5".parse().expect("dec");
        assert_eq!(coins.mul_dec_floor(half).expect("mul"), cs(&[("hard", 500)]));
    }

    #[test]
    fn test_display_sorted() {
        let coins = cs(&[("ukava", 5), ("hard", 10)]);
        assert_eq!(coins.to_string(), "10hard,5ukava");
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Coins>(r#"{"hard":0}"#).is_err());
        let coins: Coins = serde_json::from_str(r#"{"hard":7}"#).expect("parse");
        assert_eq!(coins.amount_of("hard"), 7);
    }
}
