//! Claim messages.
//!
//! Messages arrive already authenticated from the surrounding routing layer.
//! [`validate_basic`](MsgClaimReward::validate_basic) only performs the
//! stateless checks that do not need the store.

use serde::{Deserialize, Serialize};

use crate::{validate_id, AccountId, Category, Result, TypesError};

/// Claim the sender's own rewards for one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgClaimReward {
    pub sender: AccountId,
    pub category: Category,
    pub multiplier_name: String,
}

impl MsgClaimReward {
    pub fn new(
        sender: impl Into<AccountId>,
        category: impl Into<Category>,
        multiplier_name: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            category: category.into(),
            multiplier_name: multiplier_name.into(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        validate_id("sender", &self.sender).map_err(TypesError::InvalidMessage)?;
        validate_id("category", &self.category).map_err(TypesError::InvalidMessage)?;
        validate_id("multiplier name", &self.multiplier_name).map_err(TypesError::InvalidMessage)
    }
}

/// Claim the sender's rewards and release them to `receiver`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgClaimRewardOnBehalf {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub category: Category,
    pub multiplier_name: String,
}

impl MsgClaimRewardOnBehalf {
    pub fn new(
        sender: impl Into<AccountId>,
        receiver: impl Into<AccountId>,
        category: impl Into<Category>,
        multiplier_name: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            category: category.into(),
            multiplier_name: multiplier_name.into(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        validate_id("sender", &self.sender).map_err(TypesError::InvalidMessage)?;
        validate_id("receiver", &self.receiver).map_err(TypesError::InvalidMessage)?;
        if self.sender == self.receiver {
            return Err(TypesError::InvalidMessage(
                "receiver must differ from sender; use a plain claim".to_string(),
            ));
        }
        validate_id("category", &self.category).map_err(TypesError::InvalidMessage)?;
        validate_id("multiplier name", &self.multiplier_name).map_err(TypesError::InvalidMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_validate_basic() {
        assert!(MsgClaimReward::new("kava1a", "hard-supply", "large")
            .validate_basic()
            .is_ok());
        assert!(MsgClaimReward::new("", "hard-supply", "large")
            .validate_basic()
            .is_err());
        assert!(MsgClaimReward::new("kava1a", "hard-supply", "")
            .validate_basic()
            .is_err());
    }

    #[test]
    fn test_on_behalf_validate_basic() {
        assert!(
            MsgClaimRewardOnBehalf::new("kava1a", "kava1b", "hard-supply", "large")
                .validate_basic()
                .is_ok()
        );
        assert!(
            MsgClaimRewardOnBehalf::new("kava1a", "kava1a", "hard-supply", "large")
                .validate_basic()
                .is_err()
        );
        assert!(
            MsgClaimRewardOnBehalf::new("kava1a", "", "hard-supply", "large")
                .validate_basic()
                .is_err()
        );
    }
}
