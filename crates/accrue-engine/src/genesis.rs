//! Genesis import and export.
//!
//! Genesis is the only point where factors, accrual times and claims are
//! written wholesale. Import requires an empty store; export reads every
//! table in key order, so exporting twice from the same store yields
//! identical JSON.

use accrue_db::queries::{accrual_times, claims, factors};
use accrue_types::genesis::GenesisState;
use accrue_types::TypesError;
use rusqlite::Connection;

use crate::expected::{BankKeeper, ParticipationOracle};
use crate::{Keeper, Result};

/// Write a validated genesis state into an empty store.
///
/// # Errors
///
/// - [`crate::KeeperError::Types`] if the state fails validation or the store
///   already holds engine state
pub fn init_genesis(conn: &mut Connection, genesis: &GenesisState) -> Result<()> {
    genesis.validate()?;

    let tx = conn.transaction()?;
    let populated = !factors::list_all(&tx)?.is_empty()
        || !accrual_times::list_all(&tx)?.is_empty()
        || !claims::list_all(&tx)?.is_empty();
    if populated {
        return Err(TypesError::InvalidGenesis("store already initialized".to_string()).into());
    }

    for at in &genesis.accrual_times {
        accrual_times::set(&tx, &at.category, &at.sub_denom, at.timestamp)?;
    }
    for rf in &genesis.reward_factors {
        factors::set(&tx, &rf.category, &rf.sub_denom, &rf.factors)?;
    }
    for claim in &genesis.claims {
        claims::set(&tx, claim)?;
    }
    tx.commit()?;

    tracing::info!(
        accrual_times = genesis.accrual_times.len(),
        reward_factors = genesis.reward_factors.len(),
        claims = genesis.claims.len(),
        "genesis imported"
    );
    Ok(())
}

impl<O: ParticipationOracle, B: BankKeeper> Keeper<O, B> {
    /// Snapshot params and the whole store.
    pub fn export_genesis(&self, conn: &Connection) -> Result<GenesisState> {
        let genesis = GenesisState {
            params: self.params.clone(),
            accrual_times: accrual_times::list_all(conn)?,
            reward_factors: factors::list_all(conn)?,
            claims: claims::list_all(conn)?,
        };
        tracing::info!(claims = genesis.claims.len(), "genesis exported");
        Ok(genesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use crate::KeeperError;
    use accrue_types::claim::Claim;

    #[test]
    fn test_export_import_preserves_state() {
        let mut keeper = keeper(vec![period("bnb", 0, 100, 10)]);
        let mut conn = db();
        keeper.oracle_mut().set_weight(CATEGORY, "bnb", "kava1a", 2);
        keeper
            .synchronize(&mut conn, "kava1a", CATEGORY, 0)
            .expect("sync");
        keeper
            .synchronize(&mut conn, "kava1a", CATEGORY, 3)
            .expect("sync");

        let exported = keeper.export_genesis(&conn).expect("export");
        assert_eq!(exported.claims.len(), 1);
        assert_eq!(exported.claims[0].reward.amount_of("hard"), 30);

        let json = serde_json::to_string(&exported).expect("serialize");
        let parsed: GenesisState = serde_json::from_str(&json).expect("parse");

        let mut fresh = db();
        init_genesis(&mut fresh, &parsed).expect("import");
        let reexported = keeper.export_genesis(&fresh).expect("export");
        assert_eq!(reexported, exported);
    }

    #[test]
    fn test_import_into_populated_store_rejected() {
        let mut conn = db();
        let mut genesis = GenesisState::new(params(vec![period("bnb", 0, 100, 10)]));
        genesis.claims.push(Claim::new("kava1a", CATEGORY, 0));
        init_genesis(&mut conn, &genesis).expect("import");

        let err = init_genesis(&mut conn, &genesis).expect_err("second import");
        assert!(matches!(err, KeeperError::Types(TypesError::InvalidGenesis(_))));
    }

    #[test]
    fn test_invalid_genesis_writes_nothing() {
        let mut conn = db();
        let mut genesis = GenesisState::new(params(vec![]));
        genesis.claims.push(Claim::new("kava1a", CATEGORY, 0));
        genesis.claims.push(Claim::new("kava1a", CATEGORY, 1));
        assert!(init_genesis(&mut conn, &genesis).is_err());
        assert!(claims::list_all(&conn).expect("list").is_empty());
    }
}
