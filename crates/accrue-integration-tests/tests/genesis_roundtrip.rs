//! Integration test: export, re-import and continue.
//!
//! A chain restarted from an exported genesis must end in the same state as
//! one that never stopped.

use accrue_engine::genesis::init_genesis;
use accrue_engine::stub::{StubBank, StubOracle};
use accrue_engine::Keeper;
use accrue_types::coins::{Coin, Coins};
use accrue_types::genesis::GenesisState;
use accrue_types::params::{Params, RewardPeriod};

const CATEGORY: &str = "hard-supply";

fn params() -> Params {
    let period = |sub_denom: &str, rate: u128| RewardPeriod {
        category: CATEGORY.to_string(),
        sub_denom: sub_denom.to_string(),
        start: 0,
        end: 1_000,
        rewards_per_second: Coins::from_coin(Coin::new("hard", rate)),
    };
    Params {
        reward_periods: vec![period("bnb", 13), period("btcb", 29)],
        multipliers: Vec::new(),
        claim_end: 1_000,
        payout_account: "incentive".to_string(),
        reserve_account: "community".to_string(),
    }
}

fn oracle() -> StubOracle {
    let mut oracle = StubOracle::new();
    oracle.set_weight(CATEGORY, "bnb", "kava1a", 4);
    oracle.set_weight(CATEGORY, "bnb", "kava1b", 9);
    oracle.set_weight(CATEGORY, "btcb", "kava1b", 2);
    oracle
}

fn run_blocks(
    keeper: &mut Keeper<StubOracle, StubBank>,
    conn: &mut rusqlite::Connection,
    times: &[u64],
) {
    for &now in times {
        keeper.begin_block(conn, now).expect("block");
        keeper.synchronize(conn, "kava1a", CATEGORY, now).expect("sync");
    }
}

#[test]
fn restart_from_export_matches_uninterrupted_run() {
    let first_half = [0u64, 10, 25];
    let second_half = [40u64, 77];

    // Uninterrupted.
    let mut keeper = Keeper::new(params(), oracle(), StubBank::new()).expect("keeper");
    let mut conn = accrue_db::open_memory().expect("open DB");
    run_blocks(&mut keeper, &mut conn, &first_half);
    let exported = keeper.export_genesis(&conn).expect("export");
    run_blocks(&mut keeper, &mut conn, &second_half);
    keeper.sync_all(&mut conn, CATEGORY, 77).expect("sweep");
    let expected = keeper.export_genesis(&conn).expect("export");

    // Restarted from JSON.
    let json = serde_json::to_string_pretty(&exported).expect("serialize");
    let imported: GenesisState = serde_json::from_str(&json).expect("parse");
    assert_eq!(imported, exported);

    let mut restarted = Keeper::new(imported.params.clone(), oracle(), StubBank::new())
        .expect("keeper");
    let mut fresh = accrue_db::open_memory().expect("open DB");
    init_genesis(&mut fresh, &imported).expect("import");
    run_blocks(&mut restarted, &mut fresh, &second_half);
    restarted.sync_all(&mut fresh, CATEGORY, 77).expect("sweep");
    let actual = restarted.export_genesis(&fresh).expect("export");

    assert_eq!(actual, expected);
    assert_eq!(actual.claims.len(), 2);
    assert_eq!(actual.accrual_times.len(), 2);
}

#[test]
fn export_is_sorted_and_stable() {
    let mut keeper = Keeper::new(params(), oracle(), StubBank::new()).expect("keeper");
    let mut conn = accrue_db::open_memory().expect("open DB");
    keeper.sync_all(&mut conn, CATEGORY, 0).expect("sweep");
    keeper.sync_all(&mut conn, CATEGORY, 5).expect("sweep");

    let a = serde_json::to_string(&keeper.export_genesis(&conn).expect("export"))
        .expect("serialize");
    let b = serde_json::to_string(&keeper.export_genesis(&conn).expect("export"))
        .expect("serialize");
    assert_eq!(a, b);

    let genesis = keeper.export_genesis(&conn).expect("export");
    let owners: Vec<&str> = genesis.claims.iter().map(|c| c.owner.as_str()).collect();
    assert_eq!(owners, vec!["kava1a", "kava1b"]);
    let subs: Vec<&str> = genesis
        .reward_factors
        .iter()
        .map(|f| f.sub_denom.as_str())
        .collect();
    assert_eq!(subs, vec!["bnb", "btcb"]);
}
