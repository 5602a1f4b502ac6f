//! Claim queries.
//!
//! A [`Claim`] is spread over two tables: the balance row in `claims` and
//! one row per `(sub_denom, denom)` in `reward_indexes`. These functions read and write
//! both halves together.

use std::collections::BTreeMap;

use accrue_types::claim::{Claim, MultiRewardIndexes};
use accrue_types::coins::Coins;
use accrue_types::{AccountId, Category};
use rusqlite::{Connection, OptionalExtension};

use crate::queries::indexes;
use crate::{from_timestamp, to_timestamp, DbError, Result};

/// Get the claim of `owner` in `category`.
pub fn get(conn: &Connection, category: &str, owner: &str) -> Result<Option<Claim>> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT reward, eligible_since FROM claims WHERE category = ?1 AND owner = ?2",
            [category, owner],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((reward, eligible_since)) = row else {
        return Ok(None);
    };
    Ok(Some(Claim {
        owner: owner.to_string(),
        category: category.to_string(),
        reward: decode_reward(&reward)?,
        indexes: indexes::list_for(conn, category, owner)?,
        eligible_since: to_timestamp(eligible_since)?,
    }))
}

/// Whether `owner` has a claim in `category`.
pub fn exists(conn: &Connection, category: &str, owner: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM claims WHERE category = ?1 AND owner = ?2",
            [category, owner],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert or overwrite a claim together with its indexes.
pub fn set(conn: &Connection, claim: &Claim) -> Result<()> {
    conn.execute(
        "INSERT INTO claims (category, owner, reward, eligible_since) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(category, owner) DO UPDATE
         SET reward = excluded.reward, eligible_since = excluded.eligible_since",
        rusqlite::params![
            claim.category,
            claim.owner,
            encode_reward(&claim.reward)?,
            from_timestamp(claim.eligible_since)?,
        ],
    )?;
    indexes::replace_for(conn, &claim.category, &claim.owner, &claim.indexes)
}

/// Delete a claim and its indexes.
///
/// # Errors
///
/// - [`DbError::NotFound`] if no such claim exists
pub fn delete(conn: &Connection, category: &str, owner: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM claims WHERE category = ?1 AND owner = ?2",
        [category, owner],
    )?;
    if deleted == 0 {
        return Err(DbError::NotFound(format!("claim {category}/{owner}")));
    }
    Ok(())
}

/// All claims of one category, ordered by owner.
pub fn list(conn: &Connection, category: &str) -> Result<Vec<Claim>> {
    let mut stmt = conn.prepare(
        "SELECT category, owner, reward, eligible_since FROM claims
         WHERE category = ?1 ORDER BY owner",
    )?;
    let rows = stmt.query_map([category], read_row)?;

    let mut grouped: BTreeMap<AccountId, MultiRewardIndexes> = BTreeMap::new();
    for (owner, entry) in indexes::list_category(conn, category)? {
        grouped
            .entry(owner)
            .or_default()
            .set(&entry.sub_denom, entry.indexes);
    }

    let mut claims = Vec::new();
    for row in rows {
        let mut claim = assemble(row?)?;
        claim.indexes = grouped.remove(&claim.owner).unwrap_or_default();
        claims.push(claim);
    }
    Ok(claims)
}

/// Every claim, ordered by `(category, owner)`.
pub fn list_all(conn: &Connection) -> Result<Vec<Claim>> {
    let mut claims = Vec::new();
    for category in categories(conn)? {
        claims.extend(list(conn, &category)?);
    }
    Ok(claims)
}

/// Every claim held by `owner`, ordered by category.
pub fn list_by_owner(conn: &Connection, owner: &str) -> Result<Vec<Claim>> {
    let mut stmt = conn.prepare(
        "SELECT category, owner, reward, eligible_since FROM claims
         WHERE owner = ?1 ORDER BY category",
    )?;
    let rows = stmt.query_map([owner], read_row)?;

    let mut claims = Vec::new();
    for row in rows {
        let mut claim = assemble(row?)?;
        claim.indexes = indexes::list_for(conn, &claim.category, owner)?;
        claims.push(claim);
    }
    Ok(claims)
}

/// Distinct categories holding at least one claim, sorted.
pub fn categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT DISTINCT category FROM claims ORDER BY category")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut categories = Vec::new();
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

type RawRow = (String, String, String, i64);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn assemble((category, owner, reward, eligible_since): RawRow) -> Result<Claim> {
    Ok(Claim {
        owner,
        category,
        reward: decode_reward(&reward)?,
        indexes: MultiRewardIndexes::new(),
        eligible_since: to_timestamp(eligible_since)?,
    })
}

fn encode_reward(reward: &Coins) -> Result<String> {
    serde_json::to_string(reward).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode_reward(raw: &str) -> Result<Coins> {
    serde_json::from_str(raw).map_err(|e| DbError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_types::claim::RewardIndexes;
    use accrue_types::coins::Coin;
    use accrue_types::dec::Dec;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn d(s: &str) -> Dec {
        s.parse().expect("dec")
    }

    fn claim(owner: &str, category: &str, amount: u128) -> Claim {
        let mut claim = Claim::new(owner, category, 100);
        claim.reward = Coins::from_coin(Coin::new("hard", amount));
        claim.reward.add_amount("ukava", 3).expect("add");
        claim
            .indexes
            .set("bnb", RewardIndexes::new().with("hard", d("0.1")));
        claim.indexes.set(
            "btcb",
            RewardIndexes::new()
                .with("hard", d("0.2"))
                .with("ukava", d("0.4")),
        );
        claim
    }

    #[test]
    fn test_get_set_delete() {
        let conn = test_db();
        let c = claim("kava1a", "hard-supply", 1_000_000);

        assert!(get(&conn, "hard-supply", "kava1a").expect("get").is_none());
        set(&conn, &c).expect("set");
        assert_eq!(get(&conn, "hard-supply", "kava1a").expect("get"), Some(c));
        assert!(exists(&conn, "hard-supply", "kava1a").expect("exists"));

        delete(&conn, "hard-supply", "kava1a").expect("delete");
        assert!(get(&conn, "hard-supply", "kava1a").expect("get").is_none());
        let orphaned: i64 = conn
            .query_row("SELECT COUNT(*) FROM reward_indexes", [], |row| row.get(0))
            .expect("count");
        assert_eq!(orphaned, 0);
    }

    #[test]
    fn test_delete_missing() {
        let conn = test_db();
        let result = delete(&conn, "hard-supply", "kava1a");
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_set_overwrites_indexes() {
        let conn = test_db();
        let mut c = claim("kava1a", "hard-supply", 5);
        set(&conn, &c).expect("set");

        c.indexes.remove("btcb");
        c.reward = Coins::new();
        set(&conn, &c).expect("overwrite");

        let stored = get(&conn, "hard-supply", "kava1a").expect("get").expect("claim exists");
        assert_eq!(stored.indexes.len(), 1);
        assert!(stored.is_paid());
    }

    #[test]
    fn test_list_ordered_by_owner() {
        let conn = test_db();
        for owner in ["kava1c", "kava1a", "kava1b"] {
            set(&conn, &claim(owner, "hard-supply", 100_000)).expect("set");
        }
        set(&conn, &claim("kava1a", "delegator", 7)).expect("set");

        let listed = list(&conn, "hard-supply").expect("list");
        let owners: Vec<&str> = listed.iter().map(|c| c.owner.as_str()).collect();
        assert_eq!(owners, vec!["kava1a", "kava1b", "kava1c"]);
        assert!(listed.iter().all(|c| c.indexes.len() == 2));

        let all = list_all(&conn).expect("list all");
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].category, "delegator");

        let owned = list_by_owner(&conn, "kava1a").expect("by owner");
        let categories: Vec<&str> = owned.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["delegator", "hard-supply"]);
    }
}
