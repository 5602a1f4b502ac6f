//! Per-account reward index queries.
//!
//! Indexes hang off their claim row; deleting a claim cascades to its
//! indexes. One row per `(owner, sub_denom, denom)`.

use accrue_types::claim::{MultiRewardIndex, MultiRewardIndexes, RewardIndexes};
use accrue_types::AccountId;
use rusqlite::Connection;

use crate::{parse_dec, Result};

/// Get the stored indexes of one sub-denom.
pub fn get(
    conn: &Connection,
    category: &str,
    owner: &str,
    sub_denom: &str,
) -> Result<Option<RewardIndexes>> {
    let mut stmt = conn.prepare(
        "SELECT denom, factor FROM reward_indexes
         WHERE category = ?1 AND owner = ?2 AND sub_denom = ?3 ORDER BY denom",
    )?;
    let rows = stmt.query_map([category, owner, sub_denom], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut indexes = RewardIndexes::new();
    for row in rows {
        let (denom, factor) = row?;
        indexes.set(&denom, parse_dec(&factor)?);
    }
    Ok((!indexes.is_empty()).then_some(indexes))
}

/// Insert or overwrite the indexes of one sub-denom. The owning claim row
/// must exist.
pub fn set(conn: &Connection, category: &str, owner: &str, entry: &MultiRewardIndex) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO reward_indexes (category, owner, sub_denom, denom, factor)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(category, owner, sub_denom, denom) DO UPDATE SET factor = excluded.factor",
    )?;
    for (denom, factor) in entry.indexes.iter() {
        stmt.execute(rusqlite::params![
            category,
            owner,
            entry.sub_denom,
            denom,
            factor.to_string()
        ])?;
    }
    Ok(())
}

/// All indexes of one account in one category.
pub fn list_for(conn: &Connection, category: &str, owner: &str) -> Result<MultiRewardIndexes> {
    let mut stmt = conn.prepare(
        "SELECT owner, sub_denom, denom, factor FROM reward_indexes
         WHERE category = ?1 AND owner = ?2 ORDER BY sub_denom, denom",
    )?;
    let rows = stmt.query_map([category, owner], read_row)?;

    let mut indexes = MultiRewardIndexes::new();
    for (_, entry) in group(rows)? {
        indexes.set(&entry.sub_denom, entry.indexes);
    }
    Ok(indexes)
}

/// Replace every index of one account in one category.
pub fn replace_for(
    conn: &Connection,
    category: &str,
    owner: &str,
    indexes: &MultiRewardIndexes,
) -> Result<()> {
    conn.execute(
        "DELETE FROM reward_indexes WHERE category = ?1 AND owner = ?2",
        [category, owner],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO reward_indexes (category, owner, sub_denom, denom, factor)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (sub_denom, per_denom) in indexes.iter() {
        for (denom, factor) in per_denom.iter() {
            stmt.execute(rusqlite::params![
                category,
                owner,
                sub_denom,
                denom,
                factor.to_string()
            ])?;
        }
    }
    Ok(())
}

/// Every index of a category as `(owner, entry)`, ordered by `(owner, sub_denom)`.
pub fn list_category(
    conn: &Connection,
    category: &str,
) -> Result<Vec<(AccountId, MultiRewardIndex)>> {
    let mut stmt = conn.prepare(
        "SELECT owner, sub_denom, denom, factor FROM reward_indexes
         WHERE category = ?1 ORDER BY owner, sub_denom, denom",
    )?;
    let rows = stmt.query_map([category], read_row)?;
    group(rows)
}

type RawRow = (String, String, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Fold rows sorted by `(owner, sub_denom)` into one entry per pair.
fn group(
    rows: impl Iterator<Item = rusqlite::Result<RawRow>>,
) -> Result<Vec<(AccountId, MultiRewardIndex)>> {
    let mut entries: Vec<(AccountId, MultiRewardIndex)> = Vec::new();
    for row in rows {
        let (owner, sub_denom, denom, factor) = row?;
        let factor = parse_dec(&factor)?;
        match entries.last_mut() {
            Some((last_owner, last)) if *last_owner == owner && last.sub_denom == sub_denom => {
                last.indexes.set(&denom, factor);
            }
            _ => entries.push((
                owner,
                MultiRewardIndex {
                    sub_denom,
                    indexes: RewardIndexes::new().with(&denom, factor),
                },
            )),
        }
    }
    Ok(entries)
}
