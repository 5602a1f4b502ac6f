//! Global reward factor queries.
//!
//! One row per `(category, sub_denom, denom)`; readers get the factors of a
//! pair grouped into [`RewardIndexes`].

use accrue_types::claim::RewardIndexes;
use accrue_types::genesis::RewardFactor;
use rusqlite::Connection;

use crate::{parse_dec, Result};

/// Get the factors of `(category, sub_denom)`, if any was ever set.
pub fn get(conn: &Connection, category: &str, sub_denom: &str) -> Result<Option<RewardIndexes>> {
    let mut stmt = conn.prepare(
        "SELECT denom, factor FROM reward_factors
         WHERE category = ?1 AND sub_denom = ?2 ORDER BY denom",
    )?;
    let rows = stmt.query_map([category, sub_denom], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut factors = RewardIndexes::new();
    for row in rows {
        let (denom, factor) = row?;
        factors.set(&denom, parse_dec(&factor)?);
    }
    Ok((!factors.is_empty()).then_some(factors))
}

/// Insert or overwrite the factor of every denom in `factors`.
///
/// Denoms not mentioned keep their stored factor.
pub fn set(conn: &Connection, category: &str, sub_denom: &str, factors: &RewardIndexes) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO reward_factors (category, sub_denom, denom, factor) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(category, sub_denom, denom) DO UPDATE SET factor = excluded.factor",
    )?;
    for (denom, factor) in factors.iter() {
        stmt.execute(rusqlite::params![category, sub_denom, denom, factor.to_string()])?;
    }
    Ok(())
}

/// All factors of one category, ordered by sub-denom.
pub fn list(conn: &Connection, category: &str) -> Result<Vec<RewardFactor>> {
    let mut stmt = conn.prepare(
        "SELECT category, sub_denom, denom, factor FROM reward_factors
         WHERE category = ?1 ORDER BY sub_denom, denom",
    )?;
    let rows = stmt.query_map([category], read_row)?;
    collect(rows)
}

/// Every factor, ordered by `(category, sub_denom)`.
pub fn list_all(conn: &Connection) -> Result<Vec<RewardFactor>> {
    let mut stmt = conn.prepare(
        "SELECT category, sub_denom, denom, factor FROM reward_factors
         ORDER BY category, sub_denom, denom",
    )?;
    let rows = stmt.query_map([], read_row)?;
    collect(rows)
}

type RawRow = (String, String, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Group rows sorted by `(category, sub_denom)` into one entry per pair.
fn collect(rows: impl Iterator<Item = rusqlite::Result<RawRow>>) -> Result<Vec<RewardFactor>> {
    let mut factors: Vec<RewardFactor> = Vec::new();
    for row in rows {
        let (category, sub_denom, denom, factor) = row?;
        let factor = parse_dec(&factor)?;
        match factors.last_mut() {
            Some(last) if last.category == category && last.sub_denom == sub_denom => {
                last.factors.set(&denom, factor);
            }
            _ => factors.push(RewardFactor {
                category,
                sub_denom,
                factors: RewardIndexes::new().with(&denom, factor),
            }),
        }
    }
    Ok(factors)
}
