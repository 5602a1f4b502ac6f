//! Accrual time queries.

use accrue_types::genesis::AccrualTime;
use accrue_types::Timestamp;
use rusqlite::{Connection, OptionalExtension};

use crate::{from_timestamp, to_timestamp, Result};

/// Get the last accrual instant of `(category, sub_denom)`.
pub fn get(conn: &Connection, category: &str, sub_denom: &str) -> Result<Option<Timestamp>> {
    let raw: Option<i64> = conn
        .query_row(
            "SELECT accrued_at FROM accrual_times WHERE category = ?1 AND sub_denom = ?2",
            [category, sub_denom],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(to_timestamp).transpose()
}

/// Insert or overwrite an accrual time.
pub fn set(conn: &Connection, category: &str, sub_denom: &str, accrued_at: Timestamp) -> Result<()> {
    conn.execute(
        "INSERT INTO accrual_times (category, sub_denom, accrued_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(category, sub_denom) DO UPDATE SET accrued_at = excluded.accrued_at",
        rusqlite::params![category, sub_denom, from_timestamp(accrued_at)?],
    )?;
    Ok(())
}

/// Accrual times of one category, ordered by sub-denom.
pub fn list(conn: &Connection, category: &str) -> Result<Vec<AccrualTime>> {
    let mut stmt = conn.prepare(
        "SELECT category, sub_denom, accrued_at FROM accrual_times
         WHERE category = ?1 ORDER BY sub_denom",
    )?;
    let rows = stmt.query_map([category], read_row)?;
    collect(rows)
}

/// Every accrual time, ordered by `(category, sub_denom)`.
pub fn list_all(conn: &Connection) -> Result<Vec<AccrualTime>> {
    let mut stmt = conn.prepare(
        "SELECT category, sub_denom, accrued_at FROM accrual_times ORDER BY category, sub_denom",
    )?;
    let rows = stmt.query_map([], read_row)?;
    collect(rows)
}

type RawRow = (String, String, i64);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn collect(rows: impl Iterator<Item = rusqlite::Result<RawRow>>) -> Result<Vec<AccrualTime>> {
    let mut times = Vec::new();
    for row in rows {
        let (category, sub_denom, accrued_at) = row?;
        times.push(AccrualTime {
            category,
            sub_denom,
            timestamp: to_timestamp(accrued_at)?,
        });
    }
    Ok(times)
}
