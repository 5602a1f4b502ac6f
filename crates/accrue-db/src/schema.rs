//! SQL schema definitions.

/// Complete schema for the v1 database.
///
/// The four engine tables are logically independent per category; every
/// primary key starts with `category` so per-category scans are range scans.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Global reward factors (single writer: block advance)
-- ============================================================

-- One row per reward denom paid for the pair
CREATE TABLE IF NOT EXISTS reward_factors (
    category TEXT NOT NULL,
    sub_denom TEXT NOT NULL,
    denom TEXT NOT NULL,
    factor TEXT NOT NULL,
    PRIMARY KEY (category, sub_denom, denom)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS accrual_times (
    category TEXT NOT NULL,
    sub_denom TEXT NOT NULL,
    accrued_at INTEGER NOT NULL,
    PRIMARY KEY (category, sub_denom)
) WITHOUT ROWID;

-- ============================================================
-- Per-account claims and indexes
-- ============================================================

CREATE TABLE IF NOT EXISTS claims (
    category TEXT NOT NULL,
    owner TEXT NOT NULL,
    -- JSON object {denom: amount}, sorted by denom
    reward TEXT NOT NULL,
    eligible_since INTEGER NOT NULL,
    PRIMARY KEY (category, owner)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS reward_indexes (
    category TEXT NOT NULL,
    owner TEXT NOT NULL,
    sub_denom TEXT NOT NULL,
    denom TEXT NOT NULL,
    factor TEXT NOT NULL,
    PRIMARY KEY (category, owner, sub_denom, denom),
    FOREIGN KEY (category, owner) REFERENCES claims(category, owner) ON DELETE CASCADE
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_claims_owner ON claims(owner, category);
"#;
