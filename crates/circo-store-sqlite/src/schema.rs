//! SQL schema for the Circo SQLite store.
//!
//! Applied at connection startup and stamped with `PRAGMA user_version`.

pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Current per-source collections. School-keyed categories use the school
-- code as record_key; the others use the zero-padded input position.
CREATE TABLE IF NOT EXISTS records (
    category     TEXT NOT NULL,
    record_key   TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    PRIMARY KEY (category, record_key)
);

-- One immutable snapshot per school year. Rows are inserted or deleted,
-- never updated.
CREATE TABLE IF NOT EXISTS archives (
    school_year    INTEGER PRIMARY KEY,  -- starting calendar year
    snapshot_id    TEXT NOT NULL UNIQUE,
    created_at     TEXT NOT NULL,        -- RFC 3339 UTC
    schema_version INTEGER NOT NULL,
    digest         TEXT NOT NULL,        -- sha256 hex of the computed section
    summary_json   TEXT NOT NULL,
    snapshot_json  TEXT NOT NULL
);

-- Roll-over state; at most one row.
CREATE TABLE IF NOT EXISTS district_state (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    state_json TEXT NOT NULL
);

PRAGMA user_version = 1;
";
