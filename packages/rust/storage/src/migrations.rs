//! SQL migration definitions for the MapSweep database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: runs, businesses",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per sweep
CREATE TABLE IF NOT EXISTS runs (
    id          TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    center_lat  REAL NOT NULL,
    center_lng  REAL NOT NULL,
    radius      REAL NOT NULL,
    unit        TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

-- Deduplicated businesses, keyed by the hash of their identity key
CREATE TABLE IF NOT EXISTS businesses (
    key_hash      TEXT PRIMARY KEY,
    identity_key  TEXT NOT NULL,
    name          TEXT NOT NULL,
    address       TEXT NOT NULL,
    rating        REAL,
    review_count  INTEGER,
    phone         TEXT,
    website       TEXT,
    services_json TEXT NOT NULL DEFAULT '[]',
    reviews_json  TEXT NOT NULL DEFAULT '[]',
    run_id        TEXT REFERENCES runs(id),
    first_seen_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_businesses_run_id ON businesses(run_id);
CREATE INDEX IF NOT EXISTS idx_businesses_name ON businesses(name);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
