//! SQL migration definitions for the ListingForge database.
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
        description: "Initial schema: append-only optimizations log",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per successful optimization run. List columns hold JSON arrays.
CREATE TABLE IF NOT EXISTS optimizations (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    asin                  TEXT NOT NULL CHECK (length(asin) <= 10),
    original_title        TEXT NOT NULL,
    original_bullets      TEXT NOT NULL,
    original_description  TEXT NOT NULL,
    optimized_title       TEXT NOT NULL,
    optimized_bullets     TEXT NOT NULL,
    optimized_description TEXT NOT NULL,
    suggested_keywords    TEXT NOT NULL,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_optimizations_asin ON optimizations(asin);
CREATE INDEX IF NOT EXISTS idx_optimizations_created_at ON optimizations(created_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
