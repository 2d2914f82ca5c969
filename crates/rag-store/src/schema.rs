use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sources (
            path        TEXT PRIMARY KEY,
            chunk_count INTEGER NOT NULL,
            indexed_at  TEXT NOT NULL
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS passages USING fts5(
            source UNINDEXED,
            chunk_no UNINDEXED,
            content,
            tokenize = 'unicode61 remove_diacritics 2'
        );
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// True when the passage table exists in `conn`.
pub fn is_initialized(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE name = 'passages'",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
