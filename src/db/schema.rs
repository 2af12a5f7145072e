//! Local cache schema and migrations

use crate::{db::DbConn, Result};

/// Current schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize or migrate the schema
pub(crate) fn init(conn: &DbConn) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS custom_questions (
            user_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            text TEXT NOT NULL,
            category TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, question_id)
        );

        CREATE TABLE IF NOT EXISTS answers (
            user_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            answer TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, question_id)
        );

        -- Tombstones keep deleted questions from being resurrected by a
        -- later sync against stale remote data
        CREATE TABLE IF NOT EXISTS deleted_questions (
            user_id TEXT NOT NULL,
            question_id TEXT NOT NULL,
            deleted_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, question_id)
        );",
    )?;

    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
