//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the rendezvous tables to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS rendezvous_channel (
    name            TEXT PRIMARY KEY NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rendezvous_message (
    channel         TEXT PRIMARY KEY NOT NULL,
    value           TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channel_created ON rendezvous_channel(created_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
