//! Schema upgrades for the SQLite entry store.
//!
//! `_schema_versions` records every applied [`Migration`]. Opening a database
//! written by a newer build is refused rather than silently downgraded.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;
use super::entry::now_rfc3339;

/// One schema step. Versions are strictly increasing.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, name: "entries", sql: include_str!("../../migrations/001_entries.sql") }];

fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _schema_versions (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _schema_versions", [], |row| row.get(0))?)
}

/// Apply `migration` and record it in one transaction.
fn apply(conn: &mut rusqlite::Connection, migration: &Migration) -> Result<(), Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)
        .map_err(|e| Error::MigrationFailed(format!("{} (v{}): {e}", migration.name, migration.version)))?;
    tx.execute(
        "INSERT INTO _schema_versions (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![migration.version, migration.name, now_rfc3339()],
    )?;
    tx.commit()?;
    tracing::debug!(version = migration.version, name = migration.name, "applied cache schema migration");
    Ok(())
}

/// Bring the schema up to date. Returns how many migrations were applied.
pub async fn run(conn: &Connection) -> Result<usize, Error> {
    conn.call(|conn| -> Result<usize, Error> {
        let current = schema_version(conn)?;
        if current > latest_version() {
            return Err(Error::MigrationFailed(format!(
                "cache schema v{current} is newer than this build supports (v{})",
                latest_version()
            )));
        }

        let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
        for migration in &pending {
            apply(conn, migration)?;
        }
        Ok(pending.len())
    })
    .await
    .map_err(Error::from)
}
