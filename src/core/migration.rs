//! Versioned schema migrations.
//!
//! The schema is an ordered list of [`Migration`] descriptors. The highest
//! applied version is recorded in SQLite's `PRAGMA user_version`.
//!
//! - **Additive only**: migrations create tables and indexes, they never
//!   rename, alter or drop.
//! - **Idempotent**: every statement is `IF NOT EXISTS`, so a database built
//!   by an older bootstrap script (`user_version = 0`) upgrades cleanly.
//! - **Atomic**: pending migrations and the version bump share one
//!   transaction; a failing statement leaves the database untouched.

use crate::core::config::TableNames;
use crate::core::error::SchemaError;
use crate::core::schemas;
use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

/// Crate version from Cargo.toml
pub const SENSAI_DB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Migration definition
pub struct Migration {
    /// Schema version this migration brings the database to.
    pub version: u32,
    /// Human-readable description
    pub description: &'static str,
    /// Migration function
    pub up: fn(&Transaction<'_>, &TableNames) -> rusqlite::Result<()>,
}

/// Outcome of one applied migration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AppliedMigration {
    pub version: u32,
    pub description: String,
}

/// All migrations in version order.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Create core learning-platform tables",
            up: migrate_create_tables,
        },
        Migration {
            version: 2,
            description: "Add lookup indexes on child-table foreign keys",
            up: migrate_add_fk_indexes,
        },
    ]
}

pub fn latest_version() -> u32 {
    all_migrations()
        .iter()
        .map(|m| m.version)
        .max()
        .unwrap_or(0)
}

pub fn read_user_version(conn: &Connection) -> Result<u32, SchemaError> {
    let v: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    u32::try_from(v).map_err(|_| {
        SchemaError::ValidationError(format!("PRAGMA user_version out of range: {}", v))
    })
}

/// Apply every migration above the recorded version inside one transaction.
///
/// Returns the migrations that ran. A database already at the latest version
/// still gets the full idempotent table batch replayed, so a table dropped
/// out-of-band is recreated.
pub fn run_migrations(
    conn: &mut Connection,
    tables: &TableNames,
) -> Result<Vec<AppliedMigration>, SchemaError> {
    let from_version = read_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(SchemaError::UnsupportedVersion {
            found: from_version,
            latest,
        });
    }

    let tx = conn.transaction()?;
    let mut applied = Vec::new();

    for migration in all_migrations() {
        let pending = should_run_migration(from_version, migration.version);
        if pending {
            info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
        } else {
            // Replayed as a repair pass; statements are idempotent.
            debug!(version = migration.version, "replaying applied migration");
        }

        (migration.up)(&tx, tables).map_err(|source| SchemaError::MigrationError {
            version: migration.version,
            source,
        })?;

        if pending {
            applied.push(AppliedMigration {
                version: migration.version,
                description: migration.description.to_string(),
            });
        }
    }

    if latest != from_version {
        tx.execute_batch(&format!("PRAGMA user_version = {}", latest))?;
    }
    tx.commit()?;

    Ok(applied)
}

/// Determine if a migration is pending for a database at `from`.
fn should_run_migration(from: u32, target: u32) -> bool {
    target > from
}

fn migrate_create_tables(tx: &Transaction<'_>, tables: &TableNames) -> rusqlite::Result<()> {
    for stmt in schemas::table_statements(tables) {
        debug!(table = %stmt.table, "ensuring table");
        tx.execute(&stmt.sql, [])?;
    }
    Ok(())
}

fn migrate_add_fk_indexes(tx: &Transaction<'_>, tables: &TableNames) -> rusqlite::Result<()> {
    for stmt in schemas::index_statements(tables) {
        debug!(table = %stmt.table, "ensuring index");
        tx.execute(&stmt.sql, [])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute("PRAGMA foreign_keys=ON;", []).expect("fk");
        conn
    }

    #[test]
    fn versions_are_strictly_increasing() {
        let versions: Vec<u32> = all_migrations().iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]), "{versions:?}");
        assert_eq!(latest_version(), *versions.last().expect("non-empty"));
    }

    #[test]
    fn fresh_database_applies_everything() {
        let mut conn = memory_conn();
        let applied = run_migrations(&mut conn, &TableNames::default()).expect("migrate");
        assert_eq!(applied.len(), all_migrations().len());
        assert_eq!(read_user_version(&conn).expect("version"), latest_version());
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = memory_conn();
        run_migrations(&mut conn, &TableNames::default()).expect("first");
        let applied = run_migrations(&mut conn, &TableNames::default()).expect("second");
        assert!(applied.is_empty());
    }

    #[test]
    fn newer_database_is_rejected() {
        let mut conn = memory_conn();
        conn.execute_batch(&format!("PRAGMA user_version = {}", latest_version() + 1))
            .expect("set version");
        let err = run_migrations(&mut conn, &TableNames::default()).expect_err("must reject");
        assert!(matches!(err, SchemaError::UnsupportedVersion { .. }));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type='table'", [], |r| {
                r.get(0)
            })
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn should_run_only_pending_versions() {
        assert!(should_run_migration(0, 1));
        assert!(should_run_migration(1, 2));
        assert!(!should_run_migration(2, 2));
        assert!(!should_run_migration(2, 1));
    }
}
