use crate::core::bootstrap::{self, BootstrapReport};
use crate::core::config::{Config, TableNames};
use crate::core::error;
use crate::core::migration::{self, AppliedMigration};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn db_connect(db_path: &Path) -> Result<Connection, error::SchemaError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::SchemaError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::SchemaError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::SchemaError::RusqliteError)?;
    Ok(conn)
}

/// Result of a full initialization run.
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub db_path: PathBuf,
    pub bootstrap: BootstrapReport,
    pub from_version: u32,
    pub to_version: u32,
    pub applied: Vec<AppliedMigration>,
}

/// Run the migration list against an already-open connection.
pub fn apply_schema(
    conn: &mut Connection,
    tables: &TableNames,
) -> Result<Vec<AppliedMigration>, error::SchemaError> {
    tables.validate()?;
    migration::run_migrations(conn, tables)
}

/// Bootstrap directories, then create every missing table and index.
pub fn initialize(config: &Config) -> Result<InitReport, error::SchemaError> {
    config.tables.validate()?;

    let bootstrap = bootstrap::ensure_directories(&config.paths);
    let db_path = &config.paths.db_path;

    let mut conn = db_connect(db_path)?;
    let from_version = migration::read_user_version(&conn)?;
    let applied = apply_schema(&mut conn, &config.tables)?;
    let to_version = migration::read_user_version(&conn)?;

    info!(
        db = %db_path.display(),
        from_version,
        to_version,
        applied = applied.len(),
        "database schema ready"
    );

    Ok(InitReport {
        db_path: db_path.clone(),
        bootstrap,
        from_version,
        to_version,
        applied,
    })
}

/// Open an existing database read-only for inspection. Never creates the
/// file or changes its journal mode.
pub fn open_existing(db_path: &Path) -> Result<Connection, error::SchemaError> {
    if !db_path.is_file() {
        return Err(error::SchemaError::ValidationError(format!(
            "database not found at {}",
            db_path.display()
        )));
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::SchemaError::RusqliteError)?;
    Ok(conn)
}
