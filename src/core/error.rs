use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Migration {version} failed: {source}")]
    MigrationError {
        version: u32,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Database schema version {found} is newer than the latest known version {latest}")]
    UnsupportedVersion { found: u32, latest: u32 },
    #[error("Validation error: {0}")]
    ValidationError(String),
}
