//! sensai-db: schema bootstrap for the SensAI learning platform.
//!
//! Creates and repairs the SQLite schema the platform backend runs on:
//! organizations, users, cohorts, groups, courses, milestones, tasks,
//! questions, scorecards, chat history, task completions, code drafts and
//! generation-job tracking. Nothing here reads or writes application rows.
//!
//! # Guarantees
//!
//! - **Idempotent**: `init` can be re-run against a live database; existing
//!   tables and rows are left alone.
//! - **Additive**: missing tables and indexes are created, nothing is altered
//!   or dropped.
//! - **Atomic**: the migration batch runs in one transaction.
//! - **Cascading**: every foreign key is `ON DELETE CASCADE`; connections
//!   opened through [`core::db::db_connect`] enforce them.
//!
//! # Examples
//!
//! ```bash
//! # Create directories and schema (db/db.sqlite, uploads/)
//! sensai-db init
//!
//! # Report drift against the declared schema
//! sensai-db check --format json
//! ```
//!
//! # Crate Structure
//!
//! - [`core::config`]: table names and paths
//! - [`core::bootstrap`]: directory creation
//! - [`core::schemas`] / [`core::migration`]: DDL and the versioned migration list
//! - [`core::db`]: connection setup and the initializer
//! - [`core::inspect`]: introspection, drift and fingerprints

pub mod core;

use crate::core::{config::Config, db, error, inspect, logging, migration, output};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "sensai-db",
    version = env!("CARGO_PKG_VERSION"),
    about = "Create and repair the SensAI platform database schema"
)]
struct Cli {
    /// TOML config file (defaults to ./sensai-db.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct PathOverrides {
    /// SQLite database file.
    #[clap(long)]
    db: Option<PathBuf>,
    /// Uploads directory.
    #[clap(long)]
    uploads: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    #[clap(flatten)]
    paths: PathOverrides,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    format: String,
}

#[derive(clap::Args, Debug)]
struct CheckCli {
    /// SQLite database file.
    #[clap(long)]
    db: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    format: String,
}

#[derive(clap::Args, Debug)]
struct TablesCli {
    /// SQLite database file.
    #[clap(long)]
    db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create missing directories, tables and indexes
    Init(InitCli),
    /// Compare the database with the declared schema
    Check(CheckCli),
    /// List tables present in the database
    Tables(TablesCli),
    /// Print version information
    Version,
}

fn validate_format(format: &str) -> Result<(), error::SchemaError> {
    match format {
        "text" | "json" => Ok(()),
        other => Err(error::SchemaError::ValidationError(format!(
            "unknown output format '{}' (expected 'text' or 'json')",
            other
        ))),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), error::SchemaError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| error::SchemaError::ValidationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

pub fn run() -> Result<(), error::SchemaError> {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!(
            "v{} (schema v{})",
            migration::SENSAI_DB_VERSION,
            migration::latest_version()
        );
        return Ok(());
    }

    let current_dir = std::env::current_dir()?;
    let mut config = Config::load(cli.config.as_deref(), &current_dir)?;
    logging::init(&config.logging);

    match cli.command {
        Command::Version => Ok(()),
        Command::Init(init) => {
            validate_format(&init.format)?;
            if let Some(db) = init.paths.db {
                config.paths.db_path = db;
            }
            if let Some(uploads) = init.paths.uploads {
                config.paths.uploads_dir = uploads;
            }

            let report = db::initialize(&config)?;
            if init.format == "json" {
                print_json(&report)?;
            } else {
                print!("{}", output::render_init(&report));
            }
            Ok(())
        }
        Command::Check(check) => {
            validate_format(&check.format)?;
            if let Some(db) = check.db {
                config.paths.db_path = db;
            }

            let conn = db::open_existing(&config.paths.db_path)?;
            let report = inspect::check_schema(&conn, &config.tables)?;
            if check.format == "json" {
                print_json(&report)?;
            } else {
                print!("{}", output::render_check(&report));
            }
            if report.is_healthy() {
                Ok(())
            } else {
                Err(error::SchemaError::ValidationError(format!(
                    "schema check failed for {}",
                    config.paths.db_path.display()
                )))
            }
        }
        Command::Tables(tables) => {
            if let Some(db) = tables.db {
                config.paths.db_path = db;
            }

            let conn = db::open_existing(&config.paths.db_path)?;
            let declared = config.tables.in_creation_order();
            for table in inspect::list_tables(&conn)? {
                let columns = inspect::table_columns(&conn, &table)?.len();
                let origin = if declared.iter().any(|d| d.eq_ignore_ascii_case(&table)) {
                    "declared"
                } else {
                    "extra"
                };
                println!("{:<28} {:>3} columns  {}", table, columns, origin);
            }
            Ok(())
        }
    }
}
