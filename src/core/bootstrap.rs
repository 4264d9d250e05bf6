//! Filesystem bootstrap: the database directory and the uploads directory.
//!
//! Failures here are not fatal. They are logged and reported; if the database
//! directory is really unusable the subsequent open fails loudly.

use crate::core::config::Paths;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DirStatus {
    Created,
    Existing,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirOutcome {
    pub role: &'static str,
    pub path: PathBuf,
    pub status: DirStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub dirs: Vec<DirOutcome>,
}

impl BootstrapReport {
    pub fn created(&self) -> impl Iterator<Item = &DirOutcome> {
        self.dirs.iter().filter(|d| d.status == DirStatus::Created)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DirOutcome> {
        self.dirs
            .iter()
            .filter(|d| matches!(d.status, DirStatus::Failed(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Directory holding the database file, or `None` for in-memory databases
/// and bare file names that live in the working directory.
pub fn db_parent_dir(db_path: &Path) -> Option<&Path> {
    if db_path.as_os_str() == ":memory:" {
        return None;
    }
    db_path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn ensure_dir(role: &'static str, path: &Path) -> DirOutcome {
    let status = if path.is_dir() {
        DirStatus::Existing
    } else {
        match fs::create_dir_all(path) {
            Ok(()) => {
                info!(role, path = %path.display(), "created directory");
                DirStatus::Created
            }
            Err(e) => {
                warn!(role, path = %path.display(), error = %e, "failed to create directory");
                DirStatus::Failed(e.to_string())
            }
        }
    };
    DirOutcome {
        role,
        path: path.to_path_buf(),
        status,
    }
}

/// Make sure the database directory and uploads directory exist.
pub fn ensure_directories(paths: &Paths) -> BootstrapReport {
    let mut report = BootstrapReport::default();
    if let Some(parent) = db_parent_dir(&paths.db_path) {
        report.dirs.push(ensure_dir("database", parent));
    }
    report.dirs.push(ensure_dir("uploads", &paths.uploads_dir));
    report
}
