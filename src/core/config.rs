//! Configuration for the schema bootstrap.
//!
//! Table names and filesystem locations are carried in an explicit [`Config`]
//! value that is passed to every operation. Values come from, in increasing
//! precedence: built-in defaults, a TOML file, environment variables, and
//! CLI flags (applied by the binary).

use crate::core::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "sensai-db.toml";

pub const ENV_DB_PATH: &str = "SENSAI_DB_PATH";
pub const ENV_UPLOADS_DIR: &str = "SENSAI_UPLOADS_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub tables: TableNames,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Paths {
    /// SQLite database file. Its parent directory is created on bootstrap.
    pub db_path: PathBuf,
    /// Directory the upload-storage consumer writes into.
    pub uploads_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db").join("db.sqlite"),
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}

/// Physical table names, one per logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TableNames {
    pub organizations: String,
    pub org_api_keys: String,
    pub users: String,
    pub user_organizations: String,
    pub milestones: String,
    pub cohorts: String,
    pub user_cohorts: String,
    pub groups: String,
    pub user_groups: String,
    pub courses: String,
    pub course_cohorts: String,
    pub tasks: String,
    pub questions: String,
    pub scorecards: String,
    pub question_scorecards: String,
    pub chat_history: String,
    pub task_completions: String,
    pub course_tasks: String,
    pub course_milestones: String,
    pub course_generation_jobs: String,
    pub task_generation_jobs: String,
    pub code_drafts: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            organizations: "organizations".to_string(),
            org_api_keys: "org_api_keys".to_string(),
            users: "users".to_string(),
            user_organizations: "user_organizations".to_string(),
            milestones: "milestones".to_string(),
            cohorts: "cohorts".to_string(),
            user_cohorts: "user_cohorts".to_string(),
            groups: "groups".to_string(),
            user_groups: "user_groups".to_string(),
            courses: "courses".to_string(),
            course_cohorts: "course_cohorts".to_string(),
            tasks: "tasks".to_string(),
            questions: "questions".to_string(),
            scorecards: "scorecards".to_string(),
            question_scorecards: "question_scorecards".to_string(),
            chat_history: "chat_history".to_string(),
            task_completions: "task_completions".to_string(),
            course_tasks: "course_tasks".to_string(),
            course_milestones: "course_milestones".to_string(),
            course_generation_jobs: "course_generation_jobs".to_string(),
            task_generation_jobs: "task_generation_jobs".to_string(),
            code_drafts: "code_drafts".to_string(),
        }
    }
}

impl TableNames {
    /// All configured names in creation order (parents before children).
    pub fn in_creation_order(&self) -> Vec<&str> {
        vec![
            self.organizations.as_str(),
            self.org_api_keys.as_str(),
            self.users.as_str(),
            self.user_organizations.as_str(),
            self.milestones.as_str(),
            self.cohorts.as_str(),
            self.user_cohorts.as_str(),
            self.groups.as_str(),
            self.user_groups.as_str(),
            self.courses.as_str(),
            self.course_cohorts.as_str(),
            self.tasks.as_str(),
            self.questions.as_str(),
            self.scorecards.as_str(),
            self.question_scorecards.as_str(),
            self.chat_history.as_str(),
            self.task_completions.as_str(),
            self.course_tasks.as_str(),
            self.course_milestones.as_str(),
            self.course_generation_jobs.as_str(),
            self.task_generation_jobs.as_str(),
            self.code_drafts.as_str(),
        ]
    }

    /// Reject names SQLite cannot hold as a quoted identifier and duplicates
    /// that would make two entities share one table.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for name in self.in_creation_order() {
            if name.trim().is_empty() {
                return Err(SchemaError::ConfigError(
                    "table names must not be empty".to_string(),
                ));
            }
            if name.contains('\0') {
                return Err(SchemaError::ConfigError(format!(
                    "table name {:?} contains a NUL byte",
                    name
                )));
            }
            if name.to_ascii_lowercase().starts_with("sqlite_") {
                return Err(SchemaError::ConfigError(format!(
                    "table name {:?} uses the reserved sqlite_ prefix",
                    name
                )));
            }
            // SQLite compares identifiers case-insensitively.
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(SchemaError::ConfigError(format!(
                    "table name {:?} is configured for more than one entity",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let config: Config =
            toml::from_str(content).map_err(|e| SchemaError::ConfigError(e.to_string()))?;
        config.tables.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(SchemaError::IoError)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            SchemaError::ConfigError(msg) => {
                SchemaError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// File layer only: an explicit file must exist, otherwise
    /// `sensai-db.toml` in `cwd` is used when present.
    pub fn from_sources(explicit: Option<&Path>, cwd: &Path) -> Result<Self, SchemaError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = cwd.join(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Resolve configuration the way the binary does: file layer, then
    /// environment overrides.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, SchemaError> {
        let mut config = Self::from_sources(explicit, cwd)?;
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Some(db_path) = env_path(env::var_os(ENV_DB_PATH)) {
            self.paths.db_path = db_path;
        }
        if let Some(uploads) = env_path(env::var_os(ENV_UPLOADS_DIR)) {
            self.paths.uploads_dir = uploads;
        }
    }
}

/// Blank values count as unset. Non-UTF-8 values are kept byte for byte.
fn env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_str().is_some_and(|v| v.trim().is_empty()) {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_entity() {
        let names = TableNames::default();
        assert_eq!(names.in_creation_order().len(), 22);
        assert_eq!(names.in_creation_order()[0], "organizations");
        assert_eq!(names.in_creation_order()[21], "code_drafts");
        assert!(names.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = Config::from_toml_str(
            r#"
            [paths]
            db_path = "/var/lib/sensai/app.db"

            [tables]
            groups = "learner_groups"
            "#,
        )
        .expect("parse");
        assert_eq!(config.paths.db_path, PathBuf::from("/var/lib/sensai/app.db"));
        assert_eq!(config.paths.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.tables.groups, "learner_groups");
        assert_eq!(config.tables.users, "users");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn duplicate_table_names_are_rejected() {
        let err = Config::from_toml_str(
            r#"
            [tables]
            courses = "Users"
            "#,
        )
        .expect_err("duplicate must fail");
        assert!(err.to_string().contains("more than one entity"), "{err}");
    }

    #[test]
    fn empty_and_reserved_names_are_rejected() {
        let names = TableNames {
            tasks: "  ".to_string(),
            ..TableNames::default()
        };
        assert!(names.validate().is_err());

        let names = TableNames {
            tasks: "sqlite_tasks".to_string(),
            ..TableNames::default()
        };
        assert!(names.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("[paths\ndb_path = 1").expect_err("must fail");
        assert!(matches!(err, SchemaError::ConfigError(_)));
    }

    #[test]
    fn file_in_working_directory_is_picked_up() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(
            tmp.path().join(DEFAULT_CONFIG_FILE),
            "[paths]\nuploads_dir = \"files\"\n",
        )
        .expect("write config");
        let config = Config::from_sources(None, tmp.path()).expect("load");
        assert_eq!(config.paths.uploads_dir, PathBuf::from("files"));

        let empty = tempfile::tempdir().expect("tempdir");
        let config = Config::from_sources(None, empty.path()).expect("defaults");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn file_parse_errors_name_the_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "[paths\n").expect("write config");
        let err = Config::from_file(&path).expect_err("must fail");
        assert!(matches!(err, SchemaError::ConfigError(_)));
        assert!(err.to_string().contains("broken.toml"), "{err}");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        assert_eq!(env_path(None), None);
        assert_eq!(env_path(Some(OsString::from(""))), None);
        assert_eq!(env_path(Some(OsString::from("  "))), None);
        assert_eq!(
            env_path(Some(OsString::from("state/app.db"))),
            Some(PathBuf::from("state/app.db"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_env_paths_survive_unchanged() {
        use std::os::unix::ffi::OsStringExt;
        let raw = OsString::from_vec(b"db/\xffstate.sqlite".to_vec());
        assert_eq!(env_path(Some(raw.clone())), Some(PathBuf::from(raw)));
    }

    #[test]
    fn load_fails_when_explicit_file_is_missing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = tmp.path().join("nope.toml");
        assert!(Config::load(Some(&missing), tmp.path()).is_err());
    }
}
