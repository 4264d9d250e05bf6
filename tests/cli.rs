use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn run_sensai_db(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sensai-db"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("SENSAI_DB_PATH")
        .env_remove("SENSAI_UPLOADS_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("run sensai-db")
}

#[test]
fn init_then_check_succeeds_with_default_layout() {
    let tmp = tempdir().expect("tempdir");

    let out = run_sensai_db(tmp.path(), &["init"]);
    assert!(
        out.status.success(),
        "init failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(tmp.path().join("db/db.sqlite").is_file());
    assert!(tmp.path().join("uploads").is_dir());

    let out = run_sensai_db(tmp.path(), &["check"]);
    assert!(
        out.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&out.stdout)
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("schema healthy"));
}

#[test]
fn init_json_reports_applied_migrations() {
    let tmp = tempdir().expect("tempdir");
    let out = run_sensai_db(tmp.path(), &["init", "--format", "json"]);
    assert!(out.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("init json output");
    assert_eq!(report["from_version"], 0);
    assert_eq!(report["applied"][0]["version"], 1);

    let out = run_sensai_db(tmp.path(), &["init", "--format", "json"]);
    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("second init json output");
    assert_eq!(report["applied"].as_array().map(Vec::len), Some(0));
}

#[test]
fn check_fails_on_missing_database() {
    let tmp = tempdir().expect("tempdir");
    let out = run_sensai_db(tmp.path(), &["check"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("database not found"));
}

#[test]
fn check_json_reports_drift_after_table_loss() {
    let tmp = tempdir().expect("tempdir");
    assert!(run_sensai_db(tmp.path(), &["init"]).status.success());

    let conn = rusqlite::Connection::open(tmp.path().join("db/db.sqlite")).expect("open");
    conn.execute("DROP TABLE chat_history", []).expect("drop");
    drop(conn);

    let out = run_sensai_db(tmp.path(), &["check", "--format", "json"]);
    assert!(!out.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("check json output");
    assert_eq!(report["drift"][0]["kind"], "missing_table");
    assert_eq!(report["drift"][0]["table"], "chat_history");
}

#[test]
fn config_file_in_working_directory_is_used() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("sensai-db.toml"),
        r#"
[paths]
db_path = "state/app.sqlite"
uploads_dir = "files"

[tables]
groups = "learner_groups"
"#,
    )
    .expect("write config");

    assert!(run_sensai_db(tmp.path(), &["init"]).status.success());
    assert!(tmp.path().join("state/app.sqlite").is_file());
    assert!(tmp.path().join("files").is_dir());

    let out = run_sensai_db(tmp.path(), &["tables"]);
    assert!(out.status.success());
    let listing = String::from_utf8_lossy(&out.stdout);
    assert!(listing.contains("learner_groups"), "{listing}");
    assert!(!listing.lines().any(|l| l.starts_with("groups ")), "{listing}");
}

#[test]
fn flags_override_config_and_environment() {
    let tmp = tempdir().expect("tempdir");
    let out = Command::new(env!("CARGO_BIN_EXE_sensai-db"))
        .args(["init", "--db", "flag/x.db", "--uploads", "flag-uploads"])
        .current_dir(tmp.path())
        .env("SENSAI_DB_PATH", "env/y.db")
        .env("NO_COLOR", "1")
        .output()
        .expect("run sensai-db");
    assert!(out.status.success());
    assert!(tmp.path().join("flag/x.db").is_file());
    assert!(tmp.path().join("flag-uploads").is_dir());
    assert!(!tmp.path().join("env").exists());
}

#[test]
fn environment_sets_database_path() {
    let tmp = tempdir().expect("tempdir");
    let out = Command::new(env!("CARGO_BIN_EXE_sensai-db"))
        .arg("init")
        .current_dir(tmp.path())
        .env("SENSAI_DB_PATH", "env/y.db")
        .env("NO_COLOR", "1")
        .output()
        .expect("run sensai-db");
    assert!(out.status.success());
    assert!(tmp.path().join("env/y.db").is_file());
}

#[test]
fn version_prints_schema_version() {
    let tmp = tempdir().expect("tempdir");
    let out = run_sensai_db(tmp.path(), &["version"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.starts_with('v'), "{text}");
    assert!(text.contains("schema v2"), "{text}");
}

#[test]
fn unknown_format_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    let out = run_sensai_db(tmp.path(), &["init", "--format", "yaml"]);
    assert!(!out.status.success());
    assert!(!tmp.path().join("db").exists());
}
