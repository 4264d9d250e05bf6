//! Read-only schema introspection and drift detection.
//!
//! [`check_schema`] builds the declared schema in a scratch in-memory
//! database and compares it, table by table, with the target. Extra columns
//! or tables in the target are tolerated: the application may add its own.

use crate::core::config::TableNames;
use crate::core::error::SchemaError;
use crate::core::migration;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub pk: bool,
}

impl ColumnInfo {
    fn matches(&self, other: &ColumnInfo) -> bool {
        self.decl_type.eq_ignore_ascii_case(&other.decl_type)
            && self.not_null == other.not_null
            && self.default == other.default
            && self.pk == other.pk
    }
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.decl_type)?;
        if self.pk {
            write!(f, " PRIMARY KEY")?;
        }
        if self.not_null {
            write!(f, " NOT NULL")?;
        }
        if let Some(d) = &self.default {
            write!(f, " DEFAULT {}", d)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ForeignKeyInfo {
    pub from: String,
    pub ref_table: String,
    pub to: String,
    pub on_delete: String,
}

impl fmt::Display for ForeignKeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}({}) ON DELETE {}",
            self.from, self.ref_table, self.to, self.on_delete
        )
    }
}

/// A single difference between the declared and the actual schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Drift {
    MissingTable {
        table: String,
    },
    MissingColumn {
        table: String,
        column: String,
    },
    ColumnMismatch {
        table: String,
        expected: String,
        found: String,
    },
    ForeignKeyMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    UniqueMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    MissingIndex {
        table: String,
        index: String,
    },
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Drift::MissingTable { table } => write!(f, "{}: table missing", table),
            Drift::MissingColumn { table, column } => {
                write!(f, "{}: column {} missing", table, column)
            }
            Drift::ColumnMismatch {
                table,
                expected,
                found,
            } => write!(f, "{}: expected `{}`, found `{}`", table, expected, found),
            Drift::ForeignKeyMismatch {
                table,
                expected,
                found,
            } => write!(
                f,
                "{}: foreign keys differ (expected [{}], found [{}])",
                table,
                expected.join("; "),
                found.join("; ")
            ),
            Drift::UniqueMismatch {
                table,
                expected,
                found,
            } => write!(
                f,
                "{}: unique constraints differ (expected [{}], found [{}])",
                table,
                expected.join("; "),
                found.join("; ")
            ),
            Drift::MissingIndex { table, index } => {
                write!(f, "{}: index {} missing", table, index)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub recorded_version: u32,
    pub latest_version: u32,
    pub tables_checked: usize,
    pub drift: Vec<Drift>,
    pub fingerprint: String,
}

impl SchemaReport {
    pub fn is_healthy(&self) -> bool {
        self.drift.is_empty() && self.recorded_version == self.latest_version
    }
}

pub fn list_tables(conn: &Connection) -> Result<Vec<String>, SchemaError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Name under which `table` is stored, matched the way SQLite resolves
/// identifiers (ASCII case-insensitive).
pub fn stored_table_name(conn: &Connection, table: &str) -> Result<Option<String>, SchemaError> {
    let name = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?1 COLLATE NOCASE",
            params![table],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(name)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, SchemaError> {
    Ok(stored_table_name(conn, table)?.is_some())
}

pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            decl_type: row.get(1)?,
            not_null: row.get::<_, i64>(2)? != 0,
            default: row.get(3)?,
            pk: row.get::<_, i64>(4)? != 0,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyInfo>, SchemaError> {
    let mut stmt = conn.prepare(
        "SELECT \"from\", \"table\", \"to\", on_delete FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(ForeignKeyInfo {
            from: row.get(0)?,
            ref_table: row.get(1)?,
            to: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            on_delete: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    out.sort();
    Ok(out)
}

/// Column sets of every UNIQUE index on `table`, each rendered `a, b`.
pub fn unique_sets(conn: &Connection, table: &str) -> Result<Vec<String>, SchemaError> {
    let unique_indexes: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT name FROM pragma_index_list(?1) WHERE \"unique\" = 1")?;
        let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        out
    };

    let mut sets = BTreeSet::new();
    for index in unique_indexes {
        let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
        let rows = stmt.query_map(params![index], |row| row.get::<_, Option<String>>(0))?;
        let mut cols = Vec::new();
        for r in rows {
            cols.push(r?.unwrap_or_else(|| "<expr>".to_string()));
        }
        sets.insert(cols.join(", "));
    }
    Ok(sets.into_iter().collect())
}

fn index_names(conn: &Connection, table: &str) -> Result<BTreeSet<String>, SchemaError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type='index' AND tbl_name = ?1 COLLATE NOCASE AND sql IS NOT NULL",
    )?;
    let rows = stmt.query_map(params![table], |row| row.get::<_, String>(0))?;
    let mut out = BTreeSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

/// SHA-256 over the normalized DDL of every user table and index.
pub fn schema_fingerprint(conn: &Connection) -> Result<String, SchemaError> {
    let mut stmt = conn.prepare(
        "SELECT type, name, sql FROM sqlite_master
         WHERE name NOT LIKE 'sqlite_%' AND sql IS NOT NULL
         ORDER BY type, name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut hasher = Sha256::new();
    for r in rows {
        let (kind, name, sql) = r?;
        let normalized = sql.split_whitespace().collect::<Vec<_>>().join(" ");
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(normalized.as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn reference_database(tables: &TableNames) -> Result<Connection, SchemaError> {
    let mut reference = Connection::open_in_memory()?;
    migration::run_migrations(&mut reference, tables)?;
    Ok(reference)
}

fn to_strings<T: ToString>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// `table` is the declared name, `stored` the name found in `target`.
fn compare_table(
    reference: &Connection,
    target: &Connection,
    table: &str,
    stored: &str,
    drift: &mut Vec<Drift>,
) -> Result<(), SchemaError> {
    let actual_columns = table_columns(target, stored)?;
    for expected in table_columns(reference, table)? {
        match actual_columns.iter().find(|c| c.name == expected.name) {
            None => drift.push(Drift::MissingColumn {
                table: table.to_string(),
                column: expected.name.clone(),
            }),
            Some(found) if !expected.matches(found) => drift.push(Drift::ColumnMismatch {
                table: table.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            Some(_) => {}
        }
    }

    let expected_fks = foreign_keys(reference, table)?;
    let found_fks = foreign_keys(target, stored)?;
    if expected_fks != found_fks {
        drift.push(Drift::ForeignKeyMismatch {
            table: table.to_string(),
            expected: to_strings(&expected_fks),
            found: to_strings(&found_fks),
        });
    }

    let expected_unique = unique_sets(reference, table)?;
    let found_unique = unique_sets(target, stored)?;
    if expected_unique != found_unique {
        drift.push(Drift::UniqueMismatch {
            table: table.to_string(),
            expected: expected_unique,
            found: found_unique,
        });
    }

    let found_indexes = index_names(target, stored)?;
    for index in index_names(reference, table)? {
        if !found_indexes.contains(&index) {
            drift.push(Drift::MissingIndex {
                table: table.to_string(),
                index,
            });
        }
    }
    Ok(())
}

/// Compare `conn` against the declared schema for `tables`.
pub fn check_schema(conn: &Connection, tables: &TableNames) -> Result<SchemaReport, SchemaError> {
    tables.validate()?;
    let reference = reference_database(tables)?;
    let mut drift = Vec::new();

    let declared = tables.in_creation_order();
    for table in &declared {
        match stored_table_name(conn, table)? {
            Some(stored) => compare_table(&reference, conn, table, &stored, &mut drift)?,
            None => drift.push(Drift::MissingTable {
                table: table.to_string(),
            }),
        }
    }

    Ok(SchemaReport {
        recorded_version: migration::read_user_version(conn)?,
        latest_version: migration::latest_version(),
        tables_checked: declared.len(),
        drift,
        fingerprint: schema_fingerprint(conn)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> Connection {
        reference_database(&TableNames::default()).expect("reference")
    }

    #[test]
    fn reference_schema_checks_clean() {
        let conn = migrated();
        let report = check_schema(&conn, &TableNames::default()).expect("check");
        assert!(report.is_healthy(), "{:?}", report.drift);
        assert_eq!(report.tables_checked, 22);
    }

    #[test]
    fn empty_database_reports_every_table_missing() {
        let conn = Connection::open_in_memory().expect("open");
        let report = check_schema(&conn, &TableNames::default()).expect("check");
        assert_eq!(report.drift.len(), 22);
        assert!(
            report
                .drift
                .iter()
                .all(|d| matches!(d, Drift::MissingTable { .. }))
        );
        assert!(!report.is_healthy());
    }

    #[test]
    fn narrowed_column_is_reported() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT, created_at DATETIME)",
        )
        .expect("legacy users");
        let report = check_schema(&conn, &TableNames::default()).expect("check");
        let user_drift: Vec<String> = report
            .drift
            .iter()
            .filter(|d| !matches!(d, Drift::MissingTable { .. }))
            .map(ToString::to_string)
            .collect();
        assert!(
            user_drift.iter().any(|d| d.contains("column first_name missing")),
            "{user_drift:?}"
        );
        assert!(
            user_drift.iter().any(|d| d.contains("expected `email TEXT NOT NULL`")),
            "{user_drift:?}"
        );
        assert!(
            user_drift.iter().any(|d| d.contains("unique constraints differ")),
            "{user_drift:?}"
        );
    }

    #[test]
    fn foreign_keys_report_cascade_rule() {
        let conn = migrated();
        let fks = foreign_keys(&conn, "user_cohorts").expect("fks");
        assert_eq!(fks.len(), 2);
        assert!(fks.iter().all(|fk| fk.on_delete == "CASCADE"));
        assert!(fks.iter().any(|fk| fk.from == "cohort_id" && fk.ref_table == "cohorts"));
    }

    #[test]
    fn unique_sets_include_composite_keys() {
        let conn = migrated();
        assert_eq!(
            unique_sets(&conn, "user_cohorts").expect("unique"),
            vec!["user_id, cohort_id".to_string()]
        );
        assert_eq!(
            unique_sets(&conn, "organizations").expect("unique"),
            vec!["slug".to_string()]
        );
    }

    #[test]
    fn fingerprint_ignores_whitespace_only_differences() {
        let a = Connection::open_in_memory().expect("a");
        let b = Connection::open_in_memory().expect("b");
        a.execute_batch("CREATE TABLE t (id INTEGER,   v TEXT)").expect("a ddl");
        b.execute_batch("CREATE TABLE t (id INTEGER,\n v TEXT)").expect("b ddl");
        assert_eq!(
            schema_fingerprint(&a).expect("fa"),
            schema_fingerprint(&b).expect("fb")
        );
        b.execute_batch("CREATE INDEX idx_t_v ON t(v)").expect("index");
        assert_ne!(
            schema_fingerprint(&a).expect("fa"),
            schema_fingerprint(&b).expect("fb")
        );
    }

    #[test]
    fn table_lookup_ignores_ascii_case() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE Users (id INTEGER PRIMARY KEY)")
            .expect("ddl");
        assert_eq!(
            stored_table_name(&conn, "users").expect("lookup"),
            Some("Users".to_string())
        );
        assert!(table_exists(&conn, "USERS").expect("exists"));
        assert!(!table_exists(&conn, "user").expect("exists"));
    }
}
