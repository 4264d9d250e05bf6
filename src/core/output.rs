//! Terminal rendering for command results.
//!
//! Keeps report output bounded and readable while preserving signal.

use crate::core::bootstrap::DirStatus;
use crate::core::db::InitReport;
use crate::core::inspect::SchemaReport;
use colored::Colorize;

/// Drift lines shown before the remainder is summarized.
const MAX_DRIFT_LINES: usize = 40;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub fn render_init(report: &InitReport) -> String {
    let mut out = String::new();
    for dir in &report.bootstrap.dirs {
        let line = match &dir.status {
            DirStatus::Created => format!(
                "  {} created {} directory {}",
                "+".bright_green(),
                dir.role,
                dir.path.display()
            ),
            DirStatus::Existing => format!(
                "  {} {} directory {}",
                "·".dimmed(),
                dir.role,
                dir.path.display()
            ),
            DirStatus::Failed(reason) => format!(
                "  {} could not create {} directory {}: {}",
                "!".bright_yellow(),
                dir.role,
                dir.path.display(),
                compact_line(reason, 120)
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }

    for m in &report.applied {
        out.push_str(&format!(
            "  {} v{} {}\n",
            "●".bright_cyan(),
            m.version,
            m.description
        ));
    }

    let summary = if report.applied.is_empty() {
        format!("schema already at v{}", report.to_version)
    } else {
        format!(
            "schema v{} -> v{} ({} migration(s) applied)",
            report.from_version,
            report.to_version,
            report.applied.len()
        )
    };
    out.push_str(&format!(
        "{} {} ({})\n",
        "✓".bright_green(),
        summary,
        report.db_path.display()
    ));
    out
}

pub fn render_check(report: &SchemaReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "schema version {} (latest {}), {} declared tables\n",
        report.recorded_version, report.latest_version, report.tables_checked
    ));

    for d in report.drift.iter().take(MAX_DRIFT_LINES) {
        out.push_str(&format!(
            "  {} {}\n",
            "✗".bright_red(),
            compact_line(&d.to_string(), 160)
        ));
    }
    if report.drift.len() > MAX_DRIFT_LINES {
        out.push_str(&format!(
            "  (+{} more)\n",
            report.drift.len() - MAX_DRIFT_LINES
        ));
    }

    if report.is_healthy() {
        out.push_str(&format!("{} schema healthy\n", "✓".bright_green()));
    } else if report.recorded_version > report.latest_version {
        out.push_str(&format!(
            "{} database schema v{} is newer than this sensai-db supports (v{}); upgrade sensai-db\n",
            "✗".bright_red(),
            report.recorded_version,
            report.latest_version
        ));
    } else if report.drift.is_empty() {
        out.push_str(&format!(
            "{} schema matches but version is behind; run `sensai-db init`\n",
            "!".bright_yellow()
        ));
    } else {
        out.push_str(&format!(
            "{} {} difference(s) found; run `sensai-db init` to create what is missing\n",
            "✗".bright_red(),
            report.drift.len()
        ));
    }
    out.push_str(&format!("fingerprint {}\n", report.fingerprint));
    out
}
