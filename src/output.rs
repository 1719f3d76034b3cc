//! Output formatting utilities

use crate::commit::{CommitOutcome, CommitStatus};
use crate::diff::DiffSummary;
use crate::error::Result;
use crate::hash::short_id;
use crate::repo::RepoStatus;
use crate::version::{LogEvent, VersionMetadata};

/// Pretty printer for datalineage output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print repository status
    pub fn print_status(status: &RepoStatus) {
        println!("📊 Datalineage Repository Status");
        println!("├─ Project root: {}", status.project_root.display());
        println!("├─ Repository: {}", status.repo_dir.display());
        println!("├─ Versions path: {}", status.versions_dir.display());
        println!("├─ HEAD: {}", status.head.as_deref().unwrap_or("(none)"));
        println!("├─ Log entries: {}", status.log_entries);
        println!("├─ Versions: {}", status.stats.version_count);
        println!("├─ Reports: {}", status.stats.report_count);
        println!("├─ Version data: {}", format_bytes(status.stats.total_version_size));
        println!("├─ Raw archive: {}", format_bytes(status.stats.total_raw_archive_size));
        println!("└─ Report size: {}", format_bytes(status.stats.total_report_size));
    }

    /// Print the result of a commit attempt
    pub fn print_commit_outcome(outcome: &CommitOutcome) {
        match outcome.status {
            CommitStatus::Created => {
                println!("✅ Created version {}", outcome.version_id);
                println!(
                    "├─ Parent: {}",
                    outcome.parent_id.as_deref().unwrap_or("(none)")
                );
                println!("├─ Rows: {} → {}", outcome.rows_before, outcome.rows_after);
                println!("├─ Version path: {}", outcome.version_path.display());
                println!("└─ HEAD: {}", outcome.head.as_deref().unwrap_or("(none)"));
            }
            CommitStatus::Duplicate => {
                println!("♻️  {}", outcome.message);
                println!("├─ Existing version: {}", outcome.version_id);
                println!("└─ HEAD: {}", outcome.head.as_deref().unwrap_or("(none)"));
            }
        }
    }

    /// Print committed versions in log order
    pub fn print_version_list(versions: &[VersionMetadata], head: Option<&str>) {
        if versions.is_empty() {
            println!("No versions committed yet.");
            return;
        }

        println!("📚 Versions:");
        for (i, metadata) in versions.iter().enumerate() {
            let record = &metadata.record;
            let last = i == versions.len() - 1;
            let prefix = if last { "└─" } else { "├─" };
            let cont = if last { "  " } else { "│ " };
            let marker = if head == Some(record.version_id.as_str()) {
                " <- HEAD"
            } else {
                ""
            };

            println!("{} {}{}", prefix, record.version_id, marker);
            println!(
                "{}  ├─ {} | rows={} | parent={}",
                cont,
                record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                record.row_count,
                record.parent_id.as_deref().map(short_id).unwrap_or("none")
            );
            println!("{}  └─ {}", cont, record.commit_message);
        }
    }

    /// Print every log event, dedupe hits included
    pub fn print_log_events(events: &[LogEvent], head: Option<&str>) {
        if events.is_empty() {
            println!("Log is empty.");
            return;
        }

        println!("📜 Event log:");
        for (i, event) in events.iter().enumerate() {
            let prefix = if i == events.len() - 1 { "└─" } else { "├─" };
            match event {
                LogEvent::Commit(metadata) => {
                    let record = &metadata.record;
                    let marker = if head == Some(record.version_id.as_str()) {
                        " <- HEAD"
                    } else {
                        ""
                    };
                    println!(
                        "{} [commit] {} {}{} ({})",
                        prefix,
                        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        short_id(&record.version_id),
                        marker,
                        record.commit_message
                    );
                }
                LogEvent::DedupeHit(hit) => {
                    println!(
                        "{} [dedupe_hit] {} {} from {}",
                        prefix,
                        hit.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        short_id(&hit.resolved_version_id),
                        hit.requested_source_data_path
                    );
                }
            }
        }
    }

    /// Print one version record
    pub fn print_version(metadata: &VersionMetadata, is_head: bool) {
        let record = &metadata.record;
        let stats = &metadata.preprocess_stats;

        println!(
            "📦 Version: {}{}",
            record.version_id,
            if is_head { " <- HEAD" } else { "" }
        );
        println!("├─ Parent: {}", record.parent_id.as_deref().unwrap_or("(none)"));
        println!("├─ Timestamp: {}", record.timestamp.to_rfc3339());
        println!("├─ Message: {}", record.commit_message);
        if record.is_recommit() {
            println!("├─ Source data: {} (reprocessed)", record.source_data_path);
        } else {
            println!("├─ Source data: {}", record.source_data_path);
        }
        println!("├─ Source config: {}", record.source_config_path);
        println!("├─ Rows: {} → {}", stats.rows_before, stats.rows_after);
        println!("├─ Columns: [{}]", stats.columns_after.join(", "));
        if record.label_distribution.is_empty() {
            println!("├─ Label distribution: (no label column)");
        } else {
            let labels: Vec<String> = record
                .label_distribution
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!("├─ Label distribution: {}", labels.join(", "));
        }
        println!("└─ Hashes:");
        println!("   ├─ input: {}", record.input_hash);
        println!("   ├─ config: {}", record.config_hash);
        println!("   └─ version: {}", record.version_hash);
    }

    /// Print a HEAD move
    pub fn print_checkout(previous: Option<&str>, current: &str) {
        println!("✅ HEAD is now {}", current);
        println!("└─ Previous HEAD: {}", previous.unwrap_or("(none)"));
    }

    /// Print a diff summary
    pub fn print_diff_summary(summary: &DiffSummary) {
        println!(
            "🔍 Diff: {} → {}",
            short_id(&summary.version_a),
            short_id(&summary.version_b)
        );
        println!(
            "├─ Rows: {} → {} (delta {:+})",
            summary.row_count_a, summary.row_count_b, summary.row_delta
        );

        let columns = &summary.columns;
        if columns.only_in_a.is_empty() && columns.only_in_b.is_empty() {
            println!("├─ ✅ Columns: unchanged ({})", columns.common.len());
        } else {
            println!("├─ ❌ Columns: CHANGED");
            println!("│  ├─ Only in A: [{}]", columns.only_in_a.join(", "));
            println!("│  ├─ Only in B: [{}]", columns.only_in_b.join(", "));
            println!("│  └─ Common: [{}]", columns.common.join(", "));
        }

        if summary.config_changed {
            println!("├─ ❌ Config: CHANGED");
        } else {
            println!("├─ ✅ Config: unchanged");
        }

        if summary.label_distribution_changed {
            println!("├─ ❌ Label distribution: CHANGED");
        } else {
            println!("├─ ✅ Label distribution: unchanged");
        }

        println!("└─ Report: {}", summary.report_path.display());
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
