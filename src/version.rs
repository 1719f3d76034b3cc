//! Version records, log events and artifact loading

use crate::data::{DataInfo, DataProcessor};
use crate::error::Result;
use crate::hash::HashValue;
use crate::table::Table;
use chrono::{DateTime, Timelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// File names inside `versions/<id>/`
pub const RAW_SNAPSHOT_FILE: &str = "raw_snapshot.csv";
pub const PROCESSED_FILE: &str = "processed.csv";
pub const CONFIG_SNAPSHOT_FILE: &str = "config_snapshot.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Column the label distribution is computed over
pub const LABEL_COLUMN: &str = "label";

/// Prefix of `source_data_path` for commits that reprocess HEAD
pub const HEAD_SOURCE_PREFIX: &str = "HEAD:";

/// Current UTC time truncated to whole seconds
pub fn timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Immutable description of one committed version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: HashValue,
    pub parent_id: Option<HashValue>,
    pub timestamp: DateTime<Utc>,
    pub commit_message: String,
    pub source_data_path: String,
    pub source_config_path: String,
    pub input_hash: HashValue,
    pub config_hash: HashValue,
    pub version_hash: HashValue,
    pub row_count: u64,
    #[serde(default)]
    pub label_distribution: IndexMap<String, u64>,
    #[serde(default)]
    pub eval_metrics: Option<serde_json::Value>,
}

impl VersionRecord {
    pub fn is_recommit(&self) -> bool {
        self.source_data_path.starts_with(HEAD_SOURCE_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessStats {
    pub rows_before: u64,
    pub rows_after: u64,
    pub columns_before: Vec<String>,
    pub columns_after: Vec<String>,
}

/// Artifact file names, relative to the version directory except
/// `raw_archive` which is relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    pub raw_snapshot: String,
    pub processed_snapshot: String,
    pub config_snapshot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_archive: Option<String>,
}

impl Default for Artifacts {
    fn default() -> Self {
        Self {
            raw_snapshot: RAW_SNAPSHOT_FILE.to_string(),
            processed_snapshot: PROCESSED_FILE.to_string(),
            config_snapshot: CONFIG_SNAPSHOT_FILE.to_string(),
            raw_archive: None,
        }
    }
}

/// Contents of `metadata.json`, also embedded in `commit` log events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(flatten)]
    pub record: VersionRecord,
    pub preprocess_stats: PreprocessStats,
    pub artifacts: Artifacts,
}

/// A rejected duplicate commit attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupeHit {
    pub timestamp: DateTime<Utc>,
    pub requested_source_data_path: String,
    pub requested_source_config_path: String,
    pub requested_input_hash: HashValue,
    pub requested_config_hash: HashValue,
    pub resolved_version_id: HashValue,
    pub message: String,
}

/// Entry of the append-only `logs.json` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LogEvent {
    Commit(VersionMetadata),
    DedupeHit(DedupeHit),
}

impl LogEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LogEvent::Commit(_) => "commit",
            LogEvent::DedupeHit(_) => "dedupe_hit",
        }
    }

    pub fn as_commit(&self) -> Option<&VersionMetadata> {
        match self {
            LogEvent::Commit(metadata) => Some(metadata),
            LogEvent::DedupeHit(_) => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LogEvent::Commit(metadata) => metadata.record.timestamp,
            LogEvent::DedupeHit(hit) => hit.timestamp,
        }
    }
}

/// Frequency table over the `label` column, most frequent first.
///
/// Keys are the canonical text of each cell, `null` for missing cells.
/// Ties are broken by key so the result does not depend on row order.
pub fn label_distribution(table: &Table) -> IndexMap<String, u64> {
    let Some(index) = table.column_index(LABEL_COLUMN) else {
        return IndexMap::new();
    };

    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in table.rows() {
        let key = match &row[index] {
            Some(value) => value.canonical_text(),
            None => "null".to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().collect()
}

/// Reads the artifacts of a published version
pub struct VersionLoader;

impl VersionLoader {
    /// Load `metadata.json` from a version directory
    pub fn load_metadata<P: AsRef<Path>>(version_dir: P) -> Result<VersionMetadata> {
        let content = fs::read_to_string(version_dir.as_ref().join(METADATA_FILE))?;
        let metadata: VersionMetadata = serde_json::from_str(&content)?;
        Ok(metadata)
    }

    /// Row count and column names of `processed.csv`
    pub fn load_processed_info<P: AsRef<Path>>(version_dir: P) -> Result<DataInfo> {
        let processor = DataProcessor::new()?;
        processor.load_file(&version_dir.as_ref().join(PROCESSED_FILE))
    }

    /// Full typed table of `processed.csv`, with types re-inferred by the loader
    pub fn load_processed_table<P: AsRef<Path>>(version_dir: P) -> Result<Table> {
        let processor = DataProcessor::new()?;
        processor.load_table(&version_dir.as_ref().join(PROCESSED_FILE))
    }

    /// Raw bytes of `processed.csv`
    pub fn load_processed_bytes<P: AsRef<Path>>(version_dir: P) -> Result<Vec<u8>> {
        Ok(fs::read(version_dir.as_ref().join(PROCESSED_FILE))?)
    }
}
