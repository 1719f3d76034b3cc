//! Structural comparison of two committed versions

use crate::error::{LineageError, Result};
use crate::hash::HashValue;
use crate::repo::RepoStore;
use crate::version::{timestamp_now, VersionLoader};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffCounts {
    pub row_count_a: u64,
    pub row_count_b: u64,
    pub row_delta: i64,
    pub column_count_a: usize,
    pub column_count_b: usize,
    pub config_changed: bool,
}

/// Column sets, each sorted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnComparison {
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    pub common: Vec<String>,
}

impl ColumnComparison {
    pub fn between(columns_a: &[String], columns_b: &[String]) -> Self {
        let a: BTreeSet<&String> = columns_a.iter().collect();
        let b: BTreeSet<&String> = columns_b.iter().collect();
        Self {
            only_in_a: a.difference(&b).map(|s| s.to_string()).collect(),
            only_in_b: b.difference(&a).map(|s| s.to_string()).collect(),
            common: a.intersection(&b).map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelComparison {
    pub a: IndexMap<String, u64>,
    pub b: IndexMap<String, u64>,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashComparison {
    pub config_hash_a: HashValue,
    pub config_hash_b: HashValue,
    pub input_hash_a: HashValue,
    pub input_hash_b: HashValue,
    pub version_hash_a: HashValue,
    pub version_hash_b: HashValue,
}

/// Full report persisted under `reports/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub generated_at: DateTime<Utc>,
    pub version_a: String,
    pub version_b: String,
    pub summary: DiffCounts,
    pub columns: ColumnComparison,
    pub label_distribution: LabelComparison,
    pub hashes: HashComparison,
}

/// Summary returned to callers; carries no timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffSummary {
    pub version_a: String,
    pub version_b: String,
    pub row_count_a: u64,
    pub row_count_b: u64,
    pub row_delta: i64,
    pub config_changed: bool,
    pub label_distribution_changed: bool,
    pub columns: ColumnComparison,
    pub report_path: PathBuf,
}

/// Compares versions of one repository
pub struct DiffEngine<'a> {
    store: &'a RepoStore,
}

impl<'a> DiffEngine<'a> {
    pub fn new(store: &'a RepoStore) -> Self {
        Self { store }
    }

    /// Build the report for `version_a` against `version_b` without persisting it
    pub fn build_report(&self, version_a: &str, version_b: &str) -> Result<DiffReport> {
        for id in [version_a, version_b] {
            if !self.store.version_exists(id) {
                return Err(LineageError::version_not_found(id));
            }
        }

        let dir_a = self.store.version_dir(version_a);
        let dir_b = self.store.version_dir(version_b);

        let info_a = VersionLoader::load_processed_info(&dir_a)?;
        let info_b = VersionLoader::load_processed_info(&dir_b)?;
        let record_a = VersionLoader::load_metadata(&dir_a)?.record;
        let record_b = VersionLoader::load_metadata(&dir_b)?.record;

        let columns_a: Vec<String> = info_a.columns.iter().map(|c| c.name.clone()).collect();
        let columns_b: Vec<String> = info_b.columns.iter().map(|c| c.name.clone()).collect();

        let labels_changed = record_a.label_distribution != record_b.label_distribution;

        Ok(DiffReport {
            generated_at: timestamp_now(),
            version_a: version_a.to_string(),
            version_b: version_b.to_string(),
            summary: DiffCounts {
                row_count_a: info_a.row_count,
                row_count_b: info_b.row_count,
                row_delta: info_b.row_count as i64 - info_a.row_count as i64,
                column_count_a: columns_a.len(),
                column_count_b: columns_b.len(),
                config_changed: record_a.config_hash != record_b.config_hash,
            },
            columns: ColumnComparison::between(&columns_a, &columns_b),
            label_distribution: LabelComparison {
                a: record_a.label_distribution,
                b: record_b.label_distribution,
                changed: labels_changed,
            },
            hashes: HashComparison {
                config_hash_a: record_a.config_hash,
                config_hash_b: record_b.config_hash,
                input_hash_a: record_a.input_hash,
                input_hash_b: record_b.input_hash,
                version_hash_a: record_a.version_hash,
                version_hash_b: record_b.version_hash,
            },
        })
    }

    /// Compare two versions and write `reports/diff_<a8>__<b8>.json`
    pub fn compare(&self, version_a: &str, version_b: &str) -> Result<DiffSummary> {
        let report = self.build_report(version_a, version_b)?;

        let workspace = self.store.workspace();
        let report_path = workspace.report_path(version_a, version_b);
        fs::create_dir_all(&workspace.reports_dir)?;
        fs::write(
            &report_path,
            format!("{}\n", serde_json::to_string_pretty(&report)?),
        )?;

        log::info!("Wrote diff report to {}", report_path.display());

        Ok(DiffSummary {
            version_a: report.version_a,
            version_b: report.version_b,
            row_count_a: report.summary.row_count_a,
            row_count_b: report.summary.row_count_b,
            row_delta: report.summary.row_delta,
            config_changed: report.summary.config_changed,
            label_distribution_changed: report.label_distribution.changed,
            columns: report.columns,
            report_path,
        })
    }
}
