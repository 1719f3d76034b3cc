//! Commit orchestration: intake, preprocess, hash, dedupe, persist, log, HEAD

use crate::config::{load_config_file, PreprocessConfig, DEFAULT_CONFIG_SENTINEL};
use crate::data::load_dataset;
use crate::error::{LineageError, Result};
use crate::hash::{canonicalize_table, pretty_sorted_json, CommitHashes};
use crate::preprocess::Preprocessor;
use crate::progress::ProgressReporter;
use crate::repo::{PublishOutcome, RepoStore};
use crate::table::{validate_schema, Table};
use crate::version::{
    label_distribution, timestamp_now, Artifacts, DedupeHit, LogEvent, PreprocessStats,
    VersionLoader, VersionMetadata, VersionRecord, CONFIG_SNAPSHOT_FILE, HEAD_SOURCE_PREFIX,
    METADATA_FILE, PROCESSED_FILE, RAW_SNAPSHOT_FILE,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEDUPE_LOG_MESSAGE: &str = "Run recorded. No new version created; existing version reused.";
const DUPLICATE_MESSAGE: &str = "Identical processed output already committed.";
const CREATED_MESSAGE: &str = "New version created.";

/// Archive file name used when the dataset path has no file name
const FALLBACK_ARCHIVE_NAME: &str = "raw_input.csv";

/// Where the input table and configuration of a commit come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// Dataset file with an explicit configuration file
    Raw { dataset: PathBuf, config: PathBuf },
    /// Dataset file with the built-in default configuration
    RawDefault { dataset: PathBuf },
    /// HEAD's processed table reprocessed with a new configuration file
    HeadRecommit { config: PathBuf },
}

impl Intake {
    /// Build an intake from user-typed paths
    pub fn from_user_paths(dataset: Option<&str>, config: Option<&str>) -> Result<Self> {
        let config = config.map(normalize_user_path).filter(|p| !p.is_empty());
        let dataset = dataset.map(normalize_user_path).filter(|p| !p.is_empty());

        match (dataset, config) {
            (Some(dataset), Some(config)) => Ok(Intake::Raw {
                dataset: PathBuf::from(dataset),
                config: PathBuf::from(config),
            }),
            (Some(dataset), None) => Ok(Intake::RawDefault {
                dataset: PathBuf::from(dataset),
            }),
            (None, Some(config)) => Ok(Intake::HeadRecommit {
                config: PathBuf::from(config),
            }),
            (None, None) => Err(LineageError::validation(
                "A dataset path or a configuration file for a HEAD recommit is required",
            )),
        }
    }
}

/// Strip surrounding whitespace and one pair of matching quotes
pub fn normalize_user_path(value: &str) -> String {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2
        && bytes[0] == bytes[bytes.len() - 1]
        && (bytes[0] == b'"' || bytes[0] == b'\'')
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    Created,
    Duplicate,
}

/// Result of a commit attempt; `Duplicate` is a normal outcome
#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub status: CommitStatus,
    pub version_id: String,
    pub parent_id: Option<String>,
    pub head: Option<String>,
    pub rows_before: u64,
    pub rows_after: u64,
    pub version_path: PathBuf,
    pub metadata_path: PathBuf,
    pub message: String,
}

impl CommitOutcome {
    pub fn is_created(&self) -> bool {
        self.status == CommitStatus::Created
    }
}

/// Input table and configuration resolved from an [`Intake`]
struct PreparedInput {
    source_data_path: String,
    source_config_path: String,
    raw_bytes: Vec<u8>,
    raw_table: Table,
    config: PreprocessConfig,
    archive_name: Option<String>,
}

/// Drives a single commit against a repository
pub struct CommitEngine<'a> {
    store: &'a RepoStore,
    progress: ProgressReporter,
}

impl<'a> CommitEngine<'a> {
    pub fn new(store: &'a RepoStore, show_progress: bool) -> Self {
        Self {
            store,
            progress: ProgressReporter::new(show_progress),
        }
    }

    pub fn commit(&mut self, intake: &Intake, message: &str) -> Result<CommitOutcome> {
        let message = message.trim();
        if message.is_empty() {
            return Err(LineageError::validation("Commit message is required"));
        }

        let parent_id = self.store.get_head()?;

        self.progress.start_stage("Loading dataset...");
        let input = self.prepare(intake, parent_id.as_deref())?;
        validate_schema(&input.raw_table)?;

        self.progress.start_stage("Preprocessing...");
        let processed = Preprocessor::new(&input.config).process(&input.raw_table);
        let processed_bytes = canonicalize_table(&processed);
        let hashes = CommitHashes::compute(&input.raw_bytes, &input.config, &processed_bytes)?;

        let rows_before = input.raw_table.row_count() as u64;
        let rows_after = processed.row_count() as u64;

        if self.store.version_exists(&hashes.version_hash) {
            self.progress.finish_stage("Duplicate of an existing version");
            return self.record_duplicate(&input, &hashes, rows_before, rows_after);
        }

        self.progress.start_stage("Writing version...");
        let version_id = hashes.version_hash.clone();
        let workspace = self.store.workspace();
        let archive_path = input
            .archive_name
            .as_deref()
            .map(|name| workspace.raw_archive_path(&version_id, name));

        let metadata = VersionMetadata {
            record: VersionRecord {
                version_id: version_id.clone(),
                parent_id: parent_id.clone(),
                timestamp: timestamp_now(),
                commit_message: message.to_string(),
                source_data_path: input.source_data_path.clone(),
                source_config_path: input.source_config_path.clone(),
                input_hash: hashes.input_hash.clone(),
                config_hash: hashes.config_hash.clone(),
                version_hash: hashes.version_hash.clone(),
                row_count: rows_after,
                label_distribution: label_distribution(&processed),
                eval_metrics: None,
            },
            preprocess_stats: PreprocessStats {
                rows_before,
                rows_after,
                columns_before: names(&input.raw_table),
                columns_after: names(&processed),
            },
            artifacts: Artifacts {
                raw_archive: archive_path.as_deref().map(|p| workspace.relative_to_root(p)),
                ..Artifacts::default()
            },
        };
        let event = LogEvent::Commit(metadata);

        let staged = self.store.begin_staging()?;
        staged.write(RAW_SNAPSHOT_FILE, &input.raw_bytes)?;
        staged.write(PROCESSED_FILE, &processed_bytes)?;
        staged.write(
            CONFIG_SNAPSHOT_FILE,
            pretty_sorted_json(&input.config.to_json_value()?)?.as_bytes(),
        )?;
        staged.write(
            METADATA_FILE,
            format!("{}\n", serde_json::to_string_pretty(&event)?).as_bytes(),
        )?;

        // A published version always has its raw archive
        let new_archive = match &archive_path {
            Some(path) => write_raw_archive(&workspace.raw_data_dir, path, &input.raw_bytes)?,
            None => None,
        };

        if staged.publish(self.store, &version_id)? == PublishOutcome::AlreadyExists {
            if let Some(path) = &new_archive {
                if let Err(e) = fs::remove_file(path) {
                    log::warn!("Could not remove unused archive {}: {}", path.display(), e);
                }
            }
            self.progress.finish_stage("Duplicate of an existing version");
            return self.record_duplicate(&input, &hashes, rows_before, rows_after);
        }

        let version_path = self.store.version_dir(&version_id);
        self.store
            .append_log(&event)
            .and_then(|()| self.store.set_head(&version_id))
            .map_err(|e| {
                LineageError::storage(
                    &version_path,
                    format!(
                        "version {} was published but not recorded in the log and HEAD: {}",
                        version_id, e
                    ),
                )
            })?;
        self.progress.finish_stage("Version committed");

        log::info!(
            "Committed version {} ({} -> {} rows) in {:.2?}",
            version_id,
            rows_before,
            rows_after,
            self.progress.elapsed()
        );

        Ok(CommitOutcome {
            status: CommitStatus::Created,
            head: Some(version_id.clone()),
            metadata_path: version_path.join(METADATA_FILE),
            version_path,
            version_id,
            parent_id,
            rows_before,
            rows_after,
            message: CREATED_MESSAGE.to_string(),
        })
    }

    fn prepare(&self, intake: &Intake, head: Option<&str>) -> Result<PreparedInput> {
        match intake {
            Intake::Raw { dataset, config } => {
                let loaded = load_config_file(config)?;
                self.prepare_raw(dataset, display_path(config), loaded)
            }
            Intake::RawDefault { dataset } => self.prepare_raw(
                dataset,
                DEFAULT_CONFIG_SENTINEL.to_string(),
                PreprocessConfig::default(),
            ),
            Intake::HeadRecommit { config } => {
                let head = head.ok_or_else(|| {
                    LineageError::validation("HEAD is not set; commit a raw dataset first")
                })?;
                if !self.store.version_exists(head) {
                    return Err(LineageError::version_not_found(head));
                }
                let loaded = load_config_file(config)?;
                let version_dir = self.store.version_dir(head);

                Ok(PreparedInput {
                    source_data_path: format!("{}{}", HEAD_SOURCE_PREFIX, head),
                    source_config_path: display_path(config),
                    raw_bytes: VersionLoader::load_processed_bytes(&version_dir)?,
                    raw_table: VersionLoader::load_processed_table(&version_dir)?,
                    config: loaded,
                    archive_name: None,
                })
            }
        }
    }

    fn prepare_raw(
        &self,
        dataset: &Path,
        source_config_path: String,
        config: PreprocessConfig,
    ) -> Result<PreparedInput> {
        if !dataset.is_file() {
            return Err(LineageError::validation(format!(
                "Dataset file not found: {}",
                dataset.display()
            )));
        }

        let raw_bytes = fs::read(dataset)?;
        let raw_table = load_dataset(dataset)?;
        let archive_name = dataset
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_ARCHIVE_NAME)
            .to_string();

        Ok(PreparedInput {
            source_data_path: display_path(dataset),
            source_config_path,
            raw_bytes,
            raw_table,
            config,
            archive_name: Some(archive_name),
        })
    }

    fn record_duplicate(
        &self,
        input: &PreparedInput,
        hashes: &CommitHashes,
        rows_before: u64,
        rows_after: u64,
    ) -> Result<CommitOutcome> {
        self.store.append_log(&LogEvent::DedupeHit(DedupeHit {
            timestamp: timestamp_now(),
            requested_source_data_path: input.source_data_path.clone(),
            requested_source_config_path: input.source_config_path.clone(),
            requested_input_hash: hashes.input_hash.clone(),
            requested_config_hash: hashes.config_hash.clone(),
            resolved_version_id: hashes.version_hash.clone(),
            message: DEDUPE_LOG_MESSAGE.to_string(),
        }))?;

        log::info!("Processed output matches existing version {}", hashes.version_hash);

        let version_path = self.store.version_dir(&hashes.version_hash);
        let metadata = VersionLoader::load_metadata(&version_path).ok();
        Ok(CommitOutcome {
            status: CommitStatus::Duplicate,
            version_id: hashes.version_hash.clone(),
            parent_id: metadata.and_then(|m| m.record.parent_id),
            head: self.store.get_head()?,
            rows_before,
            rows_after,
            metadata_path: version_path.join(METADATA_FILE),
            version_path,
            message: DUPLICATE_MESSAGE.to_string(),
        })
    }
}

/// Write the raw input copy; returns the path when this call created it
fn write_raw_archive(dir: &Path, path: &Path, raw_bytes: &[u8]) -> Result<Option<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| {
        LineageError::storage(dir, format!("cannot create raw data archive directory: {}", e))
    })?;
    if path.exists() {
        return Ok(None);
    }
    fs::write(path, raw_bytes)?;
    Ok(Some(path.to_path_buf()))
}

fn names(table: &Table) -> Vec<String> {
    table.column_names().into_iter().map(String::from).collect()
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
