//! Durable repository state: HEAD pointer, append-only event log and
//! write-once version directories.
//!
//! All writes of shared files go through write-temp-then-rename so a crash
//! never leaves a partially written HEAD or log. Version directories are
//! assembled under `staging/` and published with a single rename. There is
//! no locking: concurrent writers can lose HEAD or log updates.

use crate::error::{LineageError, Result};
use crate::hash::is_version_id;
use crate::version::{LogEvent, VersionLoader, VersionMetadata};
use crate::workspace::{LineageWorkspace, WorkspaceStats};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// HEAD contents that mean "no HEAD"
const EMPTY_HEAD_MARKERS: &[&str] = &["", "null", "None"];

/// Handle to an initialized repository
#[derive(Debug, Clone)]
pub struct RepoStore {
    workspace: LineageWorkspace,
}

impl RepoStore {
    /// Open a repository; the bootstrap layout must already exist
    pub fn open(workspace: LineageWorkspace) -> Result<Self> {
        if !workspace.is_initialized() {
            return Err(LineageError::not_initialized(&workspace.repo_dir));
        }
        Ok(Self { workspace })
    }

    pub fn workspace(&self) -> &LineageWorkspace {
        &self.workspace
    }

    pub fn get_head(&self) -> Result<Option<String>> {
        let raw = fs::read_to_string(&self.workspace.head_path)?;
        let value = raw.trim();
        if EMPTY_HEAD_MARKERS.contains(&value) {
            Ok(None)
        } else {
            Ok(Some(value.to_string()))
        }
    }

    pub fn set_head(&self, version_id: &str) -> Result<()> {
        write_atomic(&self.workspace.head_path, format!("{}\n", version_id).as_bytes())
    }

    /// Read the event log.
    ///
    /// Never fails: a missing, empty or malformed log reads as empty, and
    /// individual entries that do not parse are skipped.
    pub fn read_log(&self) -> Vec<LogEvent> {
        match self.read_raw_log() {
            LogState::Entries(entries) => entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value(entry) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        log::debug!("Skipping unreadable log entry: {}", e);
                        None
                    }
                })
                .collect(),
            LogState::Missing | LogState::Corrupt => Vec::new(),
        }
    }

    fn read_raw_log(&self) -> LogState {
        let content = match fs::read_to_string(&self.workspace.log_path) {
            Ok(content) => content,
            Err(_) => return LogState::Missing,
        };
        if content.trim().is_empty() {
            return LogState::Missing;
        }
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Array(entries)) => LogState::Entries(entries),
            _ => LogState::Corrupt,
        }
    }

    /// Append one event, rewriting the whole log file
    pub fn append_log(&self, event: &LogEvent) -> Result<()> {
        let mut entries = match self.read_raw_log() {
            LogState::Entries(entries) => entries,
            LogState::Missing => Vec::new(),
            LogState::Corrupt => {
                let aside = self.set_aside_corrupt_log()?;
                log::warn!(
                    "Event log was not a JSON array; moved to {} and started a new log",
                    aside.display()
                );
                Vec::new()
            }
        };

        entries.push(serde_json::to_value(event)?);
        let text = format!("{}\n", serde_json::to_string_pretty(&entries)?);
        write_atomic(&self.workspace.log_path, text.as_bytes())
    }

    fn set_aside_corrupt_log(&self) -> Result<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let aside = self
            .workspace
            .log_path
            .with_file_name(format!("logs.json.corrupt-{}", stamp));
        fs::rename(&self.workspace.log_path, &aside)?;
        Ok(aside)
    }

    /// True when `version_id` names a published version directory
    pub fn version_exists(&self, version_id: &str) -> bool {
        is_version_id(version_id) && self.version_dir(version_id).is_dir()
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.workspace.version_dir(version_id)
    }

    /// Ids of all published versions, sorted
    pub fn list_version_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.workspace.versions_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_version_id(name) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Create a fresh staging directory for a new version
    pub fn begin_staging(&self) -> Result<StagedVersion> {
        let path = self
            .workspace
            .staging_dir
            .join(uuid::Uuid::new_v4().to_string());
        fs::create_dir_all(&path)?;
        log::debug!("Staging new version in {}", path.display());
        Ok(StagedVersion {
            path,
            published: false,
        })
    }

    /// Set HEAD to an existing version and return the previous HEAD
    pub fn checkout(&self, version_id: &str) -> Result<Option<String>> {
        if !self.version_exists(version_id) {
            return Err(LineageError::version_not_found(version_id));
        }
        let previous = self.get_head()?;
        self.set_head(version_id)?;
        log::info!("HEAD moved to {}", version_id);
        Ok(previous)
    }

    /// Commit events from the log, in log order
    pub fn commit_records(&self) -> Vec<VersionMetadata> {
        self.read_log()
            .iter()
            .filter_map(LogEvent::as_commit)
            .cloned()
            .collect()
    }

    /// Snapshot of repository state for display
    pub fn status(&self) -> Result<RepoStatus> {
        Ok(RepoStatus {
            project_root: self.workspace.root.clone(),
            repo_dir: self.workspace.repo_dir.clone(),
            versions_dir: self.workspace.versions_dir.clone(),
            head: self.get_head()?,
            log_entries: self.read_log().len(),
            stats: self.workspace.stats()?,
        })
    }

    /// Metadata of one version, from the log or else from `metadata.json`
    pub fn find_record(&self, version_id: &str) -> Result<VersionMetadata> {
        if !self.version_exists(version_id) {
            return Err(LineageError::version_not_found(version_id));
        }
        if let Some(metadata) = self
            .commit_records()
            .into_iter()
            .rev()
            .find(|m| m.record.version_id == version_id)
        {
            return Ok(metadata);
        }
        VersionLoader::load_metadata(self.version_dir(version_id))
    }
}

#[derive(Debug, Serialize)]
pub struct RepoStatus {
    pub project_root: PathBuf,
    pub repo_dir: PathBuf,
    pub versions_dir: PathBuf,
    pub head: Option<String>,
    pub log_entries: usize,
    pub stats: WorkspaceStats,
}

enum LogState {
    Missing,
    Entries(Vec<serde_json::Value>),
    Corrupt,
}

/// Outcome of publishing a staged version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    AlreadyExists,
}

/// A version directory under construction; removed on drop unless published
#[derive(Debug)]
pub struct StagedVersion {
    path: PathBuf,
    published: bool,
}

impl StagedVersion {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, file_name: &str, contents: &[u8]) -> Result<()> {
        fs::write(self.path.join(file_name), contents)?;
        Ok(())
    }

    /// Move the staged directory to `versions/<version_id>` with one rename
    pub fn publish(mut self, store: &RepoStore, version_id: &str) -> Result<PublishOutcome> {
        let target = store.version_dir(version_id);
        if target.exists() {
            return Ok(PublishOutcome::AlreadyExists);
        }

        match fs::rename(&self.path, &target) {
            Ok(()) => {
                self.published = true;
                Ok(PublishOutcome::Published)
            }
            Err(_) if target.exists() => Ok(PublishOutcome::AlreadyExists),
            Err(e) => Err(LineageError::storage(
                &target,
                format!("failed to publish staged version: {}", e),
            )),
        }
    }
}

impl Drop for StagedVersion {
    fn drop(&mut self) {
        if !self.published && self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                log::warn!(
                    "Could not remove staging directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Replace `path` with `contents` via a sibling temp file and a rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LineageError::storage(path, "path has no file name"))?;
    let tmp = path.with_file_name(format!("{}.tmp", file_name));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
