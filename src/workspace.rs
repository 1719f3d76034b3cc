//! Repository layout and bootstrap for datalineage projects

use crate::error::{LineageError, Result};
use crate::hash::short_id;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the repository directory under the project root
pub const REPO_DIR_NAME: &str = ".datalineage";

/// Paths of a datalineage project
#[derive(Debug, Clone)]
pub struct LineageWorkspace {
    /// Project root directory (where .datalineage/ lives)
    pub root: PathBuf,
    /// .datalineage/ directory path
    pub repo_dir: PathBuf,
    /// .datalineage/versions/ directory path
    pub versions_dir: PathBuf,
    /// .datalineage/staging/ directory path
    pub staging_dir: PathBuf,
    pub head_path: PathBuf,
    pub log_path: PathBuf,
    pub meta_path: PathBuf,
    /// raw_data/ archive of committed inputs
    pub raw_data_dir: PathBuf,
    /// reports/ directory for diff reports
    pub reports_dir: PathBuf,
}

impl LineageWorkspace {
    /// Find an initialized workspace starting at `start_dir` (or the current directory)
    pub fn locate(start_dir: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let start = start_dir.unwrap_or(&current_dir);

        match Self::find_existing(start)? {
            Some(workspace) => Ok(workspace),
            None => Err(LineageError::not_initialized(start.join(REPO_DIR_NAME))),
        }
    }

    /// Find existing .datalineage workspace by walking up directory tree
    fn find_existing(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir;

        loop {
            let repo_dir = current.join(REPO_DIR_NAME);
            if repo_dir.is_dir() {
                return Ok(Some(Self::from_root(current.to_path_buf())));
            }

            // A git checkout marks the project boundary
            if current.join(".git").exists() {
                break;
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(None)
    }

    /// Create the repository structure under `root`.
    ///
    /// Existing HEAD and log files are never touched. `force` only rewrites
    /// `repo_meta.json`.
    pub fn init(root: PathBuf, force: bool) -> Result<Self> {
        let workspace = Self::from_root(root);

        fs::create_dir_all(&workspace.versions_dir)?;

        if !workspace.head_path.exists() {
            fs::write(&workspace.head_path, "")?;
        }
        if !workspace.log_path.exists() {
            fs::write(&workspace.log_path, "[]\n")?;
        }
        workspace.create_meta_with_force(force)?;

        log::info!(
            "Initialized datalineage repository at: {}",
            workspace.repo_dir.display()
        );

        Ok(workspace)
    }

    /// Workspace paths for a project root; nothing is created
    pub fn from_root(root: PathBuf) -> Self {
        let repo_dir = root.join(REPO_DIR_NAME);
        Self {
            versions_dir: repo_dir.join("versions"),
            staging_dir: repo_dir.join("staging"),
            head_path: repo_dir.join("HEAD"),
            log_path: repo_dir.join("logs.json"),
            meta_path: repo_dir.join("repo_meta.json"),
            raw_data_dir: root.join("raw_data"),
            reports_dir: root.join("reports"),
            repo_dir,
            root,
        }
    }

    /// Paths that must exist before a repository can be opened
    pub fn required_paths(&self) -> [&Path; 5] {
        [
            &self.repo_dir,
            &self.versions_dir,
            &self.head_path,
            &self.log_path,
            &self.meta_path,
        ]
    }

    pub fn is_initialized(&self) -> bool {
        self.required_paths().iter().all(|p| p.exists())
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir.join(version_id)
    }

    /// Archive path for a raw input: `raw_data/<id8>__<filename>`
    pub fn raw_archive_path(&self, version_id: &str, file_name: &str) -> PathBuf {
        self.raw_data_dir
            .join(format!("{}__{}", short_id(version_id), file_name))
    }

    /// Report path for a comparison: `reports/diff_<a8>__<b8>.json`
    pub fn report_path(&self, version_a: &str, version_b: &str) -> PathBuf {
        self.reports_dir.join(format!(
            "diff_{}__{}.json",
            short_id(version_a),
            short_id(version_b)
        ))
    }

    /// Path relative to the project root, for recording in metadata
    pub fn relative_to_root(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Write repository metadata with optional force overwrite
    pub fn create_meta_with_force(&self, force: bool) -> Result<()> {
        if self.meta_path.exists() && !force {
            return Ok(());
        }

        let meta = serde_json::json!({
            "format_version": crate::FORMAT_VERSION,
            "created": crate::version::timestamp_now(),
            "tool_version": env!("CARGO_PKG_VERSION"),
        });

        fs::write(&self.meta_path, format!("{}\n", serde_json::to_string_pretty(&meta)?))?;
        Ok(())
    }

    /// Get workspace statistics
    pub fn stats(&self) -> Result<WorkspaceStats> {
        let mut stats = WorkspaceStats::default();

        if self.versions_dir.exists() {
            for entry in fs::read_dir(&self.versions_dir)? {
                if entry?.file_type()?.is_dir() {
                    stats.version_count += 1;
                }
            }
            stats.total_version_size = dir_size(&self.versions_dir)?;
        }

        if self.raw_data_dir.exists() {
            stats.total_raw_archive_size = dir_size(&self.raw_data_dir)?;
        }

        if self.reports_dir.exists() {
            for entry in WalkDir::new(&self.reports_dir) {
                let entry = entry?;
                if entry.file_type().is_file() {
                    stats.report_count += 1;
                    stats.total_report_size += entry.metadata()?.len();
                }
            }
        }

        Ok(stats)
    }
}

fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Statistics about the workspace
#[derive(Debug, Default, Serialize)]
pub struct WorkspaceStats {
    pub version_count: usize,
    pub report_count: usize,
    pub total_version_size: u64,
    pub total_raw_archive_size: u64,
    pub total_report_size: u64,
}
