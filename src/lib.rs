//! # datalineage
//!
//! Content-addressed version tracking for tabular datasets. Every commit runs
//! a fixed, deterministic preprocessing pipeline and identifies the result by
//! the SHA-256 of its canonical bytes, so identical processed output is stored
//! once no matter how it was produced.

pub mod cli;
pub mod commands;
pub mod commit;
pub mod config;
pub mod data;
pub mod diff;
pub mod error;
pub mod hash;
pub mod output;
pub mod preprocess;
pub mod progress;
pub mod repo;
pub mod resolver;
pub mod table;
pub mod version;
pub mod workspace;

pub use commit::{CommitEngine, CommitOutcome, CommitStatus, Intake};
pub use config::PreprocessConfig;
pub use diff::{DiffEngine, DiffReport, DiffSummary};
pub use error::{LineageError, Result};
pub use repo::RepoStore;
pub use resolver::VersionResolver;
pub use table::Table;
pub use workspace::LineageWorkspace;

/// Current format version of the repository layout
pub const FORMAT_VERSION: &str = "1.0.0";
