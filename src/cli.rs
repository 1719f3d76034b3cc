//! Command-line interface for datalineage

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "datalineage")]
#[command(about = "Content-addressed version control for tabular datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override project root location
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a datalineage repository
    Init {
        /// Rewrite repository metadata even if the repository exists
        #[arg(long)]
        force: bool,
    },

    /// Show repository status
    Status {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Preprocess a dataset and commit it as a new version
    Commit {
        /// Dataset file (csv, tsv, json, jsonl, parquet)
        #[arg(required_unless_present = "from_head", conflicts_with = "from_head")]
        dataset: Option<String>,

        /// Preprocessing configuration (.json); built-in defaults when omitted
        #[arg(long, short = 'c')]
        config: Option<String>,

        /// Reprocess the current HEAD version with a new configuration
        #[arg(long, requires = "config")]
        from_head: bool,

        /// Commit message
        #[arg(long, short = 'm')]
        message: String,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// List committed versions
    Log {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Include dedupe events
        #[arg(long)]
        all: bool,
    },

    /// Show one version's record
    Show {
        /// Version reference: HEAD, HEAD~N, full id or id prefix
        #[arg(default_value = "HEAD")]
        version: String,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Move HEAD to an existing version
    Checkout {
        /// Version reference: HEAD~N, full id or id prefix
        version: String,
    },

    /// Compare two versions
    Diff {
        /// First version reference
        version_a: String,

        /// Second version reference
        version_b: String,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}
