//! Command implementations for datalineage CLI

use crate::cli::{Commands, OutputFormat};
use crate::commit::{normalize_user_path, CommitEngine, Intake};
use crate::diff::DiffEngine;
use crate::error::{LineageError, Result};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::repo::RepoStore;
use crate::resolver::VersionResolver;
use crate::workspace::LineageWorkspace;
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands, workspace_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Init { force } => init_command(workspace_path, force),
        Commands::Status { format } => status_command(workspace_path, &format),
        Commands::Commit {
            dataset,
            config,
            from_head,
            message,
            format,
        } => commit_command(
            workspace_path,
            dataset.as_deref(),
            config.as_deref(),
            from_head,
            &message,
            &format,
        ),
        Commands::Log { format, all } => log_command(workspace_path, &format, all),
        Commands::Show { version, format } => show_command(workspace_path, &version, &format),
        Commands::Checkout { version } => checkout_command(workspace_path, &version),
        Commands::Diff {
            version_a,
            version_b,
            format,
        } => diff_command(workspace_path, &version_a, &version_b, &format),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(LineageError::validation)
}

fn open_store(workspace_path: Option<&Path>) -> Result<RepoStore> {
    RepoStore::open(LineageWorkspace::locate(workspace_path)?)
}

/// Initialize a datalineage repository
fn init_command(workspace_path: Option<&Path>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let root = workspace_path.unwrap_or(&current_dir);

    // Always initialize in the given directory, never in a parent
    let workspace = LineageWorkspace::init(root.to_path_buf(), force)?;

    println!(
        "✅ Initialized datalineage repository at: {}",
        workspace.root.display()
    );
    println!("📁 Repository directory: {}", workspace.repo_dir.display());

    Ok(())
}

fn status_command(workspace_path: Option<&Path>, format: &str) -> Result<()> {
    let output_format = parse_format(format)?;
    let store = open_store(workspace_path)?;
    let status = store.status()?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_status(&status),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&status)?),
    }

    Ok(())
}

fn commit_command(
    workspace_path: Option<&Path>,
    dataset: Option<&str>,
    config: Option<&str>,
    from_head: bool,
    message: &str,
    format: &str,
) -> Result<()> {
    let output_format = parse_format(format)?;
    let store = open_store(workspace_path)?;

    let intake = if from_head {
        let config = config
            .map(normalize_user_path)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                LineageError::validation("A configuration file is required to commit from HEAD")
            })?;
        Intake::HeadRecommit {
            config: PathBuf::from(config),
        }
    } else {
        Intake::from_user_paths(dataset, config)?
    };

    let show_progress = matches!(output_format, OutputFormat::Pretty);
    let outcome = CommitEngine::new(&store, show_progress).commit(&intake, message)?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_commit_outcome(&outcome),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&outcome)?),
    }

    Ok(())
}

/// List committed versions, or every log event with `all`
fn log_command(workspace_path: Option<&Path>, format: &str, all: bool) -> Result<()> {
    let output_format = parse_format(format)?;
    let store = open_store(workspace_path)?;
    let head = store.get_head()?;

    if all {
        let events = store.read_log();
        match output_format {
            OutputFormat::Pretty => PrettyPrinter::print_log_events(&events, head.as_deref()),
            OutputFormat::Json => println!("{}", JsonFormatter::format(&events)?),
        }
    } else {
        let versions = store.commit_records();
        match output_format {
            OutputFormat::Pretty => PrettyPrinter::print_version_list(&versions, head.as_deref()),
            OutputFormat::Json => println!("{}", JsonFormatter::format(&versions)?),
        }
    }

    Ok(())
}

fn show_command(workspace_path: Option<&Path>, version: &str, format: &str) -> Result<()> {
    let output_format = parse_format(format)?;
    let store = open_store(workspace_path)?;
    let version_id = VersionResolver::new(&store).resolve_str(version)?;
    let metadata = store.find_record(&version_id)?;

    match output_format {
        OutputFormat::Pretty => {
            let is_head = store.get_head()?.as_deref() == Some(version_id.as_str());
            PrettyPrinter::print_version(&metadata, is_head);
        }
        OutputFormat::Json => println!("{}", JsonFormatter::format(&metadata)?),
    }

    Ok(())
}

fn checkout_command(workspace_path: Option<&Path>, version: &str) -> Result<()> {
    let store = open_store(workspace_path)?;
    let version_id = VersionResolver::new(&store).resolve_str(version)?;
    let previous = store.checkout(&version_id)?;

    PrettyPrinter::print_checkout(previous.as_deref(), &version_id);
    Ok(())
}

fn diff_command(
    workspace_path: Option<&Path>,
    version_a: &str,
    version_b: &str,
    format: &str,
) -> Result<()> {
    let output_format = parse_format(format)?;
    let store = open_store(workspace_path)?;
    let resolver = VersionResolver::new(&store);
    let id_a = resolver.resolve_str(version_a)?;
    let id_b = resolver.resolve_str(version_b)?;

    let summary = DiffEngine::new(&store).compare(&id_a, &id_b)?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_diff_summary(&summary),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&summary)?),
    }

    Ok(())
}
