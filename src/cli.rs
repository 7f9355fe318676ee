//! Command-line interface module for filesorter.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing
//! - Loading settings and the rule list
//! - Rule management (add, edit, remove, list, open)
//! - Sorting orchestration and result reporting
//!
//! The CLI never keeps rule state of its own: it reads the [`RuleStore`],
//! refers to rules by position, and saves the store after every change.

use crate::config::Settings;
use crate::output::{OutputFormatter, ProgressObserver};
use crate::rules::{RuleError, RuleStore};
use crate::sorter::{SortError, SortRequest, Sorter};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Message shown when a sort is attempted without any rule.
pub const NO_RULES_MESSAGE: &str =
    "No rules: add at least one folder with allowed extensions first.";

/// Move files into folders according to extension rules.
#[derive(Parser, Debug)]
#[command(name = "filesorter", author, version, about)]
pub struct Cli {
    /// Path to a settings file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the rules file (overrides the settings)
    #[arg(long, value_name = "FILE", global = true)]
    pub rules_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a destination folder and the extensions it accepts
    Add {
        /// Destination folder; created on first use
        folder: PathBuf,
        /// Comma-separated extensions, e.g. "jpg, png, pdf"
        extensions: Option<String>,
    },
    /// Replace the extensions of a rule
    Edit {
        /// Rule number as shown by `list`
        index: usize,
        /// Comma-separated extensions
        extensions: String,
    },
    /// Remove a rule
    Remove {
        /// Rule number as shown by `list`
        index: usize,
    },
    /// List all rules
    List,
    /// Sort picked files and folders: files first, then every folder
    Sort {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Show where files would go without moving anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Sort dropped paths: the first folder if there is one, otherwise the files
    Drop {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Show where files would go without moving anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Open a rule's destination folder in the file manager
    Open {
        /// Rule number as shown by `list`
        index: usize,
    },
    /// Print the location of the rules file
    Where,
}

/// Runs the CLI application.
///
/// Loads settings, resolves and loads the rules file (recovering from a
/// malformed one), then executes the command.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filesorter::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["filesorter", "sort", "/home/me/Downloads"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {:#}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Error loading settings")?;
    let rules_file = settings
        .rules_file(cli.rules_file.as_deref())
        .context("Could not determine where to keep the rules file")?;
    debug!(rules_file = %rules_file.display(), "Using rules file");

    let mut store = RuleStore::load_or_recover(&rules_file)
        .with_context(|| format!("Error loading rules from {}", rules_file.display()))?;

    run_command(cli.command, &mut store, &settings)
}

/// Executes one command against an already loaded store.
pub fn run_command(command: Command, store: &mut RuleStore, settings: &Settings) -> Result<()> {
    match command {
        Command::Add { folder, extensions } => add_rule(store, &folder, extensions.as_deref()),
        Command::Edit { index, extensions } => edit_rule(store, index, &extensions),
        Command::Remove { index } => remove_rule(store, index),
        Command::List => {
            OutputFormatter::rule_list(store);
            Ok(())
        }
        Command::Sort { paths, dry_run } => {
            sort_request(store, settings, SortRequest::Selected(paths), dry_run)
        }
        Command::Drop { paths, dry_run } => {
            sort_request(store, settings, SortRequest::Dropped(paths), dry_run)
        }
        Command::Open { index } => open_rule(store, index),
        Command::Where => {
            OutputFormatter::plain(&store.file_path().display().to_string());
            Ok(())
        }
    }
}

fn add_rule(store: &mut RuleStore, folder: &Path, extensions: Option<&str>) -> Result<()> {
    let folder = std::path::absolute(folder)
        .with_context(|| format!("Invalid folder path {}", folder.display()))?;
    let folder = folder.to_string_lossy();

    match store.add(&folder, extensions.unwrap_or_default()) {
        Ok(rule) => {
            let label = rule.label();
            if rule.extensions.is_empty() {
                OutputFormatter::warning("No extensions given: this folder accepts nothing yet.");
            }
            save(store)?;
            OutputFormatter::success(&format!("Added {}", label));
            Ok(())
        }
        Err(RuleError::Duplicate { path }) => {
            OutputFormatter::info(&format!("A rule for {} already exists, nothing changed.", path));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn edit_rule(store: &mut RuleStore, index: usize, extensions: &str) -> Result<()> {
    let position = position(store, index)?;
    let label = store.edit(position, extensions)?.label();
    save(store)?;
    OutputFormatter::success(&format!("Updated {}", label));
    Ok(())
}

fn remove_rule(store: &mut RuleStore, index: usize) -> Result<()> {
    let position = position(store, index)?;
    let removed = store.remove(position)?;
    save(store)?;
    OutputFormatter::success(&format!("Removed {}", removed.name));
    Ok(())
}

fn open_rule(store: &RuleStore, index: usize) -> Result<()> {
    let position = position(store, index)?;
    let rule = store
        .get(position)
        .with_context(|| format!("No rule number {}", index))?;

    let folder = Path::new(&rule.path);
    if !folder.is_dir() {
        bail!(
            "{} does not exist yet; it is created when the first file is sorted into it",
            folder.display()
        );
    }
    open::that(folder).with_context(|| format!("Could not open {}", folder.display()))?;
    Ok(())
}

fn sort_request(
    store: &RuleStore,
    settings: &Settings,
    request: SortRequest,
    dry_run: bool,
) -> Result<()> {
    let sorter = Sorter::new(store).dry_run(dry_run);
    let mut observer = ProgressObserver::new(settings.progress);

    let report = match sorter.handle(&request, &mut observer) {
        Ok(report) => report,
        Err(SortError::NoRules) => {
            OutputFormatter::info(NO_RULES_MESSAGE);
            return Ok(());
        }
        Err(e) => return Err(e).context("Sorting stopped"),
    };

    if report.is_empty() {
        OutputFormatter::info("Nothing to sort: no existing files or folders were given.");
        return Ok(());
    }

    for batch in &report.batches {
        if settings.list_files || dry_run {
            OutputFormatter::file_lines(batch);
        }
        OutputFormatter::batch_summary(batch, dry_run);
        if batch.outcome.errors > 0 {
            OutputFormatter::warning("Some files could not be moved. Run with --verbose for details.");
        }
    }

    for failure in &report.failures {
        OutputFormatter::error(&failure.to_string());
    }
    if !report.failures.is_empty() {
        bail!(
            "{} of the given folders could not be sorted",
            report.failures.len()
        );
    }
    Ok(())
}

/// Converts a 1-based rule number from the command line to a list position.
fn position(store: &RuleStore, index: usize) -> Result<usize> {
    match index.checked_sub(1) {
        Some(position) if position < store.len() => Ok(position),
        _ => bail!(
            "No rule number {} (there {} {})",
            index,
            if store.len() == 1 { "is" } else { "are" },
            store.len()
        ),
    }
}

fn save(store: &RuleStore) -> Result<()> {
    store
        .save()
        .with_context(|| format!("Error saving rules to {}", store.file_path().display()))
}
