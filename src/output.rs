//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and batch summaries. This module abstracts away output details,
//! making it easy to change formatting globally.

use crate::rules::RuleStore;
use crate::sorter::{BatchReport, BatchSource, FileReport, MoveResult, SortObserver};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// OutputFormatter::success("Rule added");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates and returns a progress bar for file operations.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items to process
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints the rule list: position, label and destination path.
    pub fn rule_list(store: &RuleStore) {
        if store.is_empty() {
            Self::info("No folder rules yet. Add one with 'filesorter add <FOLDER> <EXTENSIONS>'.");
            return;
        }

        Self::header("FOLDER RULES");
        for (index, (view, rule)) in store.views().iter().zip(store.rules()).enumerate() {
            println!("  [{}] {}", (index + 1).to_string().bold(), view.label);
            println!("      {}", view.tooltip.dimmed());
            if rule.extensions.is_empty() {
                println!("      {}", "accepts nothing".yellow());
            } else {
                println!("      edit text: {}", rule.extension_text());
            }
        }
    }

    /// Prints the counters of one batch.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// use filesorter::sorter::{BatchReport, BatchSource, SortOutcome};
    ///
    /// let report = BatchReport {
    ///     source: BatchSource::Files(3),
    ///     outcome: SortOutcome { moved: 2, skipped: 1, errors: 0 },
    ///     files: Vec::new(),
    /// };
    /// OutputFormatter::batch_summary(&report, false);
    /// ```
    pub fn batch_summary(report: &BatchReport, dry_run: bool) {
        let title = match &report.source {
            BatchSource::Directory(dir) => format!("Sorting complete: {}", dir.display()),
            BatchSource::Files(_) => "Sorting complete: selected files".to_string(),
        };
        if dry_run {
            Self::dry_run_notice(&title);
        } else {
            Self::header(&title);
        }

        let outcome = &report.outcome;
        let moved_label = if dry_run { "Would move" } else { "Moved" };
        println!("  {:<10} {}", format!("{}:", moved_label), outcome.moved.to_string().green());
        println!("  {:<10} {}", "Skipped:", outcome.skipped.to_string().yellow());
        let errors = outcome.errors.to_string();
        if outcome.errors > 0 {
            println!("  {:<10} {}", "Errors:", errors.red().bold());
        } else {
            println!("  {:<10} {}", "Errors:", errors);
        }
    }

    /// Prints one line per processed file.
    pub fn file_lines(report: &BatchReport) {
        for file in &report.files {
            let name = file
                .source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.source.display().to_string());
            match (file.result, &file.destination) {
                (MoveResult::Moved, Some(dest)) => {
                    println!("   {} {} → {}", "✓".green(), name, dest.display())
                }
                (MoveResult::Skipped, _) => println!("   {} {} (no rule)", "-".dimmed(), name),
                _ => eprintln!("   {} {}", "✗".red(), name),
            }
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("\n{}", format!("[DRY RUN] {}", message).yellow());
    }
}

/// Drives an indicatif progress bar from sorter events.
pub struct ProgressObserver {
    bar: Option<ProgressBar>,
    enabled: bool,
}

impl ProgressObserver {
    pub fn new(enabled: bool) -> Self {
        Self { bar: None, enabled }
    }
}

impl SortObserver for ProgressObserver {
    fn batch_started(&mut self, _source: &BatchSource, candidates: usize) {
        if self.enabled && candidates > 0 {
            self.bar = Some(OutputFormatter::create_progress_bar(candidates as u64));
        }
    }

    fn file_sorted(&mut self, report: &FileReport) {
        if let Some(bar) = &self.bar {
            if let Some(name) = report.source.file_name() {
                bar.set_message(name.to_string_lossy().to_string());
            }
            bar.inc(1);
        }
    }

    fn batch_finished(&mut self, _report: &BatchReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
