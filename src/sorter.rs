//! The sorting engine.
//!
//! Files are classified by their suffix against the [`RuleStore`] and moved into
//! the destination folder of the first matching rule. Work happens in batches:
//! either the direct contents of one directory or an explicit list of files.
//! Every file in a batch ends up counted as exactly one of moved, skipped or
//! error, and a failure on one file never stops the rest of the batch.

use crate::collision::resolve_collision;
use crate::extensions::split_suffix;
use crate::rules::RuleStore;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a whole batch is refused.
#[derive(Debug, Error)]
pub enum SortError {
    /// The rule list is empty; nothing was touched.
    #[error("no rules configured")]
    NoRules,
    /// The source directory could not be listed.
    #[error("cannot read directory {}: {source}", .path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-file failures. These are logged and counted, never returned.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} has no usable file name", .path.display())]
    NoFileName { path: PathBuf },
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    Moved,
    Skipped,
    Error,
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub source: PathBuf,
    pub result: MoveResult,
    /// Final location for moved files (planned location on a dry run).
    pub destination: Option<PathBuf>,
}

/// Counters for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortOutcome {
    pub moved: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl SortOutcome {
    /// Increments the counter matching `result`.
    pub fn record(&mut self, result: MoveResult) {
        match result {
            MoveResult::Moved => self.moved += 1,
            MoveResult::Skipped => self.skipped += 1,
            MoveResult::Error => self.errors += 1,
        }
    }

    /// Number of files processed.
    pub fn total(&self) -> usize {
        self.moved + self.skipped + self.errors
    }
}

/// Where the candidates of a batch came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// Direct entries of a directory.
    Directory(PathBuf),
    /// An explicit list of paths, with its length.
    Files(usize),
}

/// Result of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub source: BatchSource,
    pub outcome: SortOutcome,
    pub files: Vec<FileReport>,
}

/// Everything one request produced: the batches that ran and the
/// directories that could not be listed.
#[derive(Debug, Default)]
pub struct RequestReport {
    pub batches: Vec<BatchReport>,
    pub failures: Vec<SortError>,
}

impl RequestReport {
    /// Whether nothing ran and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.failures.is_empty()
    }

    fn push(&mut self, result: Result<BatchReport, SortError>) {
        match result {
            Ok(batch) => self.batches.push(batch),
            Err(e) => {
                warn!("{}", e);
                self.failures.push(e);
            }
        }
    }
}

/// Paths handed over by the shell, tagged with how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortRequest {
    /// Dropped paths: if any is a directory, only the first directory is
    /// sorted; otherwise the files are sorted as one batch.
    Dropped(Vec<PathBuf>),
    /// Picked paths: files form one batch, then every directory is sorted as
    /// its own batch, in the order given.
    Selected(Vec<PathBuf>),
}

/// Hooks called while a batch runs. All methods default to doing nothing.
pub trait SortObserver {
    fn batch_started(&mut self, _source: &BatchSource, _candidates: usize) {}
    fn file_sorted(&mut self, _report: &FileReport) {}
    fn batch_finished(&mut self, _report: &BatchReport) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl SortObserver for NoopObserver {}

/// Sorts files according to a rule store.
pub struct Sorter<'a> {
    rules: &'a RuleStore,
    dry_run: bool,
}

impl<'a> Sorter<'a> {
    pub fn new(rules: &'a RuleStore) -> Self {
        Self {
            rules,
            dry_run: false,
        }
    }

    /// When enabled, destinations are computed but nothing is created or moved.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sorts the regular files directly inside `dir`. Subdirectories are
    /// ignored, not descended into.
    ///
    /// # Errors
    ///
    /// Returns `SortError::NoRules` without touching anything when the rule
    /// list is empty, and `SortError::UnreadableDirectory` when `dir` cannot
    /// be listed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filesorter::rules::RuleStore;
    /// use filesorter::sorter::Sorter;
    /// use std::path::Path;
    ///
    /// let mut store = RuleStore::new("rules.json");
    /// store.add("/home/me/Pictures", "jpg, png").unwrap();
    ///
    /// let report = Sorter::new(&store).sort_directory(Path::new("/home/me/Downloads")).unwrap();
    /// println!("moved {}", report.outcome.moved);
    /// ```
    pub fn sort_directory(&self, dir: &Path) -> Result<BatchReport, SortError> {
        self.sort_directory_observed(dir, &mut NoopObserver)
    }

    /// [`Sorter::sort_directory`] with progress hooks.
    pub fn sort_directory_observed(
        &self,
        dir: &Path,
        observer: &mut dyn SortObserver,
    ) -> Result<BatchReport, SortError> {
        self.ensure_rules()?;

        let entries = fs::read_dir(dir).map_err(|source| SortError::UnreadableDirectory {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        candidates.sort();

        debug!(dir = %dir.display(), candidates = candidates.len(), "Sorting directory");
        Ok(self.run_batch(BatchSource::Directory(dir.to_path_buf()), candidates, observer))
    }

    /// Sorts an explicit list of files. Paths that do not exist or are not
    /// regular files are left out without being counted.
    ///
    /// # Errors
    ///
    /// Returns `SortError::NoRules` without touching anything when the rule
    /// list is empty.
    pub fn sort_files(&self, paths: &[PathBuf]) -> Result<BatchReport, SortError> {
        self.sort_files_observed(paths, &mut NoopObserver)
    }

    /// [`Sorter::sort_files`] with progress hooks.
    pub fn sort_files_observed(
        &self,
        paths: &[PathBuf],
        observer: &mut dyn SortObserver,
    ) -> Result<BatchReport, SortError> {
        self.ensure_rules()?;

        let candidates: Vec<PathBuf> = paths.iter().filter(|path| path.is_file()).cloned().collect();
        if candidates.len() < paths.len() {
            debug!(
                ignored = paths.len() - candidates.len(),
                "Ignoring paths that are not existing regular files"
            );
        }

        Ok(self.run_batch(BatchSource::Files(paths.len()), candidates, observer))
    }

    /// Dispatches a shell request to the batch entry points.
    ///
    /// # Errors
    ///
    /// Returns `SortError::NoRules` before any batch starts when the rule list
    /// is empty. A directory that cannot be listed is recorded in
    /// [`RequestReport::failures`] and the remaining batches still run.
    pub fn handle(
        &self,
        request: &SortRequest,
        observer: &mut dyn SortObserver,
    ) -> Result<RequestReport, SortError> {
        self.ensure_rules()?;

        let mut report = RequestReport::default();
        match request {
            SortRequest::Dropped(paths) => {
                if let Some(dir) = paths.iter().find(|path| path.is_dir()) {
                    report.push(self.sort_directory_observed(dir, observer));
                } else {
                    let files: Vec<PathBuf> =
                        paths.iter().filter(|path| path.is_file()).cloned().collect();
                    if !files.is_empty() {
                        report.push(self.sort_files_observed(&files, observer));
                    }
                }
            }
            SortRequest::Selected(paths) => {
                let files: Vec<PathBuf> =
                    paths.iter().filter(|path| path.is_file()).cloned().collect();
                if !files.is_empty() {
                    report.push(self.sort_files_observed(&files, observer));
                }
                for dir in paths.iter().filter(|path| path.is_dir()) {
                    report.push(self.sort_directory_observed(dir, observer));
                }
            }
        }
        Ok(report)
    }

    /// Moves one file to the destination of its matching rule.
    ///
    /// Files without a matching rule are skipped untouched. Failures while
    /// creating the destination or moving are logged and reported as
    /// `MoveResult::Error`.
    pub fn move_one(&self, file: &Path) -> FileReport {
        match self.try_move(file) {
            Ok(Some(destination)) => FileReport {
                source: file.to_path_buf(),
                result: MoveResult::Moved,
                destination: Some(destination),
            },
            Ok(None) => FileReport {
                source: file.to_path_buf(),
                result: MoveResult::Skipped,
                destination: None,
            },
            Err(e) => {
                warn!("Error moving {}: {}", file.display(), e);
                FileReport {
                    source: file.to_path_buf(),
                    result: MoveResult::Error,
                    destination: None,
                }
            }
        }
    }

    fn ensure_rules(&self) -> Result<(), SortError> {
        if self.rules.is_empty() {
            return Err(SortError::NoRules);
        }
        Ok(())
    }

    fn run_batch(
        &self,
        source: BatchSource,
        candidates: Vec<PathBuf>,
        observer: &mut dyn SortObserver,
    ) -> BatchReport {
        observer.batch_started(&source, candidates.len());

        let mut outcome = SortOutcome::default();
        let mut files = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let report = self.move_one(candidate);
            outcome.record(report.result);
            observer.file_sorted(&report);
            files.push(report);
        }

        info!(
            moved = outcome.moved,
            skipped = outcome.skipped,
            errors = outcome.errors,
            dry_run = self.dry_run,
            "Batch complete"
        );

        let report = BatchReport {
            source,
            outcome,
            files,
        };
        observer.batch_finished(&report);
        report
    }

    /// Returns the destination when the file was (or would be) moved and
    /// `None` when no rule claims it.
    fn try_move(&self, file: &Path) -> Result<Option<PathBuf>, MoveError> {
        let file_name = file.file_name().ok_or_else(|| MoveError::NoFileName {
            path: file.to_path_buf(),
        })?;

        // Invalid bytes never form part of a matchable suffix
        let lossy_name = file_name.to_string_lossy();
        let (_, suffix) = split_suffix(&lossy_name);
        let Some(rule) = self.rules.find_rule_for_extension(suffix) else {
            debug!(file = %file.display(), "No rule for extension, skipping");
            return Ok(None);
        };

        let dest_dir = Path::new(&rule.path);
        if !self.dry_run {
            fs::create_dir_all(dest_dir).map_err(|source| MoveError::CreateDir {
                path: dest_dir.to_path_buf(),
                source,
            })?;
        }

        let destination = resolve_collision(dest_dir, file_name);
        if self.dry_run {
            debug!(file = %file.display(), dest = %destination.display(), "Would move");
            return Ok(Some(destination));
        }

        move_file(file, &destination).map_err(|source| MoveError::Move {
            from: file.to_path_buf(),
            to: destination.clone(),
            source,
        })?;
        info!(file = %file.display(), dest = %destination.display(), "Moved file");
        Ok(Some(destination))
    }
}

/// Renames `src` to `dest`, falling back to copy and delete when the rename is
/// refused (e.g. across filesystems).
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    let rename_error = match fs::rename(src, dest) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    debug!(error = %rename_error, "Rename failed, falling back to copy and delete");

    copy_and_remove(src, dest).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            rename_error
        } else {
            e
        }
    })
}

/// Copies `src` into a newly created `dest`, then deletes `src`.
///
/// `dest` must not exist. On failure only a `dest` created by this call is
/// removed again; `src` is left in place.
fn copy_and_remove(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = File::open(src)?;
    let permissions = reader.metadata()?.permissions();
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dest)?;

    let copied = io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.sync_all())
        .and_then(|_| fs::set_permissions(dest, permissions));
    drop(writer);

    if let Err(e) = copied.and_then(|_| fs::remove_file(src)) {
        if let Err(cleanup) = fs::remove_file(dest) {
            warn!(dest = %dest.display(), error = %cleanup, "Could not remove partial copy");
        }
        return Err(e);
    }
    Ok(())
}
