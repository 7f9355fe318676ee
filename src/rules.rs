//! Folder rules and their persistence.
//!
//! A [`FolderRule`] pairs a destination directory with the extension tokens it
//! accepts. The [`RuleStore`] owns the ordered rule list: order is matching
//! priority, so the first rule that claims an extension wins.
//!
//! # Rules File Format
//!
//! The list is stored as a JSON array, one object per rule:
//!
//! ```json
//! [
//!   {
//!     "name": "Pictures",
//!     "path": "/home/me/Pictures",
//!     "exts": [".jpg", ".png"]
//!   }
//! ]
//! ```

use crate::extensions::{format_extensions, normalize_extension, parse_extensions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name of the persisted rule list.
pub const RULES_FILE_NAME: &str = "folder_rules.json";

/// Errors raised by rule list mutations.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule with exactly this path string already exists.
    #[error("a rule for {path} already exists")]
    Duplicate { path: String },
    /// No rule at the given position.
    #[error("no rule at position {index}")]
    NotFound { index: usize },
}

/// Errors raised while reading or writing the rules file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rules file {} is malformed: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One sorting destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRule {
    /// Destination directory. It does not have to exist yet.
    pub path: String,
    /// Display name, the last path segment or the whole path.
    pub name: String,
    /// Normalized extension tokens, e.g. `.jpg`.
    pub extensions: BTreeSet<String>,
}

impl FolderRule {
    /// Creates a rule for `path` accepting the extensions in `raw_extensions`.
    pub fn new(path: &str, raw_extensions: &str) -> Self {
        Self {
            path: path.to_string(),
            name: display_name(path),
            extensions: parse_extensions(raw_extensions),
        }
    }

    /// Whether this rule accepts an already normalized extension token.
    pub fn accepts(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// Text shown in the rule list: the name plus the sorted tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use filesorter::rules::FolderRule;
    ///
    /// let rule = FolderRule::new("/home/me/Pictures", "png, jpg");
    /// assert_eq!(rule.label(), "Pictures  [ .jpg, .png ]");
    /// assert_eq!(FolderRule::new("/tmp/Empty", "").label(), "Empty");
    /// ```
    pub fn label(&self) -> String {
        if self.extensions.is_empty() {
            return self.name.clone();
        }
        let tokens: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        format!("{}  [ {} ]", self.name, tokens.join(", "))
    }

    /// Editable form of the extension set, e.g. `"jpg, png"`.
    pub fn extension_text(&self) -> String {
        format_extensions(&self.extensions)
    }
}

/// Display-only projection of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleView {
    pub label: String,
    pub tooltip: String,
}

/// On-disk shape of one rule. Missing fields fall back to empty values.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    exts: Vec<String>,
}

impl From<&FolderRule> for RuleRecord {
    fn from(rule: &FolderRule) -> Self {
        Self {
            name: rule.name.clone(),
            path: rule.path.clone(),
            // BTreeSet iteration is already ascending
            exts: rule.extensions.iter().cloned().collect(),
        }
    }
}

impl From<RuleRecord> for FolderRule {
    fn from(record: RuleRecord) -> Self {
        Self {
            path: record.path,
            name: record.name,
            extensions: record
                .exts
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
        }
    }
}

/// The ordered rule list together with the file it persists to.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules: Vec<FolderRule>,
    file_path: PathBuf,
}

impl RuleStore {
    /// Creates an empty store that will persist to `file_path`.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            rules: Vec::new(),
            file_path: file_path.into(),
        }
    }

    /// Returns the default rules file location under the per-user data
    /// directory, e.g. `~/.local/share/filesorter/folder_rules.json`.
    pub fn default_path() -> Option<PathBuf> {
        let data_base = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))?;
        Some(data_base.join("filesorter").join(RULES_FILE_NAME))
    }

    /// Loads the store from `file_path`.
    ///
    /// An absent file is not an error and yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be read and
    /// `StoreError::Malformed` if its content is not a JSON array of rules.
    pub fn load(file_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let file_path = file_path.into();
        if !file_path.exists() {
            debug!(path = %file_path.display(), "No rules file yet, starting empty");
            return Ok(Self::new(file_path));
        }

        let content = fs::read_to_string(&file_path).map_err(|source| StoreError::Io {
            action: "read",
            path: file_path.clone(),
            source,
        })?;

        let records: Vec<RuleRecord> =
            serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
                path: file_path.clone(),
                source,
            })?;

        let rules: Vec<FolderRule> = records.into_iter().map(FolderRule::from).collect();
        info!(path = %file_path.display(), count = rules.len(), "Loaded folder rules");

        Ok(Self { rules, file_path })
    }

    /// Loads the store, replacing a malformed rules file with an empty list.
    ///
    /// The malformed file is renamed to `<file>.bak.<timestamp>` so that the
    /// next save does not overwrite it.
    ///
    /// # Errors
    ///
    /// Read failures and a failed backup rename are still returned.
    pub fn load_or_recover(file_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let file_path = file_path.into();
        match Self::load(&file_path) {
            Err(StoreError::Malformed { path, source }) => {
                let backup_path = backup_path(&path);
                warn!(
                    path = %path.display(),
                    backup = %backup_path.display(),
                    error = %source,
                    "Rules file is malformed, starting with an empty rule list"
                );
                fs::rename(&path, &backup_path).map_err(|source| StoreError::Io {
                    action: "back up",
                    path: path.clone(),
                    source,
                })?;
                Ok(Self::new(file_path))
            }
            other => other,
        }
    }

    /// Writes the rule list to the store's file.
    ///
    /// The JSON is written next to the target first and renamed over it, so a
    /// crash mid-write leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` when the directory cannot be created or the
    /// file cannot be written.
    pub fn save(&self) -> StoreResult<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                action: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let records: Vec<RuleRecord> = self.rules.iter().map(RuleRecord::from).collect();
        let json = serde_json::to_string_pretty(&records).map_err(|e| StoreError::Io {
            action: "serialize",
            path: self.file_path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let mut tmp_name = self.file_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json).map_err(|source| StoreError::Io {
            action: "write",
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.file_path).map_err(|source| StoreError::Io {
            action: "replace",
            path: self.file_path.clone(),
            source,
        })?;

        info!(path = %self.file_path.display(), count = self.rules.len(), "Saved folder rules");
        Ok(())
    }

    /// Appends a rule for `path`.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Duplicate` if a rule with exactly the same path
    /// string exists. Paths are not canonicalized, so `/a/b` and `/a/b/` are
    /// distinct rules.
    pub fn add(&mut self, path: &str, raw_extensions: &str) -> Result<&FolderRule, RuleError> {
        if self.rules.iter().any(|rule| rule.path == path) {
            return Err(RuleError::Duplicate {
                path: path.to_string(),
            });
        }

        let rule = FolderRule::new(path, raw_extensions);
        self.rules.push(rule);
        let index = self.rules.len() - 1;
        self.warn_about_shadowed_extensions(index);
        Ok(&self.rules[index])
    }

    /// Replaces the extensions of the rule at `index`. Path and name stay.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if `index` is out of range.
    pub fn edit(&mut self, index: usize, raw_extensions: &str) -> Result<&FolderRule, RuleError> {
        let rule = self
            .rules
            .get_mut(index)
            .ok_or(RuleError::NotFound { index })?;
        rule.extensions = parse_extensions(raw_extensions);
        self.warn_about_shadowed_extensions(index);
        Ok(&self.rules[index])
    }

    /// Removes and returns the rule at `index`.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<FolderRule, RuleError> {
        if index >= self.rules.len() {
            return Err(RuleError::NotFound { index });
        }
        Ok(self.rules.remove(index))
    }

    /// Returns the first rule, in list order, that accepts `extension`.
    ///
    /// The query is normalized first, so `"JPG"`, `"jpg"` and `".jpg"` are
    /// equivalent. An empty query only matches a rule holding the empty token.
    ///
    /// # Examples
    ///
    /// ```
    /// use filesorter::rules::RuleStore;
    ///
    /// let mut store = RuleStore::new("rules.json");
    /// store.add("/photos", "jpg").unwrap();
    /// store.add("/backup", "jpg, png").unwrap();
    ///
    /// assert_eq!(store.find_rule_for_extension("JPG").unwrap().path, "/photos");
    /// assert_eq!(store.find_rule_for_extension(".png").unwrap().path, "/backup");
    /// assert!(store.find_rule_for_extension("").is_none());
    /// ```
    pub fn find_rule_for_extension(&self, extension: &str) -> Option<&FolderRule> {
        let extension = normalize_extension(extension);
        self.rules.iter().find(|rule| rule.accepts(&extension))
    }

    pub fn rules(&self) -> &[FolderRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&FolderRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Label and tooltip for every rule, in list order.
    pub fn views(&self) -> Vec<RuleView> {
        self.rules
            .iter()
            .map(|rule| RuleView {
                label: rule.label(),
                tooltip: rule.path.clone(),
            })
            .collect()
    }

    /// Logs extensions of the rule at `index` that an earlier rule already
    /// claims. Matching is unaffected: the earlier rule keeps winning.
    fn warn_about_shadowed_extensions(&self, index: usize) {
        let rule = &self.rules[index];
        for earlier in &self.rules[..index] {
            let shadowed: Vec<&str> = rule
                .extensions
                .intersection(&earlier.extensions)
                .map(String::as_str)
                .collect();
            if !shadowed.is_empty() {
                warn!(
                    rule = %rule.name,
                    winner = %earlier.name,
                    extensions = %shadowed.join(", "),
                    "Extensions are already claimed by an earlier rule"
                );
            }
        }
    }
}

/// Derives the display name: the final path segment, or the whole path.
fn display_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| path.to_string())
}

/// Generates a backup path for a broken rules file by appending a timestamp.
///
/// Example: `folder_rules.json` becomes `folder_rules.json.bak.20251109-143052`
fn backup_path(original_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let mut backup_name = original_path.as_os_str().to_owned();
    backup_name.push(format!(".bak.{}", timestamp));
    PathBuf::from(backup_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rules_file(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join(RULES_FILE_NAME)
    }

    #[test]
    fn test_new_rule_derives_name() {
        let rule = FolderRule::new("/home/me/Documents", "PDF, txt");
        assert_eq!(rule.name, "Documents");
        assert_eq!(rule.path, "/home/me/Documents");
        assert!(rule.accepts(".pdf"));
        assert!(rule.accepts(".txt"));
    }

    #[test]
    fn test_name_falls_back_to_full_path() {
        assert_eq!(FolderRule::new("/", "").name, "/");
        assert_eq!(FolderRule::new("", "").name, "");
    }

    #[test]
    fn test_name_ignores_trailing_separator() {
        assert_eq!(FolderRule::new("/home/me/Music/", "").name, "Music");
    }

    #[test]
    fn test_add_rejects_duplicate_path() {
        let mut store = RuleStore::new("unused.json");
        store.add("/dest", "jpg").unwrap();

        let result = store.add("/dest", "png");
        assert!(matches!(result, Err(RuleError::Duplicate { .. })));
        assert_eq!(store.len(), 1);
        assert!(store.rules()[0].accepts(".jpg"));
    }

    #[test]
    fn test_add_compares_exact_strings() {
        let mut store = RuleStore::new("unused.json");
        store.add("/dest", "jpg").unwrap();
        store.add("/dest/", "jpg").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_add_with_empty_extensions() {
        let mut store = RuleStore::new("unused.json");
        let rule = store.add("/dest", "  ").unwrap();
        assert!(rule.extensions.is_empty());
        assert!(store.find_rule_for_extension("").is_none());
    }

    #[test]
    fn test_edit_replaces_extensions_only() {
        let mut store = RuleStore::new("unused.json");
        store.add("/home/me/Pictures", "jpg").unwrap();

        let rule = store.edit(0, "PNG, gif").unwrap();
        assert_eq!(rule.name, "Pictures");
        assert_eq!(rule.path, "/home/me/Pictures");
        assert_eq!(rule.extension_text(), "gif, png");
        assert!(store.find_rule_for_extension(".jpg").is_none());
    }

    #[test]
    fn test_edit_and_remove_out_of_range() {
        let mut store = RuleStore::new("unused.json");
        assert!(matches!(
            store.edit(0, "jpg"),
            Err(RuleError::NotFound { index: 0 })
        ));
        assert!(matches!(
            store.remove(3),
            Err(RuleError::NotFound { index: 3 })
        ));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut store = RuleStore::new("unused.json");
        store.add("/a", "a").unwrap();
        store.add("/b", "b").unwrap();
        store.add("/c", "c").unwrap();

        let removed = store.remove(1).unwrap();
        assert_eq!(removed.path, "/b");
        let paths: Vec<&str> = store.rules().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/c"]);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut store = RuleStore::new("unused.json");
        store.add("/first", "jpg, png").unwrap();
        store.add("/second", "jpg").unwrap();

        assert_eq!(store.find_rule_for_extension(".jpg").unwrap().path, "/first");
        assert_eq!(store.find_rule_for_extension("JPG").unwrap().path, "/first");
        assert!(store.find_rule_for_extension(".gif").is_none());
    }

    #[test]
    fn test_views_project_label_and_tooltip() {
        let mut store = RuleStore::new("unused.json");
        store.add("/home/me/Pictures", "png, jpg").unwrap();
        store.add("/home/me/Inbox", "").unwrap();

        let views = store.views();
        assert_eq!(views[0].label, "Pictures  [ .jpg, .png ]");
        assert_eq!(views[0].tooltip, "/home/me/Pictures");
        assert_eq!(views[1].label, "Inbox");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RuleStore::load(rules_file(&temp_dir)).expect("Load failed");
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_load_round_trip_preserves_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = RuleStore::new(rules_file(&temp_dir));
        store.add("/z/Zebra", "png, JPG").unwrap();
        store.add("/a/Apple", "").unwrap();
        store.add("/m/Mango", "tar.gz, .txt").unwrap();
        store.save().expect("Save failed");

        let loaded = RuleStore::load(rules_file(&temp_dir)).expect("Load failed");
        assert_eq!(loaded.rules(), store.rules());
    }

    #[test]
    fn test_saved_json_has_sorted_extension_arrays() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut store = RuleStore::new(rules_file(&temp_dir));
        store.add("/dest/Mixed", "zip, pdf, doc").unwrap();
        store.save().expect("Save failed");

        let content = fs::read_to_string(rules_file(&temp_dir)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json[0]["name"], "Mixed");
        assert_eq!(json[0]["path"], "/dest/Mixed");
        assert_eq!(json[0]["exts"], serde_json::json!([".doc", ".pdf", ".zip"]));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("a").join("b").join(RULES_FILE_NAME);
        let store = RuleStore::new(&nested);
        store.save().expect("Save failed");

        assert!(nested.exists());
        assert!(!nested.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_defaults_missing_fields() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(
            rules_file(&temp_dir),
            r#"[{"path": "/only/path"}, {"name": "NoPath", "exts": ["JPG"]}, {}]"#,
        )
        .unwrap();

        let store = RuleStore::load(rules_file(&temp_dir)).expect("Load failed");
        assert_eq!(store.len(), 3);
        assert_eq!(store.rules()[0].name, "");
        assert!(store.rules()[0].extensions.is_empty());
        assert_eq!(store.rules()[1].path, "");
        assert!(store.rules()[1].accepts(".jpg"));
        assert_eq!(store.rules()[2], FolderRule {
            path: String::new(),
            name: String::new(),
            extensions: BTreeSet::new(),
        });
    }

    #[test]
    fn test_load_normalizes_hand_edited_tokens() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(
            rules_file(&temp_dir),
            r#"[{"name": "pics", "path": "/pics", "exts": [" JPG ", "png\t", ".Gif"]}]"#,
        )
        .unwrap();

        let store = RuleStore::load(rules_file(&temp_dir)).expect("Load failed");
        assert_eq!(store.rules()[0], FolderRule::new("/pics", "gif, jpg, png"));
        assert_eq!(store.find_rule_for_extension(".jpg").unwrap().path, "/pics");
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(rules_file(&temp_dir), "{ not json").unwrap();

        let result = RuleStore::load(rules_file(&temp_dir));
        assert!(matches!(result, Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn test_load_or_recover_backs_up_malformed_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(rules_file(&temp_dir), r#"{"name": "not an array"}"#).unwrap();

        let store = RuleStore::load_or_recover(rules_file(&temp_dir)).expect("Recover failed");
        assert!(store.is_empty());
        assert!(!rules_file(&temp_dir).exists());

        let backups: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".bak."))
            .collect();
        assert_eq!(backups.len(), 1);
    }
}
