//! Application settings.
//!
//! Settings are read from a TOML file. They never hold rules (those live in the
//! JSON rules file); they only tune where that file is and how batches are
//! displayed.
//!
//! # Configuration File Format
//!
//! ```toml
//! # Where the folder rules are persisted (optional)
//! rules_file = "/home/me/sorting/folder_rules.json"
//!
//! # Show a progress bar while a batch runs
//! progress = true
//!
//! # Print the result of every file after a batch
//! list_files = false
//! ```

use crate::rules::RuleStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory settings file.
pub const LOCAL_CONFIG_FILE: &str = ".filesorterrc.toml";

/// Errors that can occur during settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration in {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
    /// IO error while reading configuration.
    #[error("IO error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Overrides the rules file location.
    pub rules_file: Option<PathBuf>,
    /// Show a progress bar during batches.
    pub progress: bool,
    /// Print one line per processed file after a batch.
    pub list_files: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_file: None,
            progress: true,
            list_files: false,
        }
    }
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.filesorterrc.toml` in the current directory
    /// 3. Look for `filesorter/config.toml` in the user config directory
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file is explicitly provided but cannot be
    /// read, or if any settings file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(user_config) = Self::default_path()
            && user_config.exists()
        {
            return Self::load_from_file(&user_config);
        }

        Ok(Self::default())
    }

    /// The per-user settings file, e.g. `~/.config/filesorter/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(config_base.join("filesorter").join("config.toml"))
    }

    /// Parses settings from TOML text.
    ///
    /// # Examples
    ///
    /// ```
    /// use filesorter::config::Settings;
    ///
    /// let settings = Settings::from_toml("progress = false").unwrap();
    /// assert!(!settings.progress);
    /// assert!(settings.rules_file.is_none());
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolves the rules file: an explicit override first, then the
    /// `rules_file` setting, then the per-user data directory.
    ///
    /// Returns `None` only when no override is given and the data directory
    /// cannot be determined.
    pub fn rules_file(&self, override_path: Option<&Path>) -> Option<PathBuf> {
        override_path
            .map(Path::to_path_buf)
            .or_else(|| self.rules_file.clone())
            .or_else(RuleStore::default_path)
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
