//! filesorter - move files into folders by extension rules
//!
//! This library provides the pieces behind the `filesorter` command: parsing
//! extension text into normalized tokens, keeping an ordered and persisted list
//! of folder rules, resolving destination name collisions, and sorting files
//! from a directory or an explicit list into the folder of the first matching
//! rule.

pub mod cli;
pub mod collision;
pub mod config;
pub mod extensions;
pub mod output;
pub mod rules;
pub mod sorter;

pub use config::{ConfigError, Settings};
pub use extensions::{format_extensions, normalize_extension, parse_extensions};
pub use rules::{FolderRule, RuleError, RuleStore, RuleView, StoreError};
pub use sorter::{
    BatchReport, MoveResult, RequestReport, SortError, SortOutcome, SortRequest, Sorter,
};

pub use cli::{Cli, Command, run_cli};
