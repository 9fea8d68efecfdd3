//! History configuration.

use crate::history::error::{HistoryError, HistoryResult};
use crate::tree::TreeOptions;

/// environment variable overriding [`HistoryConfig::case_sensitive`]
pub const ENV_CASE_SENSITIVE: &str = "LOCALVCS_CASE_SENSITIVE";
/// environment variable overriding [`HistoryConfig::max_changesets`]
pub const ENV_MAX_CHANGESETS: &str = "LOCALVCS_MAX_CHANGESETS";
/// environment variable overriding [`HistoryConfig::max_redo`]
pub const ENV_MAX_REDO: &str = "LOCALVCS_MAX_REDO";

/// History configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Compare sibling names case-sensitively.
    pub case_sensitive: bool,
    /// Keep at most this many applied changesets; older ones are forgotten
    /// and can no longer be undone. `None` keeps everything.
    pub max_changesets: Option<usize>,
    /// Keep at most this many undone changesets for redo.
    pub max_redo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            max_changesets: None,
            max_redo: 100,
        }
    }
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set case_sensitive flag.
    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    /// Set the retention limit.
    pub fn max_changesets(mut self, value: Option<usize>) -> Self {
        self.max_changesets = value;
        self
    }

    /// Set the redo stack limit.
    pub fn max_redo(mut self, value: usize) -> Self {
        self.max_redo = value;
        self
    }

    /// Defaults overlaid with `LOCALVCS_*` environment variables.
    pub fn from_env() -> HistoryResult<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from a variable lookup onto this configuration.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> HistoryResult<Self> {
        if let Some(value) = lookup(ENV_CASE_SENSITIVE) {
            self.case_sensitive = parse_bool(ENV_CASE_SENSITIVE, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CHANGESETS) {
            self.max_changesets = match value.trim() {
                "" | "none" | "unlimited" => None,
                other => Some(parse_usize(ENV_MAX_CHANGESETS, other)?),
            };
        }
        if let Some(value) = lookup(ENV_MAX_REDO) {
            self.max_redo = parse_usize(ENV_MAX_REDO, value.trim())?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> HistoryResult<()> {
        if self.max_changesets == Some(0) {
            return Err(HistoryError::InvalidConfig(
                "max_changesets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// options for the tree this history owns
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            case_sensitive: self.case_sensitive,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> HistoryResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(HistoryError::InvalidConfig(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_usize(key: &str, value: &str) -> HistoryResult<usize> {
    value.parse().map_err(|_| {
        HistoryError::InvalidConfig(format!("{}: expected a number, got '{}'", key, value))
    })
}
