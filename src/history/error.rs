//! History error types.

use thiserror::Error;

use crate::change::ChangeError;
use crate::history::revision::ChangeSetId;
use crate::tree::TreeError;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while recording, undoing or querying history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Tree lookup error.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Single change error.
    #[error("change error: {0}")]
    Change(#[from] ChangeError),

    /// A changeset could not be applied; the tree was rolled back to the
    /// state before it.
    #[error("changeset '{name}' rejected at change {index}: {source}")]
    Rejected {
        name: String,
        index: usize,
        #[source]
        source: ChangeError,
    },

    /// A revert failed part way. The tree no longer matches the history.
    #[error("changeset '{name}' could not be reverted at change {index}: {source}")]
    Inconsistent {
        name: String,
        index: usize,
        #[source]
        source: ChangeError,
    },

    /// No applied changeset is left to undo.
    #[error("nothing to undo")]
    NothingToUndo,

    /// No undone changeset is left to redo.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The changeset is not (or no longer) in the history.
    #[error("changeset not found: {0}")]
    UnknownChangeSet(ChangeSetId),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every entry id up to `u64::MAX` is taken.
    #[error("entry ids exhausted")]
    IdsExhausted,
}

impl HistoryError {
    pub fn is_not_found(&self) -> bool {
        match self {
            HistoryError::Tree(e) => e.is_not_found(),
            HistoryError::Change(e) | HistoryError::Rejected { source: e, .. } => e.is_not_found(),
            HistoryError::UnknownChangeSet(_) => true,
            _ => false,
        }
    }

    /// Check if the history can keep being used after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, HistoryError::Inconsistent { .. })
    }
}
