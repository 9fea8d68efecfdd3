//! Tree error types
//!
//! All errors that can occur while resolving or mutating the entry tree.
//! A failing mutation never leaves the tree partially modified.

use thiserror::Error;

use crate::tree::types::{EntryId, InvalidNameError};

/// the main error type for tree operations
#[derive(Debug, Error)]
pub enum TreeError {
    /// a sibling with the same name already exists
    #[error("name collision: '{name}' already exists in '{parent}'")]
    NameCollision { parent: String, name: String },

    /// the path or IdPath does not resolve to a live entry
    #[error("entry not found: {0}")]
    NotFound(String),

    /// the id is already used by a live entry
    #[error("entry id {0} is already in use")]
    IdCollision(EntryId),

    /// a directory was required
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// a file was required
    #[error("not a file: {0}")]
    NotAFile(String),

    /// invalid entry name
    #[error("invalid entry name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// the root cannot be renamed, moved or deleted
    #[error("the root entry cannot be modified this way")]
    RootImmutable,

    /// moving a directory below itself
    #[error("cannot move '{from}' into its own subtree '{to}'")]
    MoveIntoDescendant { from: String, to: String },
}

impl TreeError {
    /// check if this error indicates the entry doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_))
    }

    /// check if this error is a conflict with existing entries
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TreeError::NameCollision { .. } | TreeError::IdCollision(_)
        )
    }
}

/// result type alias for tree operations
pub type TreeResult<T> = Result<T, TreeError>;
