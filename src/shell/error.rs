//! Shell error types.

use std::io;

use thiserror::Error;

use crate::history::HistoryError;
use crate::tree::TreeError;

/// Result type for shell commands.
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors reported by a shell command.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    History(#[from] HistoryError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    /// Malformed command line.
    #[error("usage: {0}")]
    Usage(String),

    #[error("unknown command '{0}', type 'help' for the list of commands")]
    UnknownCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ShellError {
    /// Check if the shell should stop after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            ShellError::History(e) => !e.is_recoverable(),
            ShellError::Io(_) => true,
            _ => false,
        }
    }
}
