//! Command shell over a local history.
//!
//! Reads one command per line, from a terminal or a script file, and maps
//! each onto a changeset recorded in a [`LocalHistory`](crate::history::LocalHistory).
//! `begin` / `commit` group several changes into one changeset.

mod error;
mod repl;

pub use error::{ShellError, ShellResult};
pub use repl::{Outcome, Shell, ShellConfig};
