//! localvcs - local change history over a versioned entry tree
//!
//! A tree of files and directories ([`tree`]) is mutated only through
//! reversible commands ([`change`]). Commands are grouped into named,
//! timestamped changesets that a [`history`] records, undoes and redoes.
//! The [`shell`] drives all of it from a terminal or a script.
//!
//! # Example
//!
//! ```
//! use localvcs::history::LocalHistory;
//!
//! let mut history = LocalHistory::default();
//! history.create_directory("src").unwrap();
//! history.create_file("src/main.rs", "fn main() {}").unwrap();
//!
//! history.undo().unwrap();
//! assert!(!history.root().has_entry("src/main.rs"));
//! ```

pub mod change;
pub mod history;
pub mod logging;
pub mod shell;
pub mod tree;
