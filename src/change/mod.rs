//! Change commands and changesets.
//!
//! A [`Change`] is a reversible command over a [`RootEntry`]: `apply_to`
//! performs the mutation and captures what is needed to undo it, `revert_on`
//! undoes it exactly. A [`ChangeSet`] groups changes into one named,
//! timestamped batch that is applied front to back and reverted back to
//! front.
//!
//! # Usage
//!
//! ```ignore
//! use localvcs::change::{Change, ChangeSet};
//! use localvcs::tree::RootEntry;
//!
//! let mut root = RootEntry::new();
//! let cs = ChangeSet::new(123, "add sources", [
//!     Change::create_directory(1, "src"),
//!     Change::create_file(2, "src/main.rs", "fn main() {}", 123),
//! ]);
//!
//! let applied = cs.apply_to(&mut root)?;
//! assert!(applied.is_creational_for(root.get_entry("src/main.rs")?));
//!
//! let unapplied = applied.revert_on(&mut root)?;
//! ```
//!
//! [`RootEntry`]: crate::tree::RootEntry

#[allow(clippy::module_inception)]
mod change;
mod changeset;
mod error;
mod listener;

pub use change::{
    Change, ChangeFileContentChange, ChangeKind, CreateDirectoryChange, CreateFileChange,
    DeleteChange, MoveChange, RenameChange,
};
pub use changeset::{Applied, ChangeSet, ChangeSetSummary, Unapplied};
pub use error::{ChangeError, ChangeResult, PartialApply, PartialRevert};
pub use listener::{ChangeEvent, ChangeListener, ChangeLog};
