//! versioned entry tree
//!
//! The tree materialises one coherent view of the monitored files and
//! directories at "now". Entries are addressed either by their current
//! `/`-separated path or by their [`IdPath`], which survives renames.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        RootEntry                            │
//! │   (arena: EntryId -> Entry, the only mutation surface)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │    Entry    │       │   IdPath    │       │  Snapshot   │
//!  │ (file/dir)  │       │ (identity)  │       │ (read copy) │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use localvcs::tree::RootEntry;
//!
//! let root = RootEntry::new();
//! let entry = root.get_entry("dir/file")?;
//! let id_path = root.id_path_of(entry.id())?;
//! ```

mod entry;
mod error;
mod root;
mod types;

pub use entry::{Entry, EntryKind};
pub use error::{TreeError, TreeResult};
pub use root::{DetachedSubtree, RootEntry, SnapshotNode, TreeOptions, TreeSnapshot};
pub use types::{
    split_parent, split_path, validate_name, Content, EntryId, IdPath, InvalidNameError,
    Timestamp, PATH_SEPARATOR,
};
