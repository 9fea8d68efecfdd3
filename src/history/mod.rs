//! Local history over a versioned tree.
//!
//! ```text
//!                 +------------------+
//!   record() ---> |   LocalHistory   | ---> RootEntry (owned)
//!                 +------------------+
//!                   |              ^
//!          undo()   v              |  redo()
//!            revisions        redo stack
//!         (Revision, newest    (UndoneRevision,
//!          last)                newest last)
//! ```
//!
//! Every recorded [`ChangeSet`](crate::change::ChangeSet) gets a
//! [`ChangeSetId`]. A changeset that fails part way is rolled back before
//! the error is returned, so the tree only ever moves between fully applied
//! states.

mod config;
mod error;
mod manager;
mod revision;
mod shared;

pub use config::{HistoryConfig, ENV_CASE_SENSITIVE, ENV_MAX_CHANGESETS, ENV_MAX_REDO};
pub use error::{HistoryError, HistoryResult};
pub use manager::LocalHistory;
pub use revision::{ChangeSetId, Revision, RevisionSummary};
pub use shared::SharedHistory;
