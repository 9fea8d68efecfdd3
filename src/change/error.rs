//! Change error types.

use thiserror::Error;

use crate::change::change::ChangeKind;
use crate::change::changeset::{Applied, ChangeSet, Unapplied};
use crate::tree::{RootEntry, TreeError};

/// Result type for single-change operations.
pub type ChangeResult<T> = Result<T, ChangeError>;

/// Errors raised by a single [`Change`](crate::change::Change).
#[derive(Debug, Error)]
pub enum ChangeError {
    /// The precondition of the mutation did not hold. The tree is unchanged.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// The change was applied before and not reverted since.
    #[error("{0} change is already applied")]
    AlreadyApplied(ChangeKind),

    /// Revert requested for a change that is not applied.
    ///
    /// This is a caller contract violation, not a recoverable condition.
    #[error("cannot revert {0} change: it is not applied")]
    InvalidRevert(ChangeKind),
}

impl ChangeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChangeError::Tree(e) if e.is_not_found())
    }

    pub fn is_name_collision(&self) -> bool {
        matches!(self, ChangeError::Tree(TreeError::NameCollision { .. }))
    }

    /// true for misuse of the apply/revert protocol
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ChangeError::AlreadyApplied(_) | ChangeError::InvalidRevert(_)
        )
    }
}

/// A changeset stopped part way through `apply_to`.
///
/// Changes before `index` are applied and still hold their undo state; the
/// change at `index` failed without touching the tree; later changes were
/// never attempted. The tree is left as is. [`rollback`](Self::rollback)
/// is available when the caller wants the prefix undone.
#[derive(Debug, Error)]
#[error("change {index} of changeset '{name}' failed to apply: {source}")]
pub struct PartialApply {
    pub(crate) name: String,
    pub(crate) index: usize,
    #[source]
    pub(crate) source: ChangeError,
    pub(crate) changeset: ChangeSet<Unapplied>,
}

impl PartialApply {
    /// position of the failing change
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn error(&self) -> &ChangeError {
        &self.source
    }

    /// Take the changeset back without touching the tree.
    pub fn into_changeset(self) -> ChangeSet<Unapplied> {
        self.changeset
    }

    /// Revert the applied prefix, newest first, and return the changeset in
    /// a clean unapplied state.
    pub fn rollback(mut self, root: &mut RootEntry) -> ChangeResult<ChangeSet<Unapplied>> {
        self.changeset.revert_prefix(root, self.index)?;
        Ok(self.changeset)
    }
}

/// A changeset stopped part way through `revert_on`.
///
/// Changes after `index` were reverted; the change at `index` and everything
/// before it are still applied. Reaching this means the tree was mutated
/// out of band and is no longer consistent with the recorded history.
#[derive(Debug, Error)]
#[error("change {index} of changeset '{name}' failed to revert: {source}")]
pub struct PartialRevert {
    pub(crate) name: String,
    pub(crate) index: usize,
    #[source]
    pub(crate) source: ChangeError,
    pub(crate) changeset: ChangeSet<Applied>,
}

impl PartialRevert {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn error(&self) -> &ChangeError {
        &self.source
    }

    pub fn into_changeset(self) -> ChangeSet<Applied> {
        self.changeset
    }
}
