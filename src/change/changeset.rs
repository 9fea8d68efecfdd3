//! Changesets using the typestate pattern.
//!
//! The state parameter tracks whether the batch is currently applied:
//! - `Unapplied`: can be applied, cannot be reverted
//! - `Applied`: can be reverted, cannot be applied again
//!
//! Applying consumes a `ChangeSet<Unapplied>` and yields a
//! `ChangeSet<Applied>`; reverting goes the other way. Reverting an
//! unapplied set or re-applying an applied one does not type-check.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::change::change::Change;
use crate::change::error::{ChangeResult, PartialApply, PartialRevert};
use crate::change::listener::ChangeListener;
use crate::tree::{Entry, EntryId, IdPath, RootEntry, Timestamp};

/// Marker type for changesets that are not applied to a tree.
#[derive(Debug, Clone, Copy)]
pub struct Unapplied;

/// Marker type for changesets applied to a tree.
#[derive(Debug, Clone, Copy)]
pub struct Applied;

/// An ordered, named, timestamped batch of changes.
///
/// Insertion order is the apply order; revert runs the exact reverse.
#[derive(Debug, Clone)]
pub struct ChangeSet<State = Unapplied> {
    timestamp: Timestamp,
    name: String,
    pub(crate) changes: Vec<Change>,
    _state: PhantomData<State>,
}

/// Serialisable description of a changeset, for display by outer layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetSummary {
    pub name: String,
    pub timestamp: Timestamp,
    pub applied: bool,
    pub changes: Vec<String>,
}

impl<State> ChangeSet<State> {
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// True iff some change in this set created `entry`.
    ///
    /// Creation dominates: a set that creates an entry and then edits it is
    /// still creational for it. An unapplied set answers false.
    pub fn is_creational_for(&self, entry: &Entry) -> bool {
        self.changes.iter().any(|c| c.is_creational_for(entry))
    }

    /// whether any applied change in this set touched the entry
    pub fn touches(&self, id: EntryId) -> bool {
        self.changes.iter().any(|c| c.touches(id))
    }

    /// IdPaths touched by the applied changes, in apply order
    pub fn affected_id_paths(&self) -> Vec<&IdPath> {
        self.changes
            .iter()
            .filter_map(Change::affected_id_path)
            .collect()
    }

    pub fn summary(&self) -> ChangeSetSummary {
        ChangeSetSummary {
            name: self.name.clone(),
            timestamp: self.timestamp,
            applied: self.changes.iter().any(Change::is_applied),
            changes: self.changes.iter().map(ToString::to_string).collect(),
        }
    }

    fn transition<Next>(self) -> ChangeSet<Next> {
        ChangeSet {
            timestamp: self.timestamp,
            name: self.name,
            changes: self.changes,
            _state: PhantomData,
        }
    }
}

impl ChangeSet<Unapplied> {
    /// Build a changeset from an ordered list of changes.
    pub fn new(
        timestamp: impl Into<Timestamp>,
        name: impl Into<String>,
        changes: impl IntoIterator<Item = Change>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            name: name.into(),
            changes: changes.into_iter().collect(),
            _state: PhantomData,
        }
    }

    /// Apply every change in insertion order.
    ///
    /// Stops at the first failing change and hands the set back inside
    /// [`PartialApply`]; changes before it stay applied.
    pub fn apply_to(self, root: &mut RootEntry) -> Result<ChangeSet<Applied>, PartialApply> {
        self.apply_to_with(root, &mut ())
    }

    pub fn apply_to_with(
        mut self,
        root: &mut RootEntry,
        listener: &mut dyn ChangeListener,
    ) -> Result<ChangeSet<Applied>, PartialApply> {
        debug!(changeset = %self.name, changes = self.changes.len(), "applying changeset");

        for index in 0..self.changes.len() {
            match self.changes[index].apply_to(root) {
                Ok(id_path) => {
                    trace!(index, %id_path, change = %self.changes[index], "applied change");
                    listener.applied(index, &self.changes[index]);
                }
                Err(source) => {
                    warn!(changeset = %self.name, index, error = %source, "changeset stopped part way");
                    return Err(PartialApply {
                        name: self.name.clone(),
                        index,
                        source,
                        changeset: self,
                    });
                }
            }
        }

        Ok(self.transition())
    }

    /// revert the first `len` changes, newest first
    pub(crate) fn revert_prefix(&mut self, root: &mut RootEntry, len: usize) -> ChangeResult<()> {
        for change in self.changes[..len].iter_mut().rev() {
            change.revert_on(root)?;
        }
        Ok(())
    }
}

impl ChangeSet<Applied> {
    /// Revert every change in reverse insertion order.
    pub fn revert_on(self, root: &mut RootEntry) -> Result<ChangeSet<Unapplied>, PartialRevert> {
        self.revert_on_with(root, &mut ())
    }

    pub fn revert_on_with(
        mut self,
        root: &mut RootEntry,
        listener: &mut dyn ChangeListener,
    ) -> Result<ChangeSet<Unapplied>, PartialRevert> {
        debug!(changeset = %self.name, changes = self.changes.len(), "reverting changeset");

        for index in (0..self.changes.len()).rev() {
            match self.changes[index].revert_on(root) {
                Ok(()) => {
                    trace!(index, change = %self.changes[index], "reverted change");
                    listener.reverted(index, &self.changes[index]);
                }
                Err(source) => {
                    warn!(changeset = %self.name, index, error = %source, "revert stopped part way, tree is inconsistent");
                    return Err(PartialRevert {
                        name: self.name.clone(),
                        index,
                        source,
                        changeset: self,
                    });
                }
            }
        }

        Ok(self.transition())
    }
}
