//! Local history - records changesets against one tree.
//!
//! The `LocalHistory` is the single logical writer of its [`RootEntry`].
//! It handles:
//! - Allocating entry ids that are never reused
//! - Recording changesets, rolling back the ones that fail part way
//! - Undo / redo in strict LIFO order
//! - Provenance queries ("which changeset created this entry?")
//! - Retention of old changesets

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::change::{Applied, Change, ChangeSet, Unapplied};
use crate::history::config::HistoryConfig;
use crate::history::error::{HistoryError, HistoryResult};
use crate::history::revision::{ChangeSetId, Revision, UndoneRevision};
use crate::tree::{Content, EntryId, RootEntry, Timestamp, TreeSnapshot};

/// Undo/redo history over a tree it owns exclusively.
#[derive(Debug)]
pub struct LocalHistory {
    config: HistoryConfig,
    root: RootEntry,
    /// applied changesets, oldest first
    revisions: Vec<Revision>,
    /// undone changesets, most recently undone last
    redo: Vec<UndoneRevision>,
    /// changeset whose undo stopped part way, with the changes that are
    /// still applied
    inconsistent: Option<Revision>,
    next_id: u64,
}

impl Default for LocalHistory {
    fn default() -> Self {
        Self {
            root: RootEntry::new(),
            config: HistoryConfig::default(),
            revisions: Vec::new(),
            redo: Vec::new(),
            inconsistent: None,
            next_id: 1,
        }
    }
}

impl LocalHistory {
    /// Create an empty history with the given configuration.
    pub fn new(config: HistoryConfig) -> HistoryResult<Self> {
        config.validate()?;
        Ok(Self {
            root: RootEntry::with_options(config.tree_options()),
            config,
            revisions: Vec::new(),
            redo: Vec::new(),
            inconsistent: None,
            next_id: 1,
        })
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// The current tree. Read-only: mutations go through `record`.
    pub fn root(&self) -> &RootEntry {
        &self.root
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        self.root.snapshot()
    }

    /// Hand out an entry id that no entry of this history has used.
    pub fn allocate_id(&mut self) -> HistoryResult<EntryId> {
        let id = EntryId::new(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or(HistoryError::IdsExhausted)?;
        Ok(id)
    }

    /// applied changesets, oldest first
    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn revision(&self, id: ChangeSetId) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.id == id)
    }

    pub fn can_undo(&self) -> bool {
        !self.revisions.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The changeset whose undo failed part way, if any.
    ///
    /// Changes after the failing index were reverted; the rest are still
    /// applied to the tree.
    pub fn inconsistent(&self) -> Option<&Revision> {
        self.inconsistent.as_ref()
    }

    /// number of undone changesets waiting for redo
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    // ==================== Recording ====================

    /// Record and apply a changeset built from `changes`, stamped now.
    pub fn record(
        &mut self,
        name: impl Into<String>,
        changes: impl IntoIterator<Item = Change>,
    ) -> HistoryResult<ChangeSetId> {
        self.record_changeset(ChangeSet::new(Timestamp::now(), name, changes))
    }

    /// Record and apply a prepared changeset.
    ///
    /// If a change fails, the changes before it are reverted and the tree is
    /// left as it was. A successful record clears the redo stack.
    pub fn record_changeset(&mut self, changeset: ChangeSet<Unapplied>) -> HistoryResult<ChangeSetId> {
        let applied = self.apply_or_rollback(changeset)?;
        let id = ChangeSetId::generate();

        info!(changeset = %applied.name(), id = %id, changes = applied.len(), "recorded changeset");
        self.revisions.push(Revision {
            id,
            recorded_at: Utc::now(),
            changeset: applied,
        });
        self.redo.clear();
        self.enforce_retention();
        Ok(id)
    }

    fn apply_or_rollback(&mut self, changeset: ChangeSet<Unapplied>) -> HistoryResult<ChangeSet<Applied>> {
        match changeset.apply_to(&mut self.root) {
            Ok(applied) => {
                self.reserve_ids(&applied);
                Ok(applied)
            }
            Err(partial) => {
                let name = partial.name.clone();
                let index = partial.index;
                let mut changeset = partial.changeset;
                if let Err(source) = changeset.revert_prefix(&mut self.root, index) {
                    error!(changeset = %name, error = %source, "rollback of rejected changeset failed");
                    return Err(HistoryError::Inconsistent { name, index, source });
                }
                warn!(changeset = %name, index, error = %partial.source, "changeset rejected");
                Err(HistoryError::Rejected {
                    name,
                    index,
                    source: partial.source,
                })
            }
        }
    }

    /// keep `next_id` above every id the applied changes touched
    fn reserve_ids(&mut self, applied: &ChangeSet<Applied>) {
        for id_path in applied.affected_id_paths() {
            self.next_id = self.next_id.max(id_path.id().value().saturating_add(1));
        }
    }

    fn enforce_retention(&mut self) {
        if let Some(max) = self.config.max_changesets {
            if self.revisions.len() > max {
                let excess = self.revisions.len() - max;
                self.revisions.drain(..excess);
                debug!(dropped = excess, "forgot oldest changesets");
            }
        }
    }

    /// Create a file with a fresh id, as its own changeset.
    pub fn create_file(&mut self, path: &str, content: impl Into<Content>) -> HistoryResult<EntryId> {
        let id = self.allocate_id()?;
        self.record(
            format!("Create file {}", path),
            [Change::create_file(id, path, content, Timestamp::now())],
        )?;
        Ok(id)
    }

    /// Create a directory with a fresh id, as its own changeset.
    pub fn create_directory(&mut self, path: &str) -> HistoryResult<EntryId> {
        let id = self.allocate_id()?;
        self.record(
            format!("Create directory {}", path),
            [Change::create_directory(id, path)],
        )?;
        Ok(id)
    }

    pub fn change_content(&mut self, path: &str, content: impl Into<Content>) -> HistoryResult<ChangeSetId> {
        self.record(
            format!("Edit {}", path),
            [Change::change_file_content(path, content, Timestamp::now())],
        )
    }

    pub fn rename(&mut self, path: &str, new_name: &str) -> HistoryResult<ChangeSetId> {
        self.record(
            format!("Rename {} to {}", path, new_name),
            [Change::rename(path, new_name)],
        )
    }

    pub fn move_entry(&mut self, path: &str, new_parent: &str) -> HistoryResult<ChangeSetId> {
        self.record(
            format!("Move {} to {}/", path, new_parent),
            [Change::move_to(path, new_parent)],
        )
    }

    pub fn delete(&mut self, path: &str) -> HistoryResult<ChangeSetId> {
        self.record(format!("Delete {}", path), [Change::delete(path)])
    }

    // ==================== Undo / Redo ====================

    /// Revert the most recently applied changeset.
    pub fn undo(&mut self) -> HistoryResult<ChangeSetId> {
        let Revision {
            id,
            recorded_at,
            changeset,
        } = self.revisions.pop().ok_or(HistoryError::NothingToUndo)?;

        match changeset.revert_on(&mut self.root) {
            Ok(unapplied) => {
                info!(changeset = %unapplied.name(), id = %id, "undone");
                self.redo.push(UndoneRevision {
                    id,
                    recorded_at,
                    changeset: unapplied,
                });
                if self.redo.len() > self.config.max_redo {
                    let excess = self.redo.len() - self.config.max_redo;
                    self.redo.drain(..excess);
                }
                Ok(id)
            }
            Err(partial) => {
                error!(changeset = %partial.name, error = %partial.source, "undo failed, tree is inconsistent");
                self.inconsistent = Some(Revision {
                    id,
                    recorded_at,
                    changeset: partial.changeset,
                });
                Err(HistoryError::Inconsistent {
                    name: partial.name,
                    index: partial.index,
                    source: partial.source,
                })
            }
        }
    }

    /// Re-apply the most recently undone changeset.
    pub fn redo(&mut self) -> HistoryResult<ChangeSetId> {
        let UndoneRevision {
            id,
            recorded_at,
            changeset,
        } = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;

        let applied = self.apply_or_rollback(changeset)?;
        info!(changeset = %applied.name(), id = %id, "redone");
        self.revisions.push(Revision {
            id,
            recorded_at,
            changeset: applied,
        });
        self.enforce_retention();
        Ok(id)
    }

    /// Undo every changeset back to and including `id`, restoring the tree
    /// as it was right before `id` was recorded. Returns how many changesets
    /// were undone.
    pub fn revert_to(&mut self, id: ChangeSetId) -> HistoryResult<usize> {
        let position = self
            .revisions
            .iter()
            .position(|r| r.id == id)
            .ok_or(HistoryError::UnknownChangeSet(id))?;

        let count = self.revisions.len() - position;
        for _ in 0..count {
            self.undo()?;
        }
        Ok(count)
    }

    // ==================== Queries ====================

    /// The applied changeset that brought the entry at `path` into existence.
    ///
    /// `None` when the entry predates the retained history.
    pub fn creation_of(&self, path: &str) -> HistoryResult<Option<&Revision>> {
        let entry = self.root.get_entry(path)?;
        Ok(self
            .revisions
            .iter()
            .find(|r| r.changeset.is_creational_for(entry)))
    }

    /// Applied changesets that touched the entry at `path`, oldest first.
    pub fn revisions_touching(&self, path: &str) -> HistoryResult<Vec<&Revision>> {
        let id = self.root.get_entry(path)?.id();
        Ok(self
            .revisions
            .iter()
            .filter(|r| r.changeset.touches(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Entry;
    use proptest::prelude::*;

    fn history() -> LocalHistory {
        LocalHistory::new(HistoryConfig::default()).unwrap()
    }

    #[test]
    fn test_record_and_undo() {
        let mut h = history();
        let empty = h.snapshot();

        h.create_directory("dir").unwrap();
        h.create_file("dir/file", "hello").unwrap();
        assert_eq!(h.revisions().len(), 2);
        assert!(h.root().has_entry("dir/file"));

        h.undo().unwrap();
        assert!(!h.root().has_entry("dir/file"));
        h.undo().unwrap();
        assert_eq!(h.snapshot(), empty);
        assert!(matches!(h.undo(), Err(HistoryError::NothingToUndo)));
    }

    #[test]
    fn test_redo_restores_same_ids() {
        let mut h = history();
        let dir = h.create_directory("dir").unwrap();
        let cs = h.change_content("dir", "x");
        assert!(cs.is_err());

        let undone = h.undo().unwrap();
        assert!(h.can_redo());
        let redone = h.redo().unwrap();
        assert_eq!(undone, redone);
        assert_eq!(h.root().get_entry("dir").unwrap().id(), dir);
        assert!(matches!(h.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_record_clears_redo() {
        let mut h = history();
        h.create_file("a", "").unwrap();
        h.undo().unwrap();
        assert_eq!(h.redo_len(), 1);

        h.create_file("b", "").unwrap();
        assert!(!h.can_redo());
    }

    #[test]
    fn test_rejected_changeset_rolls_back() {
        let mut h = history();
        h.create_file("file", "").unwrap();
        let before = h.snapshot();

        let a = h.allocate_id().unwrap();
        let b = h.allocate_id().unwrap();
        let err = h
            .record(
                "broken",
                [
                    Change::create_directory(a, "dir"),
                    Change::create_file(b, "dir/inner", "", -1),
                    Change::create_file(spare_id(), "file", "", -1),
                ],
            )
            .unwrap_err();

        match err {
            HistoryError::Rejected { name, index, source } => {
                assert_eq!(name, "broken");
                assert_eq!(index, 2);
                assert!(source.is_name_collision());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(h.snapshot(), before);
        assert_eq!(h.revisions().len(), 1);
    }

    fn spare_id() -> EntryId {
        EntryId::new(10_000)
    }

    #[test]
    fn test_allocated_ids_skip_explicit_ids() {
        let mut h = history();
        h.record("explicit", [Change::create_file(41, "file", "", -1)])
            .unwrap();
        assert_eq!(h.allocate_id().unwrap(), EntryId::new(42));
    }

    #[test]
    fn test_largest_explicit_id_exhausts_allocation() {
        let mut h = history();
        h.record("max", [Change::create_file(u64::MAX, "last", "", -1)])
            .unwrap();
        assert!(h.root().has_entry("last"));
        assert!(matches!(h.allocate_id(), Err(HistoryError::IdsExhausted)));
        assert!(matches!(
            h.create_file("more", ""),
            Err(HistoryError::IdsExhausted)
        ));

        h.undo().unwrap();
        assert!(h.snapshot().root.children.is_empty());
    }

    #[test]
    fn test_failed_undo_keeps_changeset() {
        let mut h = history();
        h.record(
            "pair",
            [
                Change::create_file(1, "a", "", -1),
                Change::create_file(2, "b", "", -1),
            ],
        )
        .unwrap();

        // remove "a" without going through the history
        Change::delete("a").apply_to(&mut h.root).unwrap();

        let err = h.undo().unwrap_err();
        assert!(!err.is_recoverable());
        assert!(!h.can_undo());

        let stuck = h.inconsistent().unwrap();
        assert_eq!(stuck.changeset().name(), "pair");
        let changes = stuck.changeset().changes();
        assert!(changes[0].is_applied());
        assert!(!changes[1].is_applied());
    }

    #[test]
    fn test_revert_to() {
        let mut h = history();
        h.create_file("a", "").unwrap();
        let after_a = h.snapshot();
        let second = h.create_file("b", "").map(|_| h.revisions()[1].id()).unwrap();
        h.change_content("b", "edited").unwrap();
        h.delete("a").unwrap();

        assert_eq!(h.revert_to(second).unwrap(), 3);
        assert_eq!(h.snapshot(), after_a);
        assert_eq!(h.redo_len(), 3);

        let unknown = ChangeSetId::generate();
        assert!(matches!(
            h.revert_to(unknown),
            Err(HistoryError::UnknownChangeSet(_))
        ));
    }

    #[test]
    fn test_creation_of() {
        let mut h = history();
        h.create_directory("dir").unwrap();
        h.create_file("dir/file", "1").unwrap();
        h.change_content("dir/file", "2").unwrap();
        h.rename("dir/file", "renamed").unwrap();

        let created = h.creation_of("dir/renamed").unwrap().unwrap();
        assert_eq!(created.id(), h.revisions()[1].id());
        assert_eq!(created.changeset().name(), "Create file dir/file");

        let touching = h.revisions_touching("dir/renamed").unwrap();
        assert_eq!(touching.len(), 3);
        assert!(h.creation_of("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_retention_forgets_oldest() {
        let mut h = LocalHistory::new(HistoryConfig::new().max_changesets(Some(2))).unwrap();
        h.create_file("a", "").unwrap();
        h.create_file("b", "").unwrap();
        h.create_file("c", "").unwrap();

        assert_eq!(h.revisions().len(), 2);
        assert!(h.creation_of("a").unwrap().is_none());
        assert!(h.creation_of("c").unwrap().is_some());

        h.undo().unwrap();
        h.undo().unwrap();
        assert!(!h.can_undo());
        assert!(h.root().has_entry("a"));
    }

    #[test]
    fn test_redo_limit() {
        let mut h = LocalHistory::new(HistoryConfig::new().max_redo(1)).unwrap();
        h.create_file("a", "").unwrap();
        h.create_file("b", "").unwrap();
        h.undo().unwrap();
        h.undo().unwrap();
        assert_eq!(h.redo_len(), 1);

        h.redo().unwrap();
        assert!(h.root().has_entry("a"));
        assert!(!h.root().has_entry("b"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(LocalHistory::new(HistoryConfig::new().max_changesets(Some(0))).is_err());
    }

    #[test]
    fn test_case_insensitive_history() {
        let mut h = LocalHistory::new(HistoryConfig::new().case_sensitive(false)).unwrap();
        h.create_file("Readme", "").unwrap();
        assert!(h.create_file("README", "").is_err());
        assert!(h.root().has_entry("readme"));
    }

    // ==================== Property: apply/revert round trip ====================

    #[derive(Debug, Clone)]
    enum Op {
        CreateFile(usize, u8),
        CreateDirectory(usize, u8),
        Edit(usize, u8),
        Rename(usize, u8),
        Move(usize, usize),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<usize>(), 0u8..4).prop_map(|(p, n)| Op::CreateFile(p, n)),
            (any::<usize>(), 0u8..4).prop_map(|(p, n)| Op::CreateDirectory(p, n)),
            (any::<usize>(), any::<u8>()).prop_map(|(p, c)| Op::Edit(p, c)),
            (any::<usize>(), 0u8..4).prop_map(|(p, n)| Op::Rename(p, n)),
            (any::<usize>(), any::<usize>()).prop_map(|(p, d)| Op::Move(p, d)),
            any::<usize>().prop_map(Op::Delete),
        ]
    }

    fn collect_paths(root: &RootEntry, entry: &Entry, prefix: &str, out: &mut Vec<(String, bool)>) {
        for child in root.children(entry) {
            let path = if prefix.is_empty() {
                child.name().to_string()
            } else {
                format!("{}/{}", prefix, child.name())
            };
            out.push((path.clone(), child.is_directory()));
            collect_paths(root, child, &path, out);
        }
    }

    fn pick(items: &[String], index: usize) -> String {
        if items.is_empty() {
            "missing".to_string()
        } else {
            items[index % items.len()].clone()
        }
    }

    fn join(parent: &str, name: &str) -> String {
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent, name)
        }
    }

    /// build a change against the tree as it is right now
    fn to_change(h: &mut LocalHistory, op: &Op) -> Change {
        let mut paths = Vec::new();
        collect_paths(h.root(), h.root().root(), "", &mut paths);
        let all: Vec<String> = paths.iter().map(|(p, _)| p.clone()).collect();
        let mut dirs: Vec<String> = vec![String::new()];
        dirs.extend(paths.iter().filter(|(_, d)| *d).map(|(p, _)| p.clone()));
        let files: Vec<String> = paths.iter().filter(|(_, d)| !*d).map(|(p, _)| p.clone()).collect();

        match op {
            Op::CreateFile(p, n) => {
                let id = h.allocate_id().unwrap();
                Change::create_file(id, join(&pick(&dirs, *p), &format!("f{}", n)), "", 1)
            }
            Op::CreateDirectory(p, n) => {
                let id = h.allocate_id().unwrap();
                Change::create_directory(id, join(&pick(&dirs, *p), &format!("d{}", n)))
            }
            Op::Edit(p, c) => Change::change_file_content(pick(&files, *p), vec![*c], i64::from(*c)),
            Op::Rename(p, n) => Change::rename(pick(&all, *p), format!("r{}", n)),
            Op::Move(p, d) => Change::move_to(pick(&all, *p), pick(&dirs, *d)),
            Op::Delete(p) => Change::delete(pick(&all, *p)),
        }
    }

    proptest! {
        #[test]
        fn prop_undo_all_then_redo_all_round_trips(
            batches in prop::collection::vec(prop::collection::vec(op(), 1..4), 1..12)
        ) {
            let mut h = history();
            let empty = h.snapshot();

            for batch in &batches {
                let before = h.snapshot();
                let changes: Vec<Change> = batch.iter().map(|op| to_change(&mut h, op)).collect();
                if h.record("batch", changes).is_err() {
                    prop_assert_eq!(h.snapshot(), before);
                }
            }

            let full = h.snapshot();
            let recorded = h.revisions().len();

            for _ in 0..recorded {
                h.undo().unwrap();
            }
            prop_assert_eq!(h.snapshot(), empty);

            for _ in 0..recorded {
                h.redo().unwrap();
            }
            prop_assert_eq!(h.snapshot(), full);
        }
    }
}
