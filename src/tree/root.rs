//! The mutable tree root.
//!
//! `RootEntry` owns every live entry in an id-keyed arena. Directories refer
//! to their children by id and children point back at their parent id, so
//! renames and moves only touch the records involved and an entry's id (and
//! therefore its identity) never changes.
//!
//! Lookups are public; every mutation is `pub(crate)` and only reached
//! through a [`Change`](crate::change::Change), which pairs it with an inverse.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tree::entry::{Entry, EntryKind};
use crate::tree::error::{TreeError, TreeResult};
use crate::tree::types::{split_parent, split_path, validate_name, Content, EntryId, IdPath, Timestamp};

/// Options fixed when the tree is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// compare sibling names case-sensitively
    pub case_sensitive: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

/// A subtree removed from the tree, kept so it can be put back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSubtree {
    parent: EntryId,
    root: Entry,
    descendants: Vec<Entry>,
}

impl DetachedSubtree {
    /// id of the directory the subtree was detached from
    pub fn parent(&self) -> EntryId {
        self.parent
    }

    /// the entry that was deleted
    pub fn root(&self) -> &Entry {
        &self.root
    }

    /// number of entries in the subtree, its root included
    pub fn entry_count(&self) -> usize {
        self.descendants.len() + 1
    }
}

/// One node of a [`TreeSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: EntryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

/// An owned, comparable copy of the whole tree at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: SnapshotNode,
}

impl TreeSnapshot {
    /// total number of entries below the root
    pub fn entry_count(&self) -> usize {
        fn count(node: &SnapshotNode) -> usize {
            node.children.iter().map(|c| 1 + count(c)).sum()
        }
        count(&self.root)
    }
}

/// The root of the versioned tree and sole owner of its entries.
#[derive(Debug, Clone)]
pub struct RootEntry {
    root: Entry,
    entries: HashMap<EntryId, Entry>,
    options: TreeOptions,
}

impl Default for RootEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl RootEntry {
    /// create an empty tree with default options
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            root: Entry::directory(EntryId::ROOT, String::new(), None),
            entries: HashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// the root directory itself
    pub fn root(&self) -> &Entry {
        &self.root
    }

    /// number of live entries below the root
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// look up a live entry by id
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        if id.is_root() {
            Some(&self.root)
        } else {
            self.entries.get(&id)
        }
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        if id.is_root() {
            Some(&mut self.root)
        } else {
            self.entries.get_mut(&id)
        }
    }

    fn existing(&self, id: EntryId) -> TreeResult<&Entry> {
        self.entry(id)
            .ok_or_else(|| TreeError::NotFound(format!("entry #{}", id)))
    }

    /// sibling key for a name under the configured case sensitivity
    fn key(&self, name: &str) -> String {
        if self.options.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    fn resolve(&self, path: &str) -> TreeResult<EntryId> {
        let mut current = EntryId::ROOT;
        for name in split_path(path) {
            current = self
                .existing(current)?
                .children()
                .and_then(|children| children.get(&self.key(name)))
                .copied()
                .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }

    /// Resolve a `/`-separated path to the entry currently at that position.
    ///
    /// The empty path resolves to the root.
    pub fn get_entry(&self, path: &str) -> TreeResult<&Entry> {
        let id = self.resolve(path)?;
        self.existing(id)
    }

    pub fn find_entry(&self, path: &str) -> Option<&Entry> {
        self.get_entry(path).ok()
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Resolve an IdPath, checking that every id is still a child of the one
    /// before it.
    pub fn get_entry_by_id_path(&self, id_path: &IdPath) -> TreeResult<&Entry> {
        let id = self.resolve_id_path(id_path)?;
        self.existing(id)
    }

    pub(crate) fn resolve_id_path(&self, id_path: &IdPath) -> TreeResult<EntryId> {
        let mut parent = EntryId::ROOT;
        for &id in id_path.ids() {
            match self.entry(id) {
                Some(entry) if entry.parent == Some(parent) => parent = id,
                _ => return Err(TreeError::NotFound(id_path.to_string())),
            }
        }
        Ok(parent)
    }

    /// the IdPath of a live entry, derived from its chain of parents
    pub fn id_path_of(&self, id: EntryId) -> TreeResult<IdPath> {
        let mut ids = Vec::new();
        let mut current = self.existing(id)?;
        while let Some(parent) = current.parent {
            ids.push(current.id);
            current = self.existing(parent)?;
        }
        ids.reverse();
        Ok(IdPath::from_ids(ids))
    }

    /// the current `/`-separated path of a live entry
    pub fn path_of(&self, id: EntryId) -> TreeResult<String> {
        let mut names = Vec::new();
        let mut current = self.existing(id)?;
        while let Some(parent) = current.parent {
            names.push(current.name.as_str());
            current = self.existing(parent)?;
        }
        names.reverse();
        Ok(names.join("/"))
    }

    /// direct children of a directory in name order
    pub fn children<'a>(&'a self, entry: &Entry) -> impl Iterator<Item = &'a Entry> + 'a {
        entry
            .child_ids()
            .into_iter()
            .filter_map(move |id| self.entry(id))
    }

    fn directory_at(&self, path: &str) -> TreeResult<EntryId> {
        let id = self.resolve(path)?;
        if self.existing(id)?.is_directory() {
            Ok(id)
        } else {
            Err(TreeError::NotADirectory(path.to_string()))
        }
    }

    fn sibling(&self, parent: EntryId, name: &str) -> Option<EntryId> {
        self.entry(parent)
            .and_then(Entry::children)
            .and_then(|children| children.get(&self.key(name)))
            .copied()
    }

    fn check_new_id(&self, id: EntryId) -> TreeResult<()> {
        if id.is_root() || self.entries.contains_key(&id) {
            return Err(TreeError::IdCollision(id));
        }
        Ok(())
    }

    fn check_free_name(&self, parent: EntryId, name: &str) -> TreeResult<()> {
        if self.sibling(parent, name).is_some() {
            return Err(TreeError::NameCollision {
                parent: self.path_of(parent)?,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// insert a record and link it into its parent's child map
    fn attach(&mut self, entry: Entry) -> TreeResult<()> {
        let parent = entry.parent.ok_or(TreeError::RootImmutable)?;
        let key = self.key(&entry.name);
        let children = self
            .entry_mut(parent)
            .and_then(Entry::children_mut)
            .ok_or_else(|| TreeError::NotADirectory(format!("entry #{}", parent)))?;
        children.insert(key, entry.id);
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    fn unlink(&mut self, parent: EntryId, name: &str) {
        let key = self.key(name);
        if let Some(children) = self.entry_mut(parent).and_then(Entry::children_mut) {
            children.remove(&key);
        }
    }

    fn insert_new(&mut self, id: EntryId, path: &str, build: impl FnOnce(String, EntryId) -> Entry) -> TreeResult<IdPath> {
        let (parent_path, name) = split_parent(path).ok_or(TreeError::RootImmutable)?;
        validate_name(name)?;
        let parent = self.directory_at(&parent_path)?;
        self.check_new_id(id)?;
        self.check_free_name(parent, name)?;

        self.attach(build(name.to_string(), parent))?;
        self.id_path_of(id)
    }

    pub(crate) fn create_file(
        &mut self,
        id: EntryId,
        path: &str,
        content: Content,
        timestamp: Timestamp,
    ) -> TreeResult<IdPath> {
        self.insert_new(id, path, |name, parent| {
            Entry::file(id, name, parent, content, timestamp)
        })
    }

    pub(crate) fn create_directory(&mut self, id: EntryId, path: &str) -> TreeResult<IdPath> {
        self.insert_new(id, path, |name, parent| Entry::directory(id, name, Some(parent)))
    }

    /// resolve a path for a mutation that must not target the root
    pub(crate) fn resolve_non_root(&self, path: &str) -> TreeResult<EntryId> {
        let id = self.resolve(path)?;
        if id.is_root() {
            return Err(TreeError::RootImmutable);
        }
        Ok(id)
    }

    pub(crate) fn resolve_path(&self, path: &str) -> TreeResult<EntryId> {
        self.resolve(path)
    }

    pub(crate) fn resolve_directory(&self, path: &str) -> TreeResult<EntryId> {
        self.directory_at(path)
    }

    /// Replace a file's content and timestamp, returning the previous pair.
    pub(crate) fn replace_content(
        &mut self,
        id: EntryId,
        content: Content,
        timestamp: Timestamp,
    ) -> TreeResult<(Content, Timestamp)> {
        let entry = self
            .entry_mut(id)
            .ok_or_else(|| TreeError::NotFound(format!("entry #{}", id)))?;
        match &mut entry.kind {
            EntryKind::File {
                content: current,
                timestamp: current_timestamp,
            } => Ok((
                std::mem::replace(current, content),
                std::mem::replace(current_timestamp, timestamp),
            )),
            EntryKind::Directory { .. } => Err(TreeError::NotAFile(entry.name.clone())),
        }
    }

    /// Rename an entry in place, returning its previous name.
    pub(crate) fn rename(&mut self, id: EntryId, new_name: &str) -> TreeResult<String> {
        validate_name(new_name)?;
        let entry = self.existing(id)?;
        let parent = entry.parent.ok_or(TreeError::RootImmutable)?;
        let old_name = entry.name.clone();

        if self.key(&old_name) != self.key(new_name) {
            self.check_free_name(parent, new_name)?;
        }

        self.unlink(parent, &old_name);
        if let Some(entry) = self.entry_mut(id) {
            entry.name = new_name.to_string();
        }
        let key = self.key(new_name);
        if let Some(children) = self.entry_mut(parent).and_then(Entry::children_mut) {
            children.insert(key, id);
        }
        Ok(old_name)
    }

    /// Move an entry under another directory, returning its previous parent.
    pub(crate) fn move_entry(&mut self, id: EntryId, new_parent: EntryId) -> TreeResult<EntryId> {
        let entry = self.existing(id)?;
        let old_parent = entry.parent.ok_or(TreeError::RootImmutable)?;
        let name = entry.name.clone();

        if !self.existing(new_parent)?.is_directory() {
            return Err(TreeError::NotADirectory(self.path_of(new_parent)?));
        }
        if new_parent == id || self.id_path_of(new_parent)?.contains(id) {
            return Err(TreeError::MoveIntoDescendant {
                from: self.path_of(id)?,
                to: self.path_of(new_parent)?,
            });
        }
        if new_parent == old_parent {
            return Ok(old_parent);
        }
        self.check_free_name(new_parent, &name)?;

        self.unlink(old_parent, &name);
        let key = self.key(&name);
        if let Some(children) = self.entry_mut(new_parent).and_then(Entry::children_mut) {
            children.insert(key, id);
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.parent = Some(new_parent);
        }
        Ok(old_parent)
    }

    /// ids of an entry and everything below it, parents before children
    fn subtree_ids(&self, id: EntryId) -> Vec<EntryId> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            ids.push(current);
            if let Some(entry) = self.entry(current) {
                stack.extend(entry.child_ids().into_iter().rev());
            }
        }
        ids
    }

    /// Detach an entry and its whole subtree from the tree.
    pub(crate) fn delete(&mut self, id: EntryId) -> TreeResult<DetachedSubtree> {
        let entry = self.existing(id)?;
        let parent = entry.parent.ok_or(TreeError::RootImmutable)?;
        let name = entry.name.clone();

        let ids = self.subtree_ids(id);
        self.unlink(parent, &name);

        let mut removed = ids.iter().filter_map(|id| self.entries.remove(id));
        let root = removed
            .next()
            .ok_or_else(|| TreeError::NotFound(format!("entry #{}", id)))?;
        let descendants = removed.collect();

        Ok(DetachedSubtree {
            parent,
            root,
            descendants,
        })
    }

    /// Put a previously detached subtree back where it was.
    pub(crate) fn restore(&mut self, subtree: &DetachedSubtree) -> TreeResult<IdPath> {
        if !self.existing(subtree.parent)?.is_directory() {
            return Err(TreeError::NotADirectory(self.path_of(subtree.parent)?));
        }
        self.check_free_name(subtree.parent, &subtree.root.name)?;
        self.check_new_id(subtree.root.id)?;
        for entry in &subtree.descendants {
            self.check_new_id(entry.id)?;
        }

        self.attach(subtree.root.clone())?;
        for entry in &subtree.descendants {
            self.entries.insert(entry.id, entry.clone());
        }
        self.id_path_of(subtree.root.id)
    }

    /// an owned copy of the current tree
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            root: self.snapshot_node(&self.root),
        }
    }

    fn snapshot_node(&self, entry: &Entry) -> SnapshotNode {
        SnapshotNode {
            id: entry.id,
            name: entry.name.clone(),
            content: entry.content().cloned(),
            timestamp: entry.timestamp(),
            children: self
                .children(entry)
                .map(|child| self.snapshot_node(child))
                .collect(),
        }
    }

    /// render the tree as indented text, one entry per line
    pub fn render(&self) -> String {
        let mut out = String::from("/\n");
        self.render_children(&self.root, 1, &mut out);
        out
    }

    fn render_children(&self, entry: &Entry, depth: usize, out: &mut String) {
        for child in self.children(entry) {
            out.push_str(&"  ".repeat(depth));
            match child.content() {
                Some(content) => {
                    out.push_str(&format!("{} ({} bytes)\n", child.name, content.len()))
                }
                None => {
                    out.push_str(&format!("{}/\n", child.name));
                    self.render_children(child, depth + 1, out);
                }
            }
        }
    }
}
