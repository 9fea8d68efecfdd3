//! Entry records stored in the tree arena.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tree::types::{Content, EntryId, Timestamp};

/// What an entry is, with the data only that kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File {
        content: Content,
        timestamp: Timestamp,
    },
    /// children keyed by their sibling key (the name, or its lowercase form
    /// in a case-insensitive tree)
    Directory { children: BTreeMap<String, EntryId> },
}

/// A file or directory node.
///
/// Entries live in the [`RootEntry`](crate::tree::RootEntry) arena and refer
/// to their parent and children by id, never by ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub(crate) id: EntryId,
    pub(crate) name: String,
    pub(crate) parent: Option<EntryId>,
    pub(crate) kind: EntryKind,
}

impl Entry {
    pub(crate) fn file(
        id: EntryId,
        name: String,
        parent: EntryId,
        content: Content,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            parent: Some(parent),
            kind: EntryKind::File { content, timestamp },
        }
    }

    pub(crate) fn directory(id: EntryId, name: String, parent: Option<EntryId>) -> Self {
        Self {
            id,
            name,
            parent,
            kind: EntryKind::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// parent id, `None` only for the root
    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }

    /// file content, `None` for directories
    pub fn content(&self) -> Option<&Content> {
        match &self.kind {
            EntryKind::File { content, .. } => Some(content),
            EntryKind::Directory { .. } => None,
        }
    }

    /// timestamp of the last content change, `None` for directories
    pub fn timestamp(&self) -> Option<Timestamp> {
        match &self.kind {
            EntryKind::File { timestamp, .. } => Some(*timestamp),
            EntryKind::Directory { .. } => None,
        }
    }

    /// child ids in sibling-key order; empty for files
    pub fn child_ids(&self) -> Vec<EntryId> {
        match &self.kind {
            EntryKind::Directory { children } => children.values().copied().collect(),
            EntryKind::File { .. } => Vec::new(),
        }
    }

    pub(crate) fn children(&self) -> Option<&BTreeMap<String, EntryId>> {
        match &self.kind {
            EntryKind::Directory { children } => Some(children),
            EntryKind::File { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, EntryId>> {
        match &mut self.kind {
            EntryKind::Directory { children } => Some(children),
            EntryKind::File { .. } => None,
        }
    }
}
