//! Reversible change commands.
//!
//! Each variant stores the arguments of its forward mutation and, once
//! applied, exactly the state needed to undo it. Reverting clears that state
//! again, so a change toggles between applied and unapplied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::change::error::{ChangeError, ChangeResult};
use crate::tree::{Content, DetachedSubtree, Entry, EntryId, IdPath, RootEntry, Timestamp};

/// Discriminant of a [`Change`], for display and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    CreateFile,
    CreateDirectory,
    ChangeFileContent,
    Rename,
    Move,
    Delete,
}

impl ChangeKind {
    /// whether changes of this kind bring entries into existence
    pub fn is_creational(&self) -> bool {
        matches!(self, ChangeKind::CreateFile | ChangeKind::CreateDirectory)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::CreateFile => "create-file",
            ChangeKind::CreateDirectory => "create-directory",
            ChangeKind::ChangeFileContent => "change-content",
            ChangeKind::Rename => "rename",
            ChangeKind::Move => "move",
            ChangeKind::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

fn ensure_unapplied<T>(state: &Option<T>, kind: ChangeKind) -> ChangeResult<()> {
    if state.is_some() {
        return Err(ChangeError::AlreadyApplied(kind));
    }
    Ok(())
}

/// Creates a file at `path` with the given id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileChange {
    id: EntryId,
    path: String,
    content: Content,
    timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<IdPath>,
}

impl CreateFileChange {
    pub fn new(
        id: impl Into<EntryId>,
        path: impl Into<String>,
        content: impl Into<Content>,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            created: None,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        ensure_unapplied(&self.created, ChangeKind::CreateFile)?;
        let id_path = root.create_file(self.id, &self.path, self.content.clone(), self.timestamp)?;
        self.created = Some(id_path.clone());
        Ok(id_path)
    }

    fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        let id_path = self
            .created
            .as_ref()
            .ok_or(ChangeError::InvalidRevert(ChangeKind::CreateFile))?;
        root.delete(id_path.id())?;
        self.created = None;
        Ok(())
    }
}

/// Creates a directory at `path` with the given id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDirectoryChange {
    id: EntryId,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<IdPath>,
}

impl CreateDirectoryChange {
    pub fn new(id: impl Into<EntryId>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            created: None,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        ensure_unapplied(&self.created, ChangeKind::CreateDirectory)?;
        let id_path = root.create_directory(self.id, &self.path)?;
        self.created = Some(id_path.clone());
        Ok(id_path)
    }

    fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        let id_path = self
            .created
            .as_ref()
            .ok_or(ChangeError::InvalidRevert(ChangeKind::CreateDirectory))?;
        root.delete(id_path.id())?;
        self.created = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContentUndo {
    id_path: IdPath,
    previous_content: Content,
    previous_timestamp: Timestamp,
}

/// Replaces the content of the file at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFileContentChange {
    path: String,
    content: Content,
    timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    undo: Option<ContentUndo>,
}

impl ChangeFileContentChange {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<Content>,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            undo: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// content the file had before this change was applied
    pub fn previous_content(&self) -> Option<&Content> {
        self.undo.as_ref().map(|undo| &undo.previous_content)
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        ensure_unapplied(&self.undo, ChangeKind::ChangeFileContent)?;
        let id = root.resolve_non_root(&self.path)?;
        let id_path = root.id_path_of(id)?;
        let (previous_content, previous_timestamp) =
            root.replace_content(id, self.content.clone(), self.timestamp)?;
        self.undo = Some(ContentUndo {
            id_path: id_path.clone(),
            previous_content,
            previous_timestamp,
        });
        Ok(id_path)
    }

    fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        let undo = self
            .undo
            .take()
            .ok_or(ChangeError::InvalidRevert(ChangeKind::ChangeFileContent))?;
        if let Err(e) = root.replace_content(
            undo.id_path.id(),
            undo.previous_content.clone(),
            undo.previous_timestamp,
        ) {
            self.undo = Some(undo);
            return Err(e.into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RenameUndo {
    id_path: IdPath,
    old_name: String,
}

/// Gives the entry at `path` a new name within the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameChange {
    path: String,
    new_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    undo: Option<RenameUndo>,
}

impl RenameChange {
    pub fn new(path: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            new_name: new_name.into(),
            undo: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        ensure_unapplied(&self.undo, ChangeKind::Rename)?;
        let id = root.resolve_non_root(&self.path)?;
        let old_name = root.rename(id, &self.new_name)?;
        let id_path = root.id_path_of(id)?;
        self.undo = Some(RenameUndo {
            id_path: id_path.clone(),
            old_name,
        });
        Ok(id_path)
    }

    fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        let undo = self
            .undo
            .as_ref()
            .ok_or(ChangeError::InvalidRevert(ChangeKind::Rename))?;
        root.rename(undo.id_path.id(), &undo.old_name)?;
        self.undo = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MoveUndo {
    id_path: IdPath,
    old_parent: EntryId,
}

/// Moves the entry at `path` into the directory at `new_parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveChange {
    path: String,
    new_parent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    undo: Option<MoveUndo>,
}

impl MoveChange {
    pub fn new(path: impl Into<String>, new_parent: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            new_parent: new_parent.into(),
            undo: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn new_parent(&self) -> &str {
        &self.new_parent
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        ensure_unapplied(&self.undo, ChangeKind::Move)?;
        let id = root.resolve_non_root(&self.path)?;
        let new_parent = root.resolve_directory(&self.new_parent)?;
        let old_parent = root.move_entry(id, new_parent)?;
        let id_path = root.id_path_of(id)?;
        self.undo = Some(MoveUndo {
            id_path: id_path.clone(),
            old_parent,
        });
        Ok(id_path)
    }

    fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        let undo = self
            .undo
            .as_ref()
            .ok_or(ChangeError::InvalidRevert(ChangeKind::Move))?;
        root.move_entry(undo.id_path.id(), undo.old_parent)?;
        self.undo = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DeleteUndo {
    id_path: IdPath,
    subtree: DetachedSubtree,
}

/// Removes the entry at `path` together with everything below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteChange {
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    undo: Option<DeleteUndo>,
}

impl DeleteChange {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            undo: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// the subtree removed by the last apply
    pub fn removed(&self) -> Option<&DetachedSubtree> {
        self.undo.as_ref().map(|undo| &undo.subtree)
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        ensure_unapplied(&self.undo, ChangeKind::Delete)?;
        let id = root.resolve_non_root(&self.path)?;
        let id_path = root.id_path_of(id)?;
        let subtree = root.delete(id)?;
        self.undo = Some(DeleteUndo {
            id_path: id_path.clone(),
            subtree,
        });
        Ok(id_path)
    }

    fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        let undo = self
            .undo
            .as_ref()
            .ok_or(ChangeError::InvalidRevert(ChangeKind::Delete))?;
        root.restore(&undo.subtree)?;
        self.undo = None;
        Ok(())
    }
}

/// A single reversible command over a [`RootEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    CreateFile(CreateFileChange),
    CreateDirectory(CreateDirectoryChange),
    ChangeFileContent(ChangeFileContentChange),
    Rename(RenameChange),
    Move(MoveChange),
    Delete(DeleteChange),
}

impl Change {
    pub fn create_file(
        id: impl Into<EntryId>,
        path: impl Into<String>,
        content: impl Into<Content>,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Change::CreateFile(CreateFileChange::new(id, path, content, timestamp))
    }

    pub fn create_directory(id: impl Into<EntryId>, path: impl Into<String>) -> Self {
        Change::CreateDirectory(CreateDirectoryChange::new(id, path))
    }

    pub fn change_file_content(
        path: impl Into<String>,
        content: impl Into<Content>,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Change::ChangeFileContent(ChangeFileContentChange::new(path, content, timestamp))
    }

    pub fn rename(path: impl Into<String>, new_name: impl Into<String>) -> Self {
        Change::Rename(RenameChange::new(path, new_name))
    }

    pub fn move_to(path: impl Into<String>, new_parent: impl Into<String>) -> Self {
        Change::Move(MoveChange::new(path, new_parent))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Change::Delete(DeleteChange::new(path))
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::CreateFile(_) => ChangeKind::CreateFile,
            Change::CreateDirectory(_) => ChangeKind::CreateDirectory,
            Change::ChangeFileContent(_) => ChangeKind::ChangeFileContent,
            Change::Rename(_) => ChangeKind::Rename,
            Change::Move(_) => ChangeKind::Move,
            Change::Delete(_) => ChangeKind::Delete,
        }
    }

    /// the path this change targets, as given when it was built
    pub fn path(&self) -> &str {
        match self {
            Change::CreateFile(c) => c.path(),
            Change::CreateDirectory(c) => c.path(),
            Change::ChangeFileContent(c) => c.path(),
            Change::Rename(c) => c.path(),
            Change::Move(c) => c.path(),
            Change::Delete(c) => c.path(),
        }
    }

    /// Perform the forward mutation.
    ///
    /// On success the change keeps what it needs to revert and returns the
    /// IdPath of the entry it touched. On failure the tree is unchanged and
    /// the change stays unapplied.
    pub fn apply_to(&mut self, root: &mut RootEntry) -> ChangeResult<IdPath> {
        match self {
            Change::CreateFile(c) => c.apply_to(root),
            Change::CreateDirectory(c) => c.apply_to(root),
            Change::ChangeFileContent(c) => c.apply_to(root),
            Change::Rename(c) => c.apply_to(root),
            Change::Move(c) => c.apply_to(root),
            Change::Delete(c) => c.apply_to(root),
        }
    }

    /// Undo the last [`apply_to`](Self::apply_to).
    ///
    /// Exact only when every change applied after this one has already been
    /// reverted and the tree was not mutated by other means in between.
    pub fn revert_on(&mut self, root: &mut RootEntry) -> ChangeResult<()> {
        match self {
            Change::CreateFile(c) => c.revert_on(root),
            Change::CreateDirectory(c) => c.revert_on(root),
            Change::ChangeFileContent(c) => c.revert_on(root),
            Change::Rename(c) => c.revert_on(root),
            Change::Move(c) => c.revert_on(root),
            Change::Delete(c) => c.revert_on(root),
        }
    }

    /// IdPath of the touched entry, while applied
    pub fn affected_id_path(&self) -> Option<&IdPath> {
        match self {
            Change::CreateFile(c) => c.created.as_ref(),
            Change::CreateDirectory(c) => c.created.as_ref(),
            Change::ChangeFileContent(c) => c.undo.as_ref().map(|u| &u.id_path),
            Change::Rename(c) => c.undo.as_ref().map(|u| &u.id_path),
            Change::Move(c) => c.undo.as_ref().map(|u| &u.id_path),
            Change::Delete(c) => c.undo.as_ref().map(|u| &u.id_path),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.affected_id_path().is_some()
    }

    /// whether this change touched the entry with the given id
    pub fn touches(&self, id: EntryId) -> bool {
        self.affected_id_path().is_some_and(|path| path.id() == id)
    }

    /// True iff this change created `entry`.
    ///
    /// Only creation kinds can answer true. Identity is the entry id the
    /// creation assigned, so later renames, moves or content edits of the
    /// entry do not change the answer.
    pub fn is_creational_for(&self, entry: &Entry) -> bool {
        self.kind().is_creational() && self.touches(entry.id())
    }
}

impl From<CreateFileChange> for Change {
    fn from(change: CreateFileChange) -> Self {
        Change::CreateFile(change)
    }
}

impl From<CreateDirectoryChange> for Change {
    fn from(change: CreateDirectoryChange) -> Self {
        Change::CreateDirectory(change)
    }
}

impl From<ChangeFileContentChange> for Change {
    fn from(change: ChangeFileContentChange) -> Self {
        Change::ChangeFileContent(change)
    }
}

impl From<RenameChange> for Change {
    fn from(change: RenameChange) -> Self {
        Change::Rename(change)
    }
}

impl From<MoveChange> for Change {
    fn from(change: MoveChange) -> Self {
        Change::Move(change)
    }
}

impl From<DeleteChange> for Change {
    fn from(change: DeleteChange) -> Self {
        Change::Delete(change)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateFile(c) => write!(f, "create file '{}' (#{})", c.path, c.id),
            Change::CreateDirectory(c) => write!(f, "create directory '{}' (#{})", c.path, c.id),
            Change::ChangeFileContent(c) => {
                write!(f, "change content of '{}' ({} bytes)", c.path, c.content.len())
            }
            Change::Rename(c) => write!(f, "rename '{}' to '{}'", c.path, c.new_name),
            Change::Move(c) => write!(f, "move '{}' to '{}/'", c.path, c.new_parent),
            Change::Delete(c) => write!(f, "delete '{}'", c.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with_file() -> RootEntry {
        let mut root = RootEntry::new();
        Change::create_directory(1, "dir").apply_to(&mut root).unwrap();
        Change::create_file(2, "dir/file", "one", 10).apply_to(&mut root).unwrap();
        root
    }

    #[test]
    fn test_create_file_apply_and_revert() {
        let mut root = RootEntry::new();
        let mut change = Change::create_file(1, "file", "abc", -1);

        let id_path = change.apply_to(&mut root).unwrap();
        assert_eq!(id_path, IdPath::from_ids([EntryId::new(1)]));
        assert_eq!(change.affected_id_path(), Some(&id_path));
        assert_eq!(
            root.get_entry("file").unwrap().content(),
            Some(&Content::from("abc"))
        );

        change.revert_on(&mut root).unwrap();
        assert!(!root.has_entry("file"));
        assert!(!change.is_applied());
    }

    #[test]
    fn test_apply_twice_is_rejected() {
        let mut root = RootEntry::new();
        let mut change = Change::create_directory(1, "dir");
        change.apply_to(&mut root).unwrap();
        assert!(matches!(
            change.apply_to(&mut root),
            Err(ChangeError::AlreadyApplied(ChangeKind::CreateDirectory))
        ));
    }

    #[test]
    fn test_revert_before_apply_is_invalid() {
        let mut root = root_with_file();
        let mut change = Change::delete("dir/file");
        assert!(matches!(
            change.revert_on(&mut root),
            Err(ChangeError::InvalidRevert(ChangeKind::Delete))
        ));
        assert!(root.has_entry("dir/file"));
    }

    #[test]
    fn test_failed_apply_leaves_change_unapplied() {
        let mut root = root_with_file();
        let before = root.snapshot();

        let mut change = Change::create_file(3, "dir/file", "dup", -1);
        let err = change.apply_to(&mut root).unwrap_err();
        assert!(err.is_name_collision());
        assert!(!change.is_applied());

        let mut change = Change::change_file_content("missing", "x", -1);
        assert!(change.apply_to(&mut root).unwrap_err().is_not_found());
        assert_eq!(root.snapshot(), before);
    }

    #[test]
    fn test_change_content_restores_previous_content_and_timestamp() {
        let mut root = root_with_file();
        let mut change = Change::change_file_content("dir/file", "two", 20);

        change.apply_to(&mut root).unwrap();
        let file = root.get_entry("dir/file").unwrap();
        assert_eq!(file.content(), Some(&Content::from("two")));
        assert_eq!(file.timestamp(), Some(Timestamp::new(20)));
        let Change::ChangeFileContent(c) = &change else {
            panic!("expected a content change, got {change}");
        };
        assert_eq!(c.previous_content(), Some(&Content::from("one")));

        change.revert_on(&mut root).unwrap();
        let file = root.get_entry("dir/file").unwrap();
        assert_eq!(file.content(), Some(&Content::from("one")));
        assert_eq!(file.timestamp(), Some(Timestamp::new(10)));
    }

    #[test]
    fn test_change_content_of_directory_fails() {
        let mut root = root_with_file();
        let mut change = Change::change_file_content("dir", "x", -1);
        assert!(matches!(
            change.apply_to(&mut root),
            Err(ChangeError::Tree(crate::tree::TreeError::NotAFile(_)))
        ));
    }

    #[test]
    fn test_rename_and_revert() {
        let mut root = root_with_file();
        let mut change = Change::rename("dir/file", "renamed");

        let id_path = change.apply_to(&mut root).unwrap();
        assert_eq!(root.get_entry_by_id_path(&id_path).unwrap().name(), "renamed");
        assert!(!root.has_entry("dir/file"));

        change.revert_on(&mut root).unwrap();
        assert_eq!(root.get_entry("dir/file").unwrap().id(), EntryId::new(2));
    }

    #[test]
    fn test_move_and_revert() {
        let mut root = root_with_file();
        Change::create_directory(3, "other").apply_to(&mut root).unwrap();
        let before = root.snapshot();

        let mut change = Change::move_to("dir/file", "other");
        let id_path = change.apply_to(&mut root).unwrap();
        assert_eq!(id_path, IdPath::from_ids([EntryId::new(3), EntryId::new(2)]));
        assert!(root.has_entry("other/file"));

        change.revert_on(&mut root).unwrap();
        assert_eq!(root.snapshot(), before);
    }

    #[test]
    fn test_delete_restores_whole_subtree() {
        let mut root = root_with_file();
        Change::create_directory(3, "dir/sub").apply_to(&mut root).unwrap();
        Change::create_file(4, "dir/sub/deep", "d", 5).apply_to(&mut root).unwrap();
        let before = root.snapshot();

        let mut change = Change::delete("dir");
        change.apply_to(&mut root).unwrap();
        assert!(root.is_empty());
        let Change::Delete(c) = &change else {
            panic!("expected a delete, got {change}");
        };
        assert_eq!(c.removed().map(|s| s.entry_count()), Some(4));

        change.revert_on(&mut root).unwrap();
        assert_eq!(root.snapshot(), before);
    }

    #[test]
    fn test_is_creational_for() {
        let mut root = RootEntry::new();
        let mut create = Change::create_file(1, "file", "", -1);
        let mut edit = Change::change_file_content("file", "x", -1);
        create.apply_to(&mut root).unwrap();
        edit.apply_to(&mut root).unwrap();

        let file = root.get_entry("file").unwrap();
        assert!(create.is_creational_for(file));
        assert!(!edit.is_creational_for(file));
        assert!(edit.touches(file.id()));
    }

    #[test]
    fn test_creational_survives_rename() {
        let mut root = RootEntry::new();
        let mut create = Change::create_directory(1, "dir");
        create.apply_to(&mut root).unwrap();
        Change::rename("dir", "moved").apply_to(&mut root).unwrap();

        assert!(create.is_creational_for(root.get_entry("moved").unwrap()));
    }

    #[test]
    fn test_serialize_change() {
        let change = Change::rename("a", "b");
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], "rename");
        assert_eq!(json["new_name"], "b");

        let back: Change = serde_json::from_value(json).unwrap();
        assert_eq!(back, change);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Change::create_file(1, "dir/file", "", -1).to_string(),
            "create file 'dir/file' (#1)"
        );
        assert_eq!(Change::delete("x").to_string(), "delete 'x'");
        assert_eq!(ChangeKind::ChangeFileContent.to_string(), "change-content");
    }
}
