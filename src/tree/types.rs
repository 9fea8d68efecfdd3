//! core value types for the entry tree.

use std::fmt;
use std::fmt::Formatter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permanent identity of an entry.
///
/// Ids are handed out when an entry is created and never reassigned, so they
/// keep naming the same logical node across renames and moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    /// id reserved for the tree root
    pub const ROOT: EntryId = EntryId(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain of entry ids from the first level below the root down to an entry.
///
/// The root itself has the empty path. Two IdPaths are equal iff they list the
/// same ids in the same order, independent of the names those entries carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdPath(Vec<EntryId>);

impl IdPath {
    /// the root's path
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_ids(ids: impl IntoIterator<Item = EntryId>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// extend this path with a freshly created child id
    pub fn child(&self, id: EntryId) -> Self {
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    /// id of the entry this path points at (`ROOT` for the empty path)
    pub fn id(&self) -> EntryId {
        self.0.last().copied().unwrap_or(EntryId::ROOT)
    }

    /// path of the parent entry, `None` for the root
    pub fn parent(&self) -> Option<IdPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.0
    }

    /// number of levels below the root
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.0.contains(&id)
    }

    /// true if `self` is `other` or one of its ancestors
    pub fn is_prefix_of(&self, other: &IdPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for IdPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for id in &self.0 {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

/// Opaque file payload.
///
/// The tree never looks inside; it only stores, clones and compares it.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Content(Vec<u8>);

impl Content {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// the payload as text, if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) if text.len() <= 32 => write!(f, "Content({:?})", text),
            _ => write!(f, "Content({} bytes)", self.0.len()),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Logical ordering key attached to changesets and content changes.
///
/// The core stores it and hands it back; it never interprets it. `-1` is the
/// conventional "unknown" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const UNKNOWN: Timestamp = Timestamp(-1);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// wall clock time in milliseconds since the unix epoch
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// interpret the value as epoch milliseconds, for display
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if self.0 < 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.0)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
            None => write!(f, "{}", self.0),
        }
    }
}

/// separator between names in a path string
pub const PATH_SEPARATOR: char = '/';

/// split a path string into its names, ignoring empty segments
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// split a path into (parent path, last name); `None` for the root path
pub fn split_parent(path: &str) -> Option<(String, &str)> {
    let mut names = split_path(path);
    let name = names.pop()?;
    Some((names.join("/"), name))
}

/// validate a single entry name
pub fn validate_name(name: &str) -> Result<(), InvalidNameError> {
    if name.is_empty() {
        return Err(InvalidNameError::Empty);
    }
    if name == "." || name == ".." {
        return Err(InvalidNameError::Reserved(name.to_string()));
    }
    if let Some(position) = name.find(PATH_SEPARATOR) {
        return Err(InvalidNameError::InvalidCharacter {
            char: PATH_SEPARATOR,
            position,
        });
    }
    Ok(())
}

/// error type for invalid entry names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    InvalidCharacter { char: char, position: usize },
    Reserved(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
            Self::Reserved(name) => write!(f, "'{}' is a reserved name", name),
        }
    }
}

impl std::error::Error for InvalidNameError {}
