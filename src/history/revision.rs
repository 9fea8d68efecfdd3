//! Recorded changesets.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::change::{Applied, ChangeSet, ChangeSetSummary, Unapplied};

/// Identifier the history assigns to every recorded changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeSetId(Ulid);

impl ChangeSetId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// parse from the lowercase or uppercase ULID text form
    pub fn parse(text: &str) -> Option<Self> {
        Ulid::from_string(&text.to_uppercase()).ok().map(Self)
    }

    /// short form for display
    pub fn short(&self) -> String {
        self.to_string()[16..].to_string()
    }
}

impl fmt::Display for ChangeSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().to_lowercase())
    }
}

/// A changeset currently applied to the history's tree.
#[derive(Debug, Clone)]
pub struct Revision {
    pub(crate) id: ChangeSetId,
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) changeset: ChangeSet<Applied>,
}

impl Revision {
    pub fn id(&self) -> ChangeSetId {
        self.id
    }

    /// wall clock time the changeset was first recorded
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn changeset(&self) -> &ChangeSet<Applied> {
        &self.changeset
    }

    pub fn summary(&self) -> RevisionSummary {
        RevisionSummary {
            id: self.id,
            recorded_at: self.recorded_at,
            changeset: self.changeset.summary(),
        }
    }
}

/// A changeset that was undone and can be redone.
#[derive(Debug, Clone)]
pub(crate) struct UndoneRevision {
    pub(crate) id: ChangeSetId,
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) changeset: ChangeSet<Unapplied>,
}

/// Serialisable description of a [`Revision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSummary {
    pub id: ChangeSetId,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub changeset: ChangeSetSummary,
}
