//! Thread-safe handle to a [`LocalHistory`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::change::Change;
use crate::history::error::HistoryResult;
use crate::history::manager::LocalHistory;
use crate::history::revision::ChangeSetId;
use crate::tree::TreeSnapshot;

/// Cloneable handle that serialises every operation on one history.
///
/// Each call holds the lock for the whole operation, so a changeset is
/// never observed half applied.
#[derive(Debug, Clone, Default)]
pub struct SharedHistory {
    inner: Arc<Mutex<LocalHistory>>,
}

impl SharedHistory {
    pub fn new(history: LocalHistory) -> Self {
        Self {
            inner: Arc::new(Mutex::new(history)),
        }
    }

    /// Run `f` with exclusive access to the history.
    pub fn with<R>(&self, f: impl FnOnce(&mut LocalHistory) -> R) -> R {
        let mut history = self.inner.lock();
        f(&mut history)
    }

    pub fn record(
        &self,
        name: impl Into<String>,
        changes: impl IntoIterator<Item = Change>,
    ) -> HistoryResult<ChangeSetId> {
        self.inner.lock().record(name, changes)
    }

    pub fn undo(&self) -> HistoryResult<ChangeSetId> {
        self.inner.lock().undo()
    }

    pub fn redo(&self) -> HistoryResult<ChangeSetId> {
        self.inner.lock().redo()
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn revision_count(&self) -> usize {
        self.inner.lock().revisions().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_records() {
        let shared = SharedHistory::default();
        shared.with(|h| h.create_directory("shared")).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        shared
                            .with(|h| h.create_file(&format!("shared/t{}-{}", t, i), "x"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.revision_count(), 41);
        let children = shared.with(|h| {
            let dir = h.root().get_entry("shared").unwrap();
            h.root().children(dir).count()
        });
        assert_eq!(children, 40);

        for _ in 0..41 {
            shared.undo().unwrap();
        }
        assert_eq!(shared.snapshot().entry_count(), 0);
        shared.redo().unwrap();
        assert_eq!(shared.revision_count(), 1);
        assert_eq!(shared.snapshot().entry_count(), 1);
    }
}
