//! Observers for changeset traversal.

use crate::change::change::Change;

/// Notified once per change while a changeset is applied or reverted, in
/// traversal order.
pub trait ChangeListener {
    fn applied(&mut self, index: usize, change: &Change) {
        let _ = (index, change);
    }

    fn reverted(&mut self, index: usize, change: &Change) {
        let _ = (index, change);
    }
}

/// The no-op listener.
impl ChangeListener for () {}

/// One observed step of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Applied(usize),
    Reverted(usize),
}

/// Listener that records every event it sees.
#[derive(Debug, Default)]
pub struct ChangeLog {
    events: Vec<ChangeEvent>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl ChangeListener for ChangeLog {
    fn applied(&mut self, index: usize, _change: &Change) {
        self.events.push(ChangeEvent::Applied(index));
    }

    fn reverted(&mut self, index: usize, _change: &Change) {
        self.events.push(ChangeEvent::Reverted(index));
    }
}
