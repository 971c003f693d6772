use crate::model::Session;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe holder of the current session snapshot.
///
/// Writers (the submission endpoint, the demo generator task) append whole
/// batches; readers clone the full snapshot and compute reports outside the
/// lock, so an analysis run never observes a half-applied batch.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }

    /// Append a batch of sessions.
    pub fn append(&self, batch: Vec<Session>) {
        self.sessions.write().extend(batch);
    }

    /// Replace the entire snapshot.
    pub fn replace(&self, sessions: Vec<Session>) {
        *self.sessions.write() = sessions;
    }

    /// Clone the current snapshot for an analysis run.
    pub fn snapshot(&self) -> Vec<Session> {
        self.sessions.read().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Total stage events across the snapshot.
    pub fn event_count(&self) -> u64 {
        self.sessions
            .read()
            .iter()
            .map(|s| s.events.len() as u64)
            .sum()
    }
}
