//! HTTP handlers serving computed funnel reports and accepting session
//! batches from the event producer.

pub mod errors;
pub mod sessions;
pub mod stats;

use crate::store::SessionStore;
use std::sync::atomic::AtomicU64;

/// Shared application state behind the router.
pub struct AppState {
    pub store: SessionStore,
    /// Maximum sessions accepted in one POST /api/sessions batch.
    pub batch_limit: usize,
    /// Whether the demo generator task is feeding the store.
    pub demo_enabled: bool,
    /// Sessions accepted through the submission endpoint since startup.
    pub sessions_submitted_total: AtomicU64,
}

impl AppState {
    pub fn new(store: SessionStore, batch_limit: usize, demo_enabled: bool) -> Self {
        Self {
            store,
            batch_limit,
            demo_enabled,
            sessions_submitted_total: AtomicU64::new(0),
        }
    }
}
