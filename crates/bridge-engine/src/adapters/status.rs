//! Default status collaborator
//!
//! Holds the current [`BridgeStatus`] in an [`arc_swap::ArcSwap`]
//! snapshot so readers never block a writer, and fans transitions out
//! to registered listeners.

use arc_swap::ArcSwap;
use bridge_domain::ports::status::{StatusListener, StatusListenerGuard, StatusSink};
use bridge_domain::status::{BridgeStatus, StatusUpdate};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// In-process [`StatusSink`] implementation
pub struct StatusChannel {
    current: ArcSwap<BridgeStatus>,
    listeners: Arc<DashMap<u64, StatusListener>>,
    next_listener: AtomicU64,
}

impl StatusChannel {
    /// Create a channel starting in the healthy state
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(BridgeStatus::default()),
            listeners: Arc::new(DashMap::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Create as Arc for sharing
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusChannel")
            .field("state", &self.current.load().state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StatusSink for StatusChannel {
    fn update_status(&self, update: StatusUpdate) {
        let next = update.apply(&self.current.load());
        debug!(state = %next.state, message = %next.message, "Bridge status updated");
        let snapshot = Arc::new(next);
        self.current.store(Arc::clone(&snapshot));
        for entry in self.listeners.iter() {
            (entry.value())(&snapshot);
        }
    }

    fn get_status(&self) -> BridgeStatus {
        self.current.load().as_ref().clone()
    }

    fn on_status_changed(&self, listener: StatusListener) -> StatusListenerGuard {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, listener);
        let listeners = Arc::clone(&self.listeners);
        StatusListenerGuard::new(Box::new(move || {
            listeners.remove(&id);
        }))
    }
}
