//! Status reporting collaborator
//!
//! The synchronizer and supervisor report state transitions here;
//! they never poll it synchronously for decisions, with one
//! exception: the supervisor resets its attempt counter when an
//! externally observed `Healthy` status arrives.

use crate::status::{BridgeStatus, StatusUpdate};
use std::sync::Arc;

/// Callback invoked after each status transition
pub type StatusListener = Arc<dyn Fn(&BridgeStatus) + Send + Sync>;

/// Removes its listener when dropped
pub struct StatusListenerGuard {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl StatusListenerGuard {
    /// Wrap a removal closure
    pub fn new(remove: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            remove: Some(remove),
        }
    }

    /// Remove the listener now instead of at drop time
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for StatusListenerGuard {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for StatusListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusListenerGuard")
            .field("armed", &self.remove.is_some())
            .finish()
    }
}

/// Bridge status collaborator
pub trait StatusSink: Send + Sync {
    /// Merge a report into the current snapshot and notify listeners
    fn update_status(&self, update: StatusUpdate);

    /// Current status snapshot
    fn get_status(&self) -> BridgeStatus;

    /// Register a transition listener; dropping the guard unsubscribes
    fn on_status_changed(&self, listener: StatusListener) -> StatusListenerGuard;
}
