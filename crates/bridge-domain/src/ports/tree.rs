//! Observable state tree contract
//!
//! Each tree exposes exactly two capabilities to the synchronizer:
//! change observation on an arbitrary path (with a `deep` flag) and
//! get/set by path with auto-vivification. Everything else about the
//! tree's reactivity model stays on the other side of this trait.

use crate::error::Result;
use crate::path::TreePath;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of one registered watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(Uuid);

impl WatchId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback invoked with the precise changed path and its new value
pub type ChangeObserver = Arc<dyn Fn(&TreePath, &Value) + Send + Sync>;

/// Path-addressed, observable state tree
///
/// ## Watch semantics
///
/// A shallow watch (`deep = false`) fires only when the watched path
/// itself is assigned (a reference/identity change). A deep watch also
/// fires for any descendant assignment, delivering the descendant's
/// path and value.
///
/// ## Set semantics
///
/// `set` walks the path and auto-vivifies missing intermediates:
/// objects for key segments, arrays for index segments, with arrays
/// null-padded to reach an index.
pub trait StateTree: Send + Sync {
    /// Read the value at a path, if present
    fn get(&self, path: &TreePath) -> Option<Value>;

    /// Write a value at a path, creating missing intermediates
    fn set(&self, path: &TreePath, value: Value) -> Result<()>;

    /// Register a change observer on a path
    fn watch(&self, path: &TreePath, deep: bool, observer: ChangeObserver) -> WatchId;

    /// Remove a previously registered observer
    fn unwatch(&self, id: WatchId);
}
