//! Synchronizer configuration types

use bridge_domain::constants::{DEFAULT_LARGE_COLLECTION_THRESHOLD, DEFAULT_MAX_WATCH_DEPTH};
use serde::{Deserialize, Serialize};

/// How arrays at or above the large-collection threshold are watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStrategy {
    /// Propagate only on identity change (array reference replaced)
    Reference,
    /// Propagate on structural change detected by diffing element ids
    #[default]
    Id,
    /// Always deep watch, regardless of size
    Full,
}

/// Selective state synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Top-level paths to watch; empty means the whole tree
    pub watch_roots: Vec<String>,

    /// Glob path patterns that get only a shallow/reference watcher
    ///
    /// Children of an excluded path are not propagated individually
    /// unless also matched by `always_sync_paths`.
    pub exclude_paths: Vec<String>,

    /// Glob path patterns synced fully regardless of exclusion or depth
    pub always_sync_paths: Vec<String>,

    /// Depth below which watchers descend recursively per property;
    /// at or beyond it, one deep watcher covers the whole subtree
    pub max_watch_depth: usize,

    /// Element count at which an array is treated as a large collection
    pub large_collection_threshold: usize,

    /// Watch strategy for large arrays
    pub array_strategy: ArrayStrategy,
}

/// Returns default synchronizer configuration with:
/// - Whole-tree watching, no exclusions
/// - Watch depth 5, large-collection threshold 100, id-diff strategy
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            watch_roots: Vec::new(),
            exclude_paths: Vec::new(),
            always_sync_paths: Vec::new(),
            max_watch_depth: DEFAULT_MAX_WATCH_DEPTH,
            large_collection_threshold: DEFAULT_LARGE_COLLECTION_THRESHOLD,
            array_strategy: ArrayStrategy::default(),
        }
    }
}

impl SyncConfig {
    /// Config excluding the given path patterns
    pub fn with_excludes<S: Into<String>>(mut self, patterns: Vec<S>) -> Self {
        self.exclude_paths = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Config force-syncing the given path patterns
    pub fn with_always_sync<S: Into<String>>(mut self, patterns: Vec<S>) -> Self {
        self.always_sync_paths = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Config watching only the given roots
    pub fn with_roots<S: Into<String>>(mut self, roots: Vec<S>) -> Self {
        self.watch_roots = roots.into_iter().map(Into::into).collect();
        self
    }
}
