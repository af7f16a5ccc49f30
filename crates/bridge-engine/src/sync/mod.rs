//! Selective state synchronizer
//!
//! Keeps two independently-owned trees eventually consistent without
//! deep-watching everything. Detected changes become
//! [`UpdateOperation`]s, coalesced per path inside a flush window and
//! applied to the *opposite* tree on the next scheduler tick.
//!
//! ## Intake guards
//!
//! An operation is dropped (counted as skipped) when its path matches
//! an excluded, non-always-sync pattern, or when its value is
//! deep-equal to the last applied value for that path. The second
//! guard doubles as the self-echo breaker: applying an operation to
//! the opposite tree fires that tree's watchers, and the echoed change
//! compares equal against the cache.

mod watch;

use crate::bus::EventBus;
use crate::config::SyncConfig;
use crate::matcher::PatternMatcher;
use crate::sched::TimerHandle;
use bridge_domain::events::{SYNC_COMPLETED, SYNC_RESYNC};
use bridge_domain::path::TreePath;
use bridge_domain::ports::tree::WatchId;
use bridge_domain::ports::{Scheduler, StateTree, StatusSink};
use bridge_domain::status::{BridgeState, StatusUpdate};
use bridge_domain::update::{Origin, PendingUpdateSet, UpdateOperation};
use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

// ============================================================================
// Stats
// ============================================================================

/// Counters exposed for diagnostics and health checks
#[derive(Debug, Default)]
pub struct SyncStats {
    synced: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
    last_flush_size: AtomicU64,
}

/// Point-in-time copy of [`SyncStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncStatsSnapshot {
    /// Operations applied to the opposite tree
    pub synced: u64,
    /// Operations dropped by exclusion or the idempotence cache
    pub skipped: u64,
    /// Operations that failed to apply
    pub errors: u64,
    /// Size of the most recent flush
    pub last_flush_size: u64,
}

impl SyncStats {
    /// Snapshot the counters
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            synced: self.synced.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_flush_size: self.last_flush_size.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Synchronizer
// ============================================================================

/// Callback for path subscribers; receives the path and its new value
pub type PathSubscriber = Arc<dyn Fn(&TreePath, &Value) + Send + Sync>;

struct SubscriberSlot {
    path: TreePath,
    listeners: Vec<(u64, PathSubscriber)>,
}

struct WatchRecord {
    origin: Origin,
    path: String,
    id: WatchId,
}

pub(crate) struct SyncInner {
    pub(crate) config: SyncConfig,
    pub(crate) tree_a: Arc<dyn StateTree>,
    pub(crate) tree_b: Arc<dyn StateTree>,
    scheduler: Arc<dyn Scheduler>,
    status: Arc<dyn StatusSink>,
    bus: EventBus,
    pub(crate) exclude: Vec<PatternMatcher>,
    pub(crate) always: Vec<PatternMatcher>,
    pending: Mutex<PendingUpdateSet>,
    last_applied: Mutex<HashMap<String, Value>>,
    pub(crate) id_snapshots: Mutex<HashMap<String, Vec<String>>>,
    seq: AtomicU64,
    flush_scheduled: AtomicBool,
    flushing: AtomicBool,
    flush_task: Mutex<Option<TimerHandle>>,
    stats: SyncStats,
    subscribers: DashMap<String, SubscriberSlot>,
    next_subscriber: AtomicU64,
    watches: Mutex<Vec<WatchRecord>>,
}

impl SyncInner {
    pub(crate) fn tree(&self, origin: Origin) -> &Arc<dyn StateTree> {
        match origin {
            Origin::TreeA => &self.tree_a,
            Origin::TreeB => &self.tree_b,
        }
    }

    pub(crate) fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|m| m.matches(path))
            && !self.always.iter().any(|m| m.matches(path))
    }

    pub(crate) fn is_always_sync(&self, path: &str) -> bool {
        self.always.iter().any(|m| m.matches(path))
    }

    /// Whether `path` or any of its ancestors falls in an excluded
    /// subtree
    ///
    /// The deep watcher installed at the depth cutoff reports changes
    /// below excluded nodes too, so intake must test every ancestor
    /// prefix, not just the changed path. An always-sync match on the
    /// changed path overrides.
    pub(crate) fn in_excluded_subtree(&self, path: &TreePath) -> bool {
        if self.is_always_sync(&path.to_string()) {
            return false;
        }
        let mut current = Some(path.clone());
        while let Some(candidate) = current {
            if self.is_excluded(&candidate.to_string()) {
                return true;
            }
            current = candidate.parent();
        }
        false
    }

    pub(crate) fn record_watch(&self, origin: Origin, path: &TreePath, id: WatchId) {
        self.watches.lock().expect("sync watch lock").push(WatchRecord {
            origin,
            path: path.to_string(),
            id,
        });
    }

    /// Remove watches registered strictly below `path` on one tree
    pub(crate) fn unwatch_below(&self, origin: Origin, path: &TreePath) {
        let prefix = format!("{path}.");
        let removed: Vec<WatchId> = {
            let mut watches = self.watches.lock().expect("sync watch lock");
            let (below, keep): (Vec<WatchRecord>, Vec<WatchRecord>) = watches
                .drain(..)
                .partition(|w| w.origin == origin && w.path.starts_with(&prefix));
            *watches = keep;
            below.into_iter().map(|w| w.id).collect()
        };
        let tree = self.tree(origin);
        for id in removed {
            tree.unwatch(id);
        }
    }
}

/// Path-based watcher and batched propagator over both trees
#[derive(Clone)]
pub struct StateSynchronizer {
    inner: Arc<SyncInner>,
}

impl StateSynchronizer {
    /// Create a synchronizer; call [`start`](Self::start) to attach watchers
    pub fn new(
        config: SyncConfig,
        tree_a: Arc<dyn StateTree>,
        tree_b: Arc<dyn StateTree>,
        bus: EventBus,
        scheduler: Arc<dyn Scheduler>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let exclude = config
            .exclude_paths
            .iter()
            .map(|p| PatternMatcher::compile(p))
            .collect();
        let always = config
            .always_sync_paths
            .iter()
            .map(|p| PatternMatcher::compile(p))
            .collect();
        Self {
            inner: Arc::new(SyncInner {
                config,
                tree_a,
                tree_b,
                scheduler,
                status,
                bus,
                exclude,
                always,
                pending: Mutex::new(PendingUpdateSet::new()),
                last_applied: Mutex::new(HashMap::new()),
                id_snapshots: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                flush_scheduled: AtomicBool::new(false),
                flushing: AtomicBool::new(false),
                flush_task: Mutex::new(None),
                stats: SyncStats::default(),
                subscribers: DashMap::new(),
                next_subscriber: AtomicU64::new(0),
                watches: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Attach watchers on both trees per the depth policy
    pub fn start(&self) {
        watch::attach_tree(self, Origin::TreeA);
        watch::attach_tree(self, Origin::TreeB);
        info!(
            watches = self.inner.watches.lock().expect("sync watch lock").len(),
            "Synchronizer watching both trees"
        );
    }

    /// Detach all watchers, cancel the pending flush, discard the queue
    pub fn shutdown(&self) {
        let watches: Vec<WatchRecord> =
            std::mem::take(&mut *self.inner.watches.lock().expect("sync watch lock"));
        for record in watches {
            self.inner.tree(record.origin).unwatch(record.id);
        }
        if let Some(task) = self.inner.flush_task.lock().expect("sync flush lock").take() {
            task.cancel();
        }
        self.inner.pending.lock().expect("sync pending lock").clear();
    }

    /// Diagnostic counters
    pub fn stats(&self) -> SyncStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Number of operations waiting for the next flush
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().expect("sync pending lock").len()
    }

    pub(crate) fn inner(&self) -> &Arc<SyncInner> {
        &self.inner
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscribe to applied updates at a path
    ///
    /// The callback fires for updates at exactly `path`, and for
    /// updates strictly below it with the recomputed value at `path`.
    pub fn subscribe<F>(&self, path: &str, callback: F) -> u64
    where
        F: Fn(&TreePath, &Value) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let parsed = TreePath::parse(path);
        self.inner
            .subscribers
            .entry(parsed.to_string())
            .or_insert_with(|| SubscriberSlot {
                path: parsed,
                listeners: Vec::new(),
            })
            .listeners
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a path subscription
    pub fn unsubscribe(&self, path: &str, id: u64) {
        let key = TreePath::parse(path).to_string();
        if let Some(mut slot) = self.inner.subscribers.get_mut(&key) {
            slot.listeners.retain(|(other, _)| *other != id);
        }
    }

    // ------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------

    /// Feed one detected change into the pending queue
    pub(crate) fn intake(&self, origin: Origin, path: &TreePath, value: &Value) {
        let key = path.to_string();

        if self.inner.in_excluded_subtree(path) {
            self.inner.stats.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        {
            let cache = self.inner.last_applied.lock().expect("sync cache lock");
            if cache.get(&key).is_some_and(|last| last == value) {
                // Idempotence guard; also breaks the A→B→A echo
                self.inner.stats.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let op = UpdateOperation::new(path.clone(), value.clone(), seq, origin);
        self.inner.pending.lock().expect("sync pending lock").insert(op);
        self.schedule_flush();
    }

    /// Queue a change as if it had been observed on `origin`
    ///
    /// Exposed for collaborators that mutate a tree outside its watch
    /// topology and need to announce it.
    pub fn queue_update(&self, origin: Origin, path: &TreePath, value: Value) {
        self.intake(origin, path, &value);
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let sync = self.clone();
        let scheduler = Arc::clone(&self.inner.scheduler);
        let task = TimerHandle::new(tokio::spawn(async move {
            // Deferred one tick to coalesce synchronous bursts
            scheduler.yield_tick().await;
            sync.inner.flush_scheduled.store(false, Ordering::Release);
            sync.run_flush();
        }));
        *self.inner.flush_task.lock().expect("sync flush lock") = Some(task);
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Drain and apply the pending queue immediately
    pub fn flush_now(&self) {
        self.run_flush();
    }

    fn run_flush(&self) {
        // Re-entrancy guard: a flush triggered from inside another
        // flush is merged into the next cycle
        if self.inner.flushing.swap(true, Ordering::AcqRel) {
            self.schedule_flush();
            return;
        }

        let ops = self
            .inner
            .pending
            .lock()
            .expect("sync pending lock")
            .drain_ordered();
        let total = ops.len();
        let mut applied = 0u64;

        for op in ops {
            if self.apply(&op) {
                applied += 1;
            }
        }

        self.inner
            .stats
            .last_flush_size
            .store(total as u64, Ordering::Relaxed);
        self.inner.flushing.store(false, Ordering::Release);

        // Operations that arrived mid-flush wait for the next cycle
        if !self.inner.pending.lock().expect("sync pending lock").is_empty() {
            self.schedule_flush();
        }

        if total > 0 {
            debug!(applied = applied, total = total, "Sync flush completed");
            self.inner.bus.emit(
                SYNC_COMPLETED,
                json!({ "applied": applied, "queued": total }),
            );
        }
    }

    /// Apply one operation to the opposite tree; errors are contained
    fn apply(&self, op: &UpdateOperation) -> bool {
        let target = self.inner.tree(op.source.opposite());
        let key = op.path.to_string();

        // Prime the cache first so the echo from the target tree's
        // watchers is dropped by the idempotence guard
        self.inner
            .last_applied
            .lock()
            .expect("sync cache lock")
            .insert(key.clone(), op.value.clone());

        match target.set(&op.path, op.value.clone()) {
            Ok(()) => {
                self.inner.stats.synced.fetch_add(1, Ordering::Relaxed);
                self.notify_subscribers(op.source.opposite(), &op.path, &op.value);
                true
            }
            Err(err) => {
                self.inner.stats.errors.fetch_add(1, Ordering::Relaxed);
                error!(path = %op.path, source = %op.source, error = %err, "Failed to apply update");
                self.inner.status.update_status(
                    StatusUpdate::state(BridgeState::SyncError)
                        .with_message(format!("Failed to apply update at {key}: {err}"))
                        .with_affected(vec!["synchronizer".to_string()]),
                );
                false
            }
        }
    }

    fn notify_subscribers(&self, target: Origin, path: &TreePath, value: &Value) {
        let tree = self.inner.tree(target);
        // Collect first so no registry shard is locked during callbacks
        let mut notifications: Vec<(TreePath, Value, Vec<PathSubscriber>)> = Vec::new();
        for slot in self.inner.subscribers.iter() {
            let subscriber_path = &slot.value().path;
            let listeners: Vec<PathSubscriber> = slot
                .value()
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            if subscriber_path == path {
                notifications.push((path.clone(), value.clone(), listeners));
            } else if path.is_strict_prefix(subscriber_path) {
                // Parent-object subscriber gets the recomputed parent value
                let parent_value = tree.get(subscriber_path).unwrap_or(Value::Null);
                notifications.push((subscriber_path.clone(), parent_value, listeners));
            }
        }
        for (notify_path, notify_value, listeners) in notifications {
            for listener in listeners {
                listener(&notify_path, &notify_value);
            }
        }
    }

    // ------------------------------------------------------------------
    // Recovery hooks
    // ------------------------------------------------------------------

    /// Copy every watched root of `source` wholesale into the other tree
    ///
    /// Used by recovery strategies when incremental sync can no longer
    /// be trusted. Clears the idempotence cache first.
    pub fn force_full_resync(&self, source: Origin) -> bridge_domain::error::Result<()> {
        self.inner.last_applied.lock().expect("sync cache lock").clear();
        self.inner.pending.lock().expect("sync pending lock").clear();

        let source_tree = self.inner.tree(source);
        let target_tree = self.inner.tree(source.opposite());
        let roots = watch::root_paths(self.inner(), source);
        let mut copied = 0u64;
        for root in &roots {
            if let Some(value) = source_tree.get(root) {
                self.inner
                    .last_applied
                    .lock()
                    .expect("sync cache lock")
                    .insert(root.to_string(), value.clone());
                target_tree.set(root, value)?;
                copied += 1;
            }
        }
        self.inner.stats.synced.fetch_add(copied, Ordering::Relaxed);
        info!(source = %source, roots = copied, "Forced full resync");
        self.inner
            .bus
            .emit(SYNC_RESYNC, json!({ "source": source, "roots": copied }));
        Ok(())
    }
}

impl std::fmt::Debug for StateSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSynchronizer")
            .field("pending", &self.pending_len())
            .field("stats", &self.stats())
            .finish()
    }
}
