//! Subscription tracking registry
//!
//! Shared between the event bus (which records registrations and
//! invocations) and the memory guard (which reads ages and call
//! counts during its sweeps). The tracker never decides anything; it
//! only observes.

use bridge_domain::ports::Scheduler;
use bridge_domain::subscription::{SubscriptionId, SubscriptionInfo};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Callback that detaches the tracked listener from its bus
pub type UnsubscribeFn = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct ComponentRecord {
    generation: u64,
    alive: bool,
}

/// Component lifecycle registry with generation counters
///
/// The cooperative model has no weak references, so liveness is an
/// explicit contract: components register on construction and
/// unregister on teardown. Re-registration bumps the generation, which
/// lets the guard spot subscriptions left behind by a previous
/// incarnation ("garbage collected" means "explicitly unregistered").
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: DashMap<String, ComponentRecord>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, returning its generation
    pub fn register(&self, name: &str) -> u64 {
        let mut entry = self
            .components
            .entry(name.to_string())
            .or_insert(ComponentRecord {
                generation: 0,
                alive: false,
            });
        entry.generation += 1;
        entry.alive = true;
        entry.generation
    }

    /// Mark a component as gone; its subscriptions become dangling
    pub fn unregister(&self, name: &str) {
        if let Some(mut entry) = self.components.get_mut(name) {
            entry.alive = false;
        }
    }

    /// Current generation of a live component
    pub fn live_generation(&self, name: &str) -> Option<u64> {
        self.components
            .get(name)
            .filter(|record| record.alive)
            .map(|record| record.generation)
    }

    /// Whether a subscription taken at `generation` is still backed by
    /// a live component incarnation
    pub fn is_live(&self, name: &str, generation: Option<u64>) -> bool {
        match self.live_generation(name) {
            Some(current) => generation.is_none_or(|g| g == current),
            None => false,
        }
    }
}

/// One tracked listener registration
pub struct TrackedSubscription {
    /// Event name or wildcard pattern
    pub pattern: String,
    /// Owning component, if declared
    pub owner: Option<String>,
    /// Component generation at registration time
    pub owner_generation: Option<u64>,
    created_at: Instant,
    created_at_wall: DateTime<Utc>,
    last_used: Mutex<Option<(Instant, DateTime<Utc>)>>,
    call_count: AtomicU64,
    active: AtomicBool,
    priority: i32,
    once: bool,
    unsubscribe: Mutex<Option<UnsubscribeFn>>,
}

impl TrackedSubscription {
    /// Age of this registration relative to `now`
    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Time since the last invocation, or since creation if never fired
    pub fn idle(&self, now: Instant) -> std::time::Duration {
        let last = self
            .last_used
            .lock()
            .expect("tracker lock")
            .map(|(instant, _)| instant)
            .unwrap_or(self.created_at);
        now.saturating_duration_since(last)
    }

    /// Number of invocations so far
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Whether the listener still receives events
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Registry of listener registrations with usage metadata
pub struct SubscriptionTracker {
    scheduler: Arc<dyn Scheduler>,
    entries: DashMap<SubscriptionId, TrackedSubscription>,
    components: Arc<ComponentRegistry>,
}

impl SubscriptionTracker {
    /// Create a tracker reading time from `scheduler`
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            entries: DashMap::new(),
            components: Arc::new(ComponentRegistry::new()),
        }
    }

    /// Create as Arc for sharing
    pub fn new_shared(scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self::new(scheduler))
    }

    /// Component lifecycle registry backing dangling detection
    pub fn components(&self) -> &Arc<ComponentRegistry> {
        &self.components
    }

    /// Record a fresh registration
    ///
    /// The owning component's current generation is captured so a
    /// later re-registration marks this subscription dangling.
    pub fn track(
        &self,
        id: SubscriptionId,
        pattern: &str,
        priority: i32,
        once: bool,
        owner: Option<String>,
        unsubscribe: UnsubscribeFn,
    ) {
        let owner_generation = owner
            .as_deref()
            .and_then(|name| self.components.live_generation(name));
        self.entries.insert(
            id,
            TrackedSubscription {
                pattern: pattern.to_string(),
                owner,
                owner_generation,
                created_at: self.scheduler.now(),
                created_at_wall: Utc::now(),
                last_used: Mutex::new(None),
                call_count: AtomicU64::new(0),
                active: AtomicBool::new(true),
                priority,
                once,
                unsubscribe: Mutex::new(Some(unsubscribe)),
            },
        );
    }

    /// Record one invocation of a listener
    pub fn touch(&self, id: SubscriptionId) {
        if let Some(entry) = self.entries.get(&id) {
            entry.call_count.fetch_add(1, Ordering::Relaxed);
            *entry.last_used.lock().expect("tracker lock") =
                Some((self.scheduler.now(), Utc::now()));
        }
    }

    /// Mark a listener inactive, keeping it briefly for stats
    pub fn deactivate(&self, id: SubscriptionId) {
        if let Some(entry) = self.entries.get(&id) {
            entry.active.store(false, Ordering::Relaxed);
        }
    }

    /// Drop a registration entirely
    pub fn remove(&self, id: SubscriptionId) {
        self.entries.remove(&id);
    }

    /// Invoke the stored unsubscribe callback and deactivate
    ///
    /// Returns false when the entry is unknown or already detached.
    pub fn force_unsubscribe(&self, id: SubscriptionId) -> bool {
        let Some(entry) = self.entries.get(&id) else {
            return false;
        };
        let callback = entry.unsubscribe.lock().expect("tracker lock").take();
        entry.active.store(false, Ordering::Relaxed);
        drop(entry);
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Number of tracked registrations (active and inactive)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tracker is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count active listeners registered on an exact pattern
    pub fn active_count_for(&self, pattern: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.value().is_active() && e.value().pattern == pattern)
            .count()
    }

    /// Visit every entry; the visitor must not call back into the tracker
    pub fn for_each<F: FnMut(SubscriptionId, &TrackedSubscription)>(&self, mut f: F) {
        for entry in self.entries.iter() {
            f(*entry.key(), entry.value());
        }
    }

    /// Observable snapshot of all registrations
    pub fn snapshot(&self) -> Vec<SubscriptionInfo> {
        self.entries
            .iter()
            .map(|entry| {
                let tracked = entry.value();
                SubscriptionInfo {
                    id: *entry.key(),
                    pattern: tracked.pattern.clone(),
                    priority: tracked.priority,
                    once: tracked.once,
                    created_at: tracked.created_at_wall,
                    last_used: tracked
                        .last_used
                        .lock()
                        .expect("tracker lock")
                        .map(|(_, wall)| wall),
                    call_count: tracked.call_count(),
                    active: tracked.is_active(),
                    owner: tracked.owner.clone(),
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for SubscriptionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionTracker")
            .field("entries", &self.entries.len())
            .finish()
    }
}
