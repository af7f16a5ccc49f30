//! Priority- and pattern-aware event bus
//!
//! Publish/subscribe with per-event batching queues, throttling, and
//! wildcard dispatch. Application-level events flow through here (raw
//! state changes go through the synchronizer instead).
//!
//! ## Emit path
//!
//! ```text
//! emit(name, data)
//!   └─ throttle window (per event, optional)
//!        └─ batch queue (per event, optional; flush at size or delay)
//!             └─ dispatch: exact + wildcard listeners,
//!                priority-sorted, errors contained per listener
//! ```
//!
//! A batch of one dispatches its payload unchanged; a batch of N>1
//! dispatches a single `Value::Array` of the N payloads, so listeners
//! on batched events must handle both shapes.

mod listener;

pub use listener::Subscription;
use listener::{Callback, ListenerEntry};

use crate::config::{EventBusConfig, EventTuning};
use crate::matcher::PatternMatcher;
use crate::sched::{Throttler, TimerHandle};
use crate::tracker::SubscriptionTracker;
use bridge_domain::error::Result;
use bridge_domain::events::EVENT_SEPARATOR;
use bridge_domain::ports::Scheduler;
use bridge_domain::subscription::{SubscribeOptions, SubscriptionId};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, error, warn};

// ============================================================================
// Batch queue
// ============================================================================

struct BatchQueue {
    items: Vec<Value>,
    timer: Option<TimerHandle>,
}

impl BatchQueue {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            timer: None,
        }
    }
}

// ============================================================================
// Event bus
// ============================================================================

struct BusInner {
    scheduler: Arc<dyn Scheduler>,
    tracker: Arc<SubscriptionTracker>,
    orphan_age: Duration,
    exact_tunings: DashMap<String, EventTuning>,
    wildcard_tunings: Mutex<Vec<(PatternMatcher, EventTuning)>>,
    listeners: DashMap<SubscriptionId, Arc<ListenerEntry>>,
    exact_index: DashMap<String, Vec<SubscriptionId>>,
    wildcard_index: Mutex<Vec<SubscriptionId>>,
    batches: DashMap<String, Arc<Mutex<BatchQueue>>>,
    throttlers: DashMap<String, Arc<Throttler<Value>>>,
    sweep_task: Mutex<Option<TimerHandle>>,
}

/// Priority+batching publish/subscribe bus
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus from configuration
    ///
    /// Registrations and invocations are reported into `tracker` so
    /// the memory guard can observe them.
    pub fn new(
        config: EventBusConfig,
        scheduler: Arc<dyn Scheduler>,
        tracker: Arc<SubscriptionTracker>,
    ) -> Self {
        let exact_tunings = DashMap::new();
        let mut wildcard_tunings = Vec::new();
        for (key, tuning) in config.events {
            if key.contains('*') {
                wildcard_tunings.push((
                    PatternMatcher::compile_with_separator(&key, EVENT_SEPARATOR),
                    tuning,
                ));
            } else {
                exact_tunings.insert(key, tuning);
            }
        }
        Self {
            inner: Arc::new(BusInner {
                scheduler,
                tracker,
                orphan_age: Duration::from_secs(config.orphan_age_secs),
                exact_tunings,
                wildcard_tunings: Mutex::new(wildcard_tunings),
                listeners: DashMap::new(),
                exact_index: DashMap::new(),
                wildcard_index: Mutex::new(Vec::new()),
                batches: DashMap::new(),
                throttlers: DashMap::new(),
                sweep_task: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Subscription management
    // ------------------------------------------------------------------

    /// Register a listener on an exact event name or wildcard pattern
    pub fn on<F>(&self, pattern: &str, callback: F, options: SubscribeOptions) -> Subscription
    where
        F: Fn(Value) -> Result<()> + Send + Sync + 'static,
    {
        self.on_boxed(pattern, Arc::new(callback), options)
    }

    /// Register a pre-boxed listener callback
    pub fn on_boxed(
        &self,
        pattern: &str,
        callback: Callback,
        options: SubscribeOptions,
    ) -> Subscription {
        let id = SubscriptionId::new();
        let matcher = pattern
            .contains('*')
            .then(|| PatternMatcher::compile_with_separator(pattern, EVENT_SEPARATOR));
        let entry = Arc::new(ListenerEntry::new(
            id,
            pattern,
            matcher,
            &options,
            callback,
            self.inner.scheduler.now(),
        ));

        let is_wildcard = entry.matcher.is_some();
        self.inner.listeners.insert(id, entry);
        if is_wildcard {
            self.inner
                .wildcard_index
                .lock()
                .expect("bus index lock")
                .push(id);
        } else {
            self.inner
                .exact_index
                .entry(pattern.to_string())
                .or_default()
                .push(id);
        }

        let bus = self.downgrade();
        self.inner.tracker.track(
            id,
            pattern,
            options.priority,
            options.once,
            options.owner.clone(),
            Box::new(move || {
                if let Some(inner) = bus.upgrade() {
                    EventBus { inner }.off_id(id);
                }
            }),
        );

        debug!(pattern = pattern, id = %id, "Listener registered");
        Subscription::new(id, pattern)
    }

    /// Deactivate a subscription
    pub fn off(&self, subscription: &Subscription) {
        self.off_id(subscription.id());
    }

    /// Deactivate a subscription by id
    ///
    /// The entry is kept (inactive) for in-flight stats until the
    /// orphan sweep or the memory guard purges it.
    pub fn off_id(&self, id: SubscriptionId) {
        if let Some(entry) = self.inner.listeners.get(&id) {
            entry.active.store(false, Ordering::Relaxed);
        }
        self.inner.tracker.deactivate(id);
    }

    /// Number of active listeners whose pattern is exactly `pattern`
    pub fn listener_count(&self, pattern: &str) -> usize {
        self.inner
            .exact_index
            .get(pattern)
            .map(|ids| {
                ids.iter()
                    .filter(|id| {
                        self.inner
                            .listeners
                            .get(id)
                            .is_some_and(|e| e.active.load(Ordering::Relaxed))
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Emit path
    // ------------------------------------------------------------------

    /// Publish an event
    ///
    /// Routed through the event's throttle window and batch queue when
    /// configured; dispatched synchronously otherwise.
    pub fn emit(&self, name: &str, data: Value) {
        let tuning = self.resolve_tuning(name);
        if tuning.throttled {
            let throttler = self.throttler_for(name, &tuning);
            throttler.call(data);
        } else {
            self.enqueue_or_dispatch(name, data, &tuning);
        }
    }

    fn resolve_tuning(&self, name: &str) -> EventTuning {
        if let Some(tuning) = self.inner.exact_tunings.get(name) {
            return tuning.clone();
        }
        let wildcards = self.inner.wildcard_tunings.lock().expect("bus tuning lock");
        for (matcher, tuning) in wildcards.iter() {
            if matcher.matches(name) {
                return tuning.clone();
            }
        }
        EventTuning::default()
    }

    fn throttler_for(&self, name: &str, tuning: &EventTuning) -> Arc<Throttler<Value>> {
        if let Some(existing) = self.inner.throttlers.get(name) {
            return Arc::clone(&existing);
        }
        let bus = self.downgrade();
        let event = name.to_string();
        let tuning = tuning.clone();
        let throttler = Arc::new(Throttler::new(
            Arc::clone(&self.inner.scheduler),
            Duration::from_millis(tuning.throttle_ms),
            move |value: Value| {
                if let Some(inner) = bus.upgrade() {
                    EventBus { inner }.enqueue_or_dispatch(&event, value, &tuning);
                }
            },
        ));
        self.inner
            .throttlers
            .insert(name.to_string(), Arc::clone(&throttler));
        throttler
    }

    fn enqueue_or_dispatch(&self, name: &str, data: Value, tuning: &EventTuning) {
        if !tuning.batched {
            self.dispatch(name, data);
            return;
        }

        let queue = self
            .inner
            .batches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(BatchQueue::new())))
            .clone();

        let ready = {
            let mut batch = queue.lock().expect("bus batch lock");
            batch.items.push(data);
            if batch.items.len() >= tuning.batch_size {
                if let Some(timer) = batch.timer.take() {
                    timer.cancel();
                }
                Some(std::mem::take(&mut batch.items))
            } else {
                if batch.timer.as_ref().is_none_or(|t| t.is_finished()) {
                    batch.timer = Some(self.arm_batch_timer(name, tuning.batch_delay_ms));
                }
                None
            }
        };

        if let Some(items) = ready {
            self.dispatch_batch(name, items);
        }
    }

    fn arm_batch_timer(&self, name: &str, delay_ms: u64) -> TimerHandle {
        let bus = self.downgrade();
        let event = name.to_string();
        let scheduler = Arc::clone(&self.inner.scheduler);
        TimerHandle::new(tokio::spawn(async move {
            scheduler.sleep(Duration::from_millis(delay_ms)).await;
            if let Some(inner) = bus.upgrade() {
                EventBus { inner }.flush_batch(&event);
            }
        }))
    }

    /// Flush one event's batch queue immediately
    pub fn flush_batch(&self, name: &str) {
        let Some(queue) = self.inner.batches.get(name).map(|q| Arc::clone(&q)) else {
            return;
        };
        let items = {
            let mut batch = queue.lock().expect("bus batch lock");
            if let Some(timer) = batch.timer.take() {
                timer.cancel();
            }
            std::mem::take(&mut batch.items)
        };
        if !items.is_empty() {
            self.dispatch_batch(name, items);
        }
    }

    /// Flush every pending batch queue (forced completion)
    pub fn flush_all(&self) {
        let names: Vec<String> = self.inner.batches.iter().map(|e| e.key().clone()).collect();
        for name in names {
            self.flush_batch(&name);
        }
    }

    /// Discard all pending batches and throttle windows
    pub fn clear(&self) {
        for entry in self.inner.batches.iter() {
            let mut batch = entry.value().lock().expect("bus batch lock");
            if let Some(timer) = batch.timer.take() {
                timer.cancel();
            }
            batch.items.clear();
        }
        for entry in self.inner.throttlers.iter() {
            entry.value().cancel();
        }
    }

    /// Total payloads sitting in batch queues
    pub fn pending_depth(&self) -> usize {
        self.inner
            .batches
            .iter()
            .map(|entry| entry.value().lock().expect("bus batch lock").items.len())
            .sum()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn dispatch_batch(&self, name: &str, mut items: Vec<Value>) {
        debug_assert!(!items.is_empty());
        let payload = if items.len() == 1 {
            items.remove(0)
        } else {
            Value::Array(items)
        };
        self.dispatch(name, payload);
    }

    fn dispatch(&self, name: &str, payload: Value) {
        let mut selected: Vec<Arc<ListenerEntry>> = Vec::new();

        if let Some(ids) = self.inner.exact_index.get(name) {
            for id in ids.iter() {
                if let Some(entry) = self.inner.listeners.get(id) {
                    selected.push(Arc::clone(&entry));
                }
            }
        }
        {
            let wildcard_ids = self.inner.wildcard_index.lock().expect("bus index lock");
            for id in wildcard_ids.iter() {
                if let Some(entry) = self.inner.listeners.get(id) {
                    if entry
                        .matcher
                        .as_ref()
                        .is_some_and(|matcher| matcher.matches(name))
                    {
                        selected.push(Arc::clone(&entry));
                    }
                }
            }
        }

        selected.retain(|entry| entry.active.load(Ordering::Relaxed));
        // Higher priority first; ties keep registration order
        selected.sort_by_key(|entry| std::cmp::Reverse(entry.priority));

        for entry in selected {
            // A once-listener claims its single invocation before running
            if entry.once && entry.claimed.swap(true, Ordering::Relaxed) {
                continue;
            }

            let started = self.inner.scheduler.now();
            let outcome = (entry.callback)(payload.clone());
            let elapsed = self.inner.scheduler.now().saturating_duration_since(started);

            entry.fired.fetch_add(1, Ordering::Relaxed);
            self.inner.tracker.touch(entry.id);

            if let Err(err) = outcome {
                error!(event = name, listener = %entry.id, error = %err, "Listener failed during dispatch");
            }
            if let Some(timeout_ms) = entry.timeout_ms {
                if elapsed > Duration::from_millis(timeout_ms) {
                    // Cooperative model: no preemption, warn only
                    warn!(
                        event = name,
                        listener = %entry.id,
                        elapsed_ms = elapsed.as_millis() as u64,
                        timeout_ms = timeout_ms,
                        "Listener exceeded its timeout"
                    );
                }
            }
            if entry.once {
                self.off_id(entry.id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Cleanup
    // ------------------------------------------------------------------

    /// Purge inactive listeners that never fired and outlived the
    /// orphan threshold
    ///
    /// Returns the number of purged entries.
    pub fn sweep_orphans(&self) -> usize {
        let now = self.inner.scheduler.now();
        let orphan_age = self.inner.orphan_age;
        let orphans: Vec<SubscriptionId> = self
            .inner
            .listeners
            .iter()
            .filter(|entry| {
                !entry.active.load(Ordering::Relaxed)
                    && entry.fired.load(Ordering::Relaxed) == 0
                    && now.saturating_duration_since(entry.created_at) > orphan_age
            })
            .map(|entry| *entry.key())
            .collect();

        for id in &orphans {
            self.remove_listener(*id);
        }
        if !orphans.is_empty() {
            debug!(purged = orphans.len(), "Orphan sweep purged listeners");
        }
        orphans.len()
    }

    pub(crate) fn remove_listener(&self, id: SubscriptionId) {
        if let Some((_, entry)) = self.inner.listeners.remove(&id) {
            if entry.matcher.is_some() {
                self.inner
                    .wildcard_index
                    .lock()
                    .expect("bus index lock")
                    .retain(|other| *other != id);
            } else if let Some(mut ids) = self.inner.exact_index.get_mut(&entry.pattern) {
                ids.retain(|other| *other != id);
            }
        }
        self.inner.tracker.remove(id);
    }

    /// Start the periodic orphan sweep
    pub fn start_sweeping(&self, interval: Duration) {
        let bus = self.downgrade();
        let scheduler = Arc::clone(&self.inner.scheduler);
        let task = TimerHandle::new(tokio::spawn(async move {
            loop {
                scheduler.sleep(interval).await;
                match bus.upgrade() {
                    Some(inner) => {
                        EventBus { inner }.sweep_orphans();
                    }
                    None => break,
                }
            }
        }));
        if let Some(previous) = self
            .inner
            .sweep_task
            .lock()
            .expect("bus sweep lock")
            .replace(task)
        {
            previous.cancel();
        }
    }

    /// Cancel timers and discard pending queues
    pub fn shutdown(&self) {
        if let Some(task) = self.inner.sweep_task.lock().expect("bus sweep lock").take() {
            task.cancel();
        }
        self.clear();
    }

    fn downgrade(&self) -> Weak<BusInner> {
        Arc::downgrade(&self.inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.listeners.len())
            .field("pending", &self.pending_depth())
            .finish()
    }
}
