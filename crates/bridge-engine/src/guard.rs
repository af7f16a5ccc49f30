//! Memory guard
//!
//! Periodic sweeps over the subscription tracker looking for listener
//! leaks. Detection runs on the poll interval only, never on every
//! mutation. The guard observes and reports; it detaches listeners
//! itself only when `auto_remediate` is enabled.
//!
//! ## What a sweep flags
//!
//! | Finding     | Condition                                              |
//! |-------------|--------------------------------------------------------|
//! | stale       | active, idle longer than the stale age                 |
//! | leak suspect| active, never fired, older than twice the stale age    |
//! | dangling    | owner component unregistered or re-registered since    |
//! | over limit  | active listeners on one pattern above the warning bar  |

use crate::bus::EventBus;
use crate::config::GuardConfig;
use crate::logging::log_leak_suspect;
use crate::sched::TimerHandle;
use crate::tracker::SubscriptionTracker;
use bridge_domain::events::LEAK_REPORT;
use bridge_domain::ports::Scheduler;
use bridge_domain::subscription::SubscriptionId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one guard sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardReport {
    /// Tracked registrations at sweep time
    pub total: usize,
    /// Active listeners idle beyond the stale age
    pub stale: Vec<String>,
    /// Never-fired listeners older than twice the stale age
    pub leak_suspects: Vec<String>,
    /// Listeners whose owning component is gone or reincarnated
    pub dangling: Vec<String>,
    /// Patterns whose active listener count exceeds the warning bar
    pub over_limit: Vec<(String, usize)>,
    /// Listeners force-unsubscribed by this sweep
    pub remediated: usize,
}

impl GuardReport {
    /// Whether the sweep found anything worth reporting
    pub fn has_findings(&self) -> bool {
        !self.stale.is_empty()
            || !self.leak_suspects.is_empty()
            || !self.dangling.is_empty()
            || !self.over_limit.is_empty()
    }
}

/// Subscription leak detector
pub struct MemoryGuard {
    config: GuardConfig,
    tracker: Arc<SubscriptionTracker>,
    bus: EventBus,
    scheduler: Arc<dyn Scheduler>,
    poll_task: Mutex<Option<TimerHandle>>,
    last_report: Mutex<GuardReport>,
}

impl MemoryGuard {
    /// Create a guard over the given tracker and bus
    pub fn new(
        config: GuardConfig,
        tracker: Arc<SubscriptionTracker>,
        bus: EventBus,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            tracker,
            bus,
            scheduler,
            poll_task: Mutex::new(None),
            last_report: Mutex::new(GuardReport::default()),
        })
    }

    /// Start the periodic sweep loop
    pub fn start(self: &Arc<Self>) {
        let guard = Arc::downgrade(self);
        let scheduler = Arc::clone(&self.scheduler);
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let task = TimerHandle::new(tokio::spawn(async move {
            loop {
                scheduler.sleep(interval).await;
                match guard.upgrade() {
                    Some(guard) => {
                        guard.sweep();
                    }
                    None => break,
                }
            }
        }));
        if let Some(previous) = self.poll_task.lock().expect("guard lock").replace(task) {
            previous.cancel();
        }
        info!(
            interval_secs = self.config.poll_interval_secs,
            auto_remediate = self.config.auto_remediate,
            "Memory guard started"
        );
    }

    /// Stop the sweep loop
    pub fn stop(&self) {
        if let Some(task) = self.poll_task.lock().expect("guard lock").take() {
            task.cancel();
        }
    }

    /// Most recent sweep outcome
    pub fn last_report(&self) -> GuardReport {
        self.last_report.lock().expect("guard lock").clone()
    }

    /// Run one sweep now and return its findings
    pub fn sweep(&self) -> GuardReport {
        self.sweep_with(self.config.auto_remediate)
    }

    /// Sweep and force-unsubscribe every finding, regardless of the
    /// configured remediation mode
    ///
    /// Used by the supervisor's leak-recovery strategy.
    pub fn remediate_now(&self) -> GuardReport {
        self.sweep_with(true)
    }

    fn sweep_with(&self, remediate: bool) -> GuardReport {
        let now = self.scheduler.now();
        let stale_age = Duration::from_secs(self.config.max_stale_listener_age_secs);
        let suspect_age = stale_age * 2;
        let components = Arc::clone(self.tracker.components());

        let mut report = GuardReport {
            total: self.tracker.len(),
            ..Default::default()
        };
        let mut per_pattern: HashMap<String, usize> = HashMap::new();
        let mut to_remediate: Vec<SubscriptionId> = Vec::new();
        let mut to_purge: Vec<SubscriptionId> = Vec::new();

        self.tracker.for_each(|id, tracked| {
            if !tracked.is_active() {
                // Deactivated entries kept for stats are purged once stale
                if tracked.idle(now) >= stale_age {
                    to_purge.push(id);
                }
                return;
            }
            *per_pattern.entry(tracked.pattern.clone()).or_default() += 1;

            if let Some(owner) = tracked.owner.as_deref() {
                if !components.is_live(owner, tracked.owner_generation) {
                    report.dangling.push(id.to_string());
                    warn!(
                        subscription = %id,
                        pattern = tracked.pattern.as_str(),
                        owner = owner,
                        "Dangling subscription: owning component is gone"
                    );
                    if remediate {
                        to_remediate.push(id);
                    }
                    return;
                }
            }

            if tracked.call_count() == 0 && tracked.age(now) >= suspect_age {
                report.leak_suspects.push(id.to_string());
                log_leak_suspect(
                    &id.to_string(),
                    &tracked.pattern,
                    tracked.age(now).as_secs(),
                    remediate,
                );
                if remediate {
                    to_remediate.push(id);
                }
            } else if tracked.idle(now) >= stale_age {
                report.stale.push(id.to_string());
                debug!(
                    subscription = %id,
                    pattern = tracked.pattern.as_str(),
                    idle_secs = tracked.idle(now).as_secs(),
                    "Stale listener"
                );
            }
        });

        for (pattern, count) in per_pattern {
            if count > self.config.max_event_listeners_per_type {
                warn!(
                    pattern = pattern.as_str(),
                    count = count,
                    limit = self.config.max_event_listeners_per_type,
                    "Listener count exceeds the per-event warning bar"
                );
                report.over_limit.push((pattern, count));
            }
        }

        for id in to_remediate {
            if self.tracker.force_unsubscribe(id) {
                report.remediated += 1;
            }
            self.bus.remove_listener(id);
        }
        for id in to_purge {
            self.bus.remove_listener(id);
        }

        if report.has_findings() {
            self.bus.emit(
                LEAK_REPORT,
                json!({
                    "total": report.total,
                    "stale": report.stale.len(),
                    "leak_suspects": report.leak_suspects.len(),
                    "dangling": report.dangling.len(),
                    "over_limit": report.over_limit,
                    "remediated": report.remediated,
                }),
            );
        }

        *self.last_report.lock().expect("guard lock") = report.clone();
        report
    }
}

impl std::fmt::Debug for MemoryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGuard")
            .field("tracked", &self.tracker.len())
            .field("auto_remediate", &self.config.auto_remediate)
            .finish()
    }
}
