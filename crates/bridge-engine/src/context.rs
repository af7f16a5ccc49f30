//! Bridge assembly
//!
//! [`BridgeContext`] wires the four components against two state trees
//! and owns their lifecycles. Construction is explicit: trees come
//! from the host, collaborators default to the in-process adapters
//! unless the builder is given replacements.
//!
//! Startup order is bus, synchronizer, guard, supervisor; shutdown is
//! the reverse.

use crate::adapters::{StatusChannel, TokioScheduler};
use crate::bus::EventBus;
use crate::config::BridgeConfig;
use crate::guard::MemoryGuard;
use crate::supervisor::Supervisor;
use crate::sync::StateSynchronizer;
use crate::tracker::SubscriptionTracker;
use bridge_domain::error::Error;
use bridge_domain::health::{HealthCheckSpec, RecoveryStrategySpec};
use bridge_domain::ports::supervisor::{FnProbe, FnRecovery};
use bridge_domain::ports::{Scheduler, StateTree, StatusSink};
use bridge_domain::status::BridgeStatus;
use bridge_domain::update::Origin;
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Batch backlog at which the bus is considered unhealthy
const MAX_HEALTHY_PENDING_DEPTH: usize = 10_000;

/// Builder for [`BridgeContext`]
pub struct BridgeBuilder {
    config: BridgeConfig,
    tree_a: Arc<dyn StateTree>,
    tree_b: Arc<dyn StateTree>,
    scheduler: Option<Arc<dyn Scheduler>>,
    status: Option<Arc<dyn StatusSink>>,
    builtin_supervision: bool,
}

impl BridgeBuilder {
    /// Start building a bridge over two trees
    pub fn new(config: BridgeConfig, tree_a: Arc<dyn StateTree>, tree_b: Arc<dyn StateTree>) -> Self {
        Self {
            config,
            tree_a,
            tree_b,
            scheduler: None,
            status: None,
            builtin_supervision: true,
        }
    }

    /// Replace the default tokio scheduler
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Replace the default status collaborator
    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    /// Skip registering the built-in checks and strategies
    pub fn without_builtin_supervision(mut self) -> Self {
        self.builtin_supervision = false;
        self
    }

    /// Assemble the components
    pub fn build(self) -> BridgeContext {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new()));
        let status = self
            .status
            .unwrap_or_else(|| StatusChannel::new_shared() as Arc<dyn StatusSink>);

        let tracker = SubscriptionTracker::new_shared(Arc::clone(&scheduler));
        let bus = EventBus::new(
            self.config.bus.clone(),
            Arc::clone(&scheduler),
            Arc::clone(&tracker),
        );
        let synchronizer = StateSynchronizer::new(
            self.config.sync.clone(),
            Arc::clone(&self.tree_a),
            Arc::clone(&self.tree_b),
            bus.clone(),
            Arc::clone(&scheduler),
            Arc::clone(&status),
        );
        let guard = MemoryGuard::new(
            self.config.guard.clone(),
            Arc::clone(&tracker),
            bus.clone(),
            Arc::clone(&scheduler),
        );
        let supervisor = Supervisor::new(
            self.config.supervisor.clone(),
            bus.clone(),
            Arc::clone(&scheduler),
            Arc::clone(&status),
        );

        let context = BridgeContext {
            config: self.config,
            tracker,
            bus,
            synchronizer,
            guard,
            supervisor,
            status,
            scheduler,
        };
        if self.builtin_supervision {
            context.register_builtin_supervision();
        }
        context
    }
}

/// Assembled bridge: both trees, all four components, shared collaborators
pub struct BridgeContext {
    config: BridgeConfig,
    tracker: Arc<SubscriptionTracker>,
    bus: EventBus,
    synchronizer: StateSynchronizer,
    guard: Arc<MemoryGuard>,
    supervisor: Supervisor,
    status: Arc<dyn StatusSink>,
    scheduler: Arc<dyn Scheduler>,
}

impl BridgeContext {
    /// Builder over two trees with default collaborators
    pub fn builder(
        config: BridgeConfig,
        tree_a: Arc<dyn StateTree>,
        tree_b: Arc<dyn StateTree>,
    ) -> BridgeBuilder {
        BridgeBuilder::new(config, tree_a, tree_b)
    }

    /// Start every component
    pub fn start(&self) {
        self.bus
            .start_sweeping(Duration::from_secs(self.config.bus.sweep_interval_secs));
        self.synchronizer.start();
        self.guard.start();
        self.supervisor.start();
        info!("Bridge started");
    }

    /// Stop every component in reverse startup order
    pub fn shutdown(&self) {
        self.supervisor.stop();
        self.guard.stop();
        self.synchronizer.shutdown();
        self.bus.shutdown();
        info!("Bridge stopped");
    }

    /// Event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// State synchronizer
    pub fn synchronizer(&self) -> &StateSynchronizer {
        &self.synchronizer
    }

    /// Memory guard
    pub fn guard(&self) -> &Arc<MemoryGuard> {
        &self.guard
    }

    /// Supervisor
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Subscription tracker shared by bus and guard
    pub fn tracker(&self) -> &Arc<SubscriptionTracker> {
        &self.tracker
    }

    /// Shared scheduler
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Current bridge status snapshot
    pub fn status(&self) -> BridgeStatus {
        self.status.get_status()
    }

    /// Status collaborator
    pub fn status_sink(&self) -> &Arc<dyn StatusSink> {
        &self.status
    }

    /// Effective configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Register the built-in checks and their recovery strategies
    ///
    /// | Check            | Fails when                             | Strategy        |
    /// |------------------|----------------------------------------|-----------------|
    /// | `bus-backlog`    | batch backlog exceeds the healthy bar  | `flush-bus`     |
    /// | `sync-errors`    | apply errors grew since the last pass  | `resync-trees`  |
    /// | `guard-leaks`    | last sweep flagged leak suspects       | `purge-leaks`   |
    fn register_builtin_supervision(&self) {
        let bus = self.bus.clone();
        self.supervisor.register_check(
            HealthCheckSpec::new("bus-backlog", "event-bus").critical(),
            Arc::new(FnProbe::new(move || {
                let depth = bus.pending_depth();
                async move { Ok(depth < MAX_HEALTHY_PENDING_DEPTH) }.boxed()
            })),
        );
        let bus = self.bus.clone();
        self.supervisor.register_strategy(
            RecoveryStrategySpec::new("flush-bus", "event-bus")
                .requires_checks(vec!["bus-backlog"]),
            Arc::new(FnRecovery::new(move || {
                bus.flush_all();
                async move { Ok(()) }.boxed()
            })),
        );

        let synchronizer = self.synchronizer.clone();
        let seen_errors = Arc::new(AtomicU64::new(0));
        self.supervisor.register_check(
            HealthCheckSpec::new("sync-errors", "synchronizer").with_weight(2),
            Arc::new(FnProbe::new(move || {
                let errors = synchronizer.stats().errors;
                let previous = seen_errors.swap(errors, Ordering::Relaxed);
                async move { Ok(errors <= previous) }.boxed()
            })),
        );
        let synchronizer = self.synchronizer.clone();
        self.supervisor.register_strategy(
            // Strategies execute after the bus is drained so the resync
            // is not racing queued application events
            RecoveryStrategySpec::new("resync-trees", "synchronizer")
                .requires_checks(vec!["sync-errors"])
                .depends_on(vec!["flush-bus"]),
            Arc::new(FnRecovery::new(move || {
                let result = synchronizer
                    .force_full_resync(Origin::TreeA)
                    .map_err(|err| Error::recovery("resync-trees", err.to_string()));
                async move { result }.boxed()
            })),
        );

        let guard = Arc::clone(&self.guard);
        self.supervisor.register_check(
            HealthCheckSpec::new("guard-leaks", "memory-guard"),
            Arc::new(FnProbe::new(move || {
                let clean = guard.last_report().leak_suspects.is_empty();
                async move { Ok(clean) }.boxed()
            })),
        );
        let guard = Arc::clone(&self.guard);
        self.supervisor.register_strategy(
            RecoveryStrategySpec::new("purge-leaks", "memory-guard")
                .requires_checks(vec!["guard-leaks"]),
            Arc::new(FnRecovery::new(move || {
                // Detaches suspects even when the guard runs in
                // observe-only mode
                guard.remediate_now();
                async move { Ok(()) }.boxed()
            })),
        );
    }
}

impl std::fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("bus", &self.bus)
            .field("synchronizer", &self.synchronizer)
            .field("supervisor", &self.supervisor)
            .finish()
    }
}
