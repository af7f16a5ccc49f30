//! Self-healing supervisor
//!
//! Periodic health passes over registered checks; on failure, a
//! bounded recovery loop: select strategies for the failing checks,
//! execute them in dependency order, wait, verify, back off, repeat.
//! Exhausting the attempt budget escalates to critical failure and
//! stops automatic recovery until health is observed again.
//!
//! ## One recovery attempt
//!
//! ```text
//! health pass ──fail──► select strategies (failed checks/components,
//!                       per-strategy budget)
//!        │                 └─► dependency layers, sequential or parallel
//!        │                        └─► verify delay ─► health pass
//!        │                               ├─ healthy: reset, done
//!        └─◄── backoff ◄─────────────────┘  unhealthy
//! ```

mod topo;

use crate::bus::EventBus;
use crate::config::SupervisorConfig;
use crate::logging::{log_health_check, log_recovery_outcome};
use crate::sched::TimerHandle;
use bridge_domain::error::{Error, Result};
use bridge_domain::events::RECOVERY_CYCLE;
use bridge_domain::health::{
    CheckResult, HealthCheckSpec, HealthReport, RecoveryPhase, RecoveryStrategySpec,
};
use bridge_domain::ports::status::StatusListenerGuard;
use bridge_domain::ports::{HealthProbe, RecoveryAction, Scheduler, StatusSink};
use bridge_domain::status::{BridgeState, StatusUpdate};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{info, warn};

struct RegisteredCheck {
    spec: HealthCheckSpec,
    probe: Arc<dyn HealthProbe>,
}

struct RegisteredStrategy {
    spec: RecoveryStrategySpec,
    action: Arc<dyn RecoveryAction>,
}

struct SupervisorInner {
    config: SupervisorConfig,
    scheduler: Arc<dyn Scheduler>,
    status: Arc<dyn StatusSink>,
    bus: EventBus,
    checks: Mutex<Vec<RegisteredCheck>>,
    strategies: Mutex<Vec<RegisteredStrategy>>,
    strategy_attempts: DashMap<String, u32>,
    recovery_attempts: AtomicU32,
    escalated: AtomicBool,
    cycle_running: AtomicBool,
    phase: Mutex<RecoveryPhase>,
    last_report: Mutex<Option<HealthReport>>,
    loop_task: Mutex<Option<TimerHandle>>,
    status_guard: Mutex<Option<StatusListenerGuard>>,
}

/// Health monitoring and bounded automatic recovery
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

impl Supervisor {
    /// Create a supervisor; register checks and strategies, then
    /// [`start`](Self::start)
    pub fn new(
        config: SupervisorConfig,
        bus: EventBus,
        scheduler: Arc<dyn Scheduler>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                config,
                scheduler,
                status,
                bus,
                checks: Mutex::new(Vec::new()),
                strategies: Mutex::new(Vec::new()),
                strategy_attempts: DashMap::new(),
                recovery_attempts: AtomicU32::new(0),
                escalated: AtomicBool::new(false),
                cycle_running: AtomicBool::new(false),
                phase: Mutex::new(RecoveryPhase::Idle),
                last_report: Mutex::new(None),
                loop_task: Mutex::new(None),
                status_guard: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a health check
    pub fn register_check(&self, spec: HealthCheckSpec, probe: Arc<dyn HealthProbe>) {
        self.inner
            .checks
            .lock()
            .expect("supervisor lock")
            .push(RegisteredCheck { spec, probe });
    }

    /// Register a recovery strategy
    pub fn register_strategy(&self, spec: RecoveryStrategySpec, action: Arc<dyn RecoveryAction>) {
        self.inner
            .strategies
            .lock()
            .expect("supervisor lock")
            .push(RegisteredStrategy { spec, action });
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start the periodic health pass loop
    pub fn start(&self) {
        // An externally observed healthy status re-arms recovery after
        // an escalation and clears the attempt counters
        let weak = Arc::downgrade(&self.inner);
        let guard = self.inner.status.on_status_changed(Arc::new(move |status| {
            if status.state.is_healthy() {
                if let Some(inner) = weak.upgrade() {
                    inner.recovery_attempts.store(0, Ordering::Relaxed);
                    inner.strategy_attempts.clear();
                    inner.escalated.store(false, Ordering::Relaxed);
                }
            }
        }));
        *self.inner.status_guard.lock().expect("supervisor lock") = Some(guard);

        let weak = Arc::downgrade(&self.inner);
        let scheduler = Arc::clone(&self.inner.scheduler);
        let interval = Duration::from_secs(self.inner.config.check_interval_secs);
        let task = TimerHandle::new(tokio::spawn(async move {
            loop {
                scheduler.sleep(interval).await;
                match weak.upgrade() {
                    Some(inner) => Supervisor { inner }.run_cycle().await,
                    None => break,
                }
            }
        }));
        if let Some(previous) = self
            .inner
            .loop_task
            .lock()
            .expect("supervisor lock")
            .replace(task)
        {
            previous.cancel();
        }
        info!(
            interval_secs = self.inner.config.check_interval_secs,
            "Supervisor started"
        );
    }

    /// Stop the health pass loop
    pub fn stop(&self) {
        if let Some(task) = self.inner.loop_task.lock().expect("supervisor lock").take() {
            task.cancel();
        }
        self.inner
            .status_guard
            .lock()
            .expect("supervisor lock")
            .take();
    }

    /// Current cycle phase
    pub fn phase(&self) -> RecoveryPhase {
        *self.inner.phase.lock().expect("supervisor lock")
    }

    /// Recovery attempts taken since the last healthy observation
    pub fn attempts(&self) -> u32 {
        self.inner.recovery_attempts.load(Ordering::Relaxed)
    }

    /// Report of the most recent health pass, if any
    pub fn last_report(&self) -> Option<HealthReport> {
        self.inner.last_report.lock().expect("supervisor lock").clone()
    }

    fn set_phase(&self, phase: RecoveryPhase) {
        *self.inner.phase.lock().expect("supervisor lock") = phase;
    }

    // ------------------------------------------------------------------
    // Health pass
    // ------------------------------------------------------------------

    /// Run every registered check once
    pub async fn run_health_pass(&self) -> HealthReport {
        let checks: Vec<(HealthCheckSpec, Arc<dyn HealthProbe>)> = {
            let registered = self.inner.checks.lock().expect("supervisor lock");
            registered
                .iter()
                .map(|c| (c.spec.clone(), Arc::clone(&c.probe)))
                .collect()
        };

        let mut results = Vec::with_capacity(checks.len());
        let mut passed_weight = 0u32;
        let mut total_weight = 0u32;
        let mut critical_failed = false;
        let mut failed_checks = Vec::new();
        let mut failed_components = Vec::new();

        for (spec, probe) in checks {
            let outcome = probe.check().await;
            let passed = matches!(outcome, Ok(true));
            let error = match outcome {
                Ok(_) => None,
                Err(err) => Some(err.to_string()),
            };
            log_health_check(&spec.id, &spec.component, passed, error.as_deref());

            total_weight += spec.weight;
            if passed {
                passed_weight += spec.weight;
            } else {
                critical_failed |= spec.critical;
                failed_checks.push(spec.id.clone());
                if !failed_components.contains(&spec.component) {
                    failed_components.push(spec.component.clone());
                }
            }
            results.push(CheckResult {
                id: spec.id,
                passed,
                error,
                checked_at: Utc::now(),
            });
        }

        let health_percent = if total_weight == 0 {
            100
        } else {
            passed_weight * 100 / total_weight
        };
        let report = HealthReport {
            health_percent,
            critical_failed,
            failed_checks,
            failed_components,
            results,
        };
        *self.inner.last_report.lock().expect("supervisor lock") = Some(report.clone());
        report
    }

    // ------------------------------------------------------------------
    // Recovery cycle
    // ------------------------------------------------------------------

    /// Run one full check-and-heal cycle
    ///
    /// Re-entrant calls while a cycle is in flight are ignored.
    pub async fn run_cycle(&self) {
        if self.inner.cycle_running.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cycle_inner().await;
        self.inner.cycle_running.store(false, Ordering::Release);
    }

    async fn cycle_inner(&self) {
        self.set_phase(RecoveryPhase::Checking);
        let mut report = self.run_health_pass().await;

        if report.is_healthy() {
            self.mark_healthy();
            return;
        }
        if self.inner.escalated.load(Ordering::Relaxed) {
            // Stay escalated until something reports healthy
            self.set_phase(RecoveryPhase::Idle);
            return;
        }

        loop {
            let attempt = self.inner.recovery_attempts.fetch_add(1, Ordering::Relaxed) + 1;
            if attempt > self.inner.config.max_recovery_attempts {
                self.escalate(&report, attempt - 1);
                return;
            }

            self.set_phase(RecoveryPhase::Recovering);
            self.inner.status.update_status(
                StatusUpdate::state(if report.critical_failed {
                    BridgeState::CriticalFailure
                } else {
                    BridgeState::DegradedPerformance
                })
                .with_message(format!(
                    "Recovery attempt {attempt}: {} check(s) failing",
                    report.failed_checks.len()
                ))
                .with_affected(report.failed_components.clone())
                .with_attempts(attempt),
            );

            let executed = self.execute_strategies(&report).await;

            self.inner
                .scheduler
                .sleep(Duration::from_millis(self.inner.config.verify_delay_ms))
                .await;
            self.set_phase(RecoveryPhase::Checking);
            let verify = self.run_health_pass().await;
            let healthy = verify.is_healthy();

            self.inner.bus.emit(
                RECOVERY_CYCLE,
                json!({
                    "attempt": attempt,
                    "executed": executed,
                    "healthy": healthy,
                    "health_percent": verify.health_percent,
                    "failed_checks": verify.failed_checks,
                }),
            );

            if healthy {
                self.mark_healthy();
                return;
            }
            report = verify;
            self.inner.scheduler.sleep(self.backoff_delay(attempt)).await;
        }
    }

    fn mark_healthy(&self) {
        self.set_phase(RecoveryPhase::Healthy);
        self.inner.recovery_attempts.store(0, Ordering::Relaxed);
        self.inner.strategy_attempts.clear();
        self.inner.escalated.store(false, Ordering::Relaxed);
        self.inner.status.update_status(
            StatusUpdate::state(BridgeState::Healthy)
                .with_message("All health checks passing".to_string())
                .with_affected(Vec::new())
                .with_attempts(0),
        );
    }

    fn escalate(&self, report: &HealthReport, attempts: u32) {
        self.inner.escalated.store(true, Ordering::Relaxed);
        self.set_phase(RecoveryPhase::Idle);
        warn!(
            attempts = attempts,
            failed = ?report.failed_checks,
            "Recovery budget exhausted, escalating to critical failure"
        );
        self.inner.status.update_status(
            StatusUpdate::state(BridgeState::CriticalFailure)
                .with_message(format!(
                    "Automatic recovery exhausted after {attempts} attempt(s)"
                ))
                .with_affected(report.failed_components.clone())
                .with_attempts(attempts),
        );
        self.inner.bus.emit(
            RECOVERY_CYCLE,
            json!({
                "attempt": attempts,
                "escalated": true,
                "failed_checks": report.failed_checks,
            }),
        );
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.inner.config.backoff_base_ms;
        let ms = if self.inner.config.progressive_backoff {
            let shift = attempt.saturating_sub(1).min(20);
            base.saturating_mul(1u64 << shift)
                .min(self.inner.config.backoff_cap_ms)
        } else {
            base
        };
        Duration::from_millis(ms)
    }

    // ------------------------------------------------------------------
    // Strategy selection and execution
    // ------------------------------------------------------------------

    /// Strategies applicable to a report, ordered into dependency layers
    fn select_strategies(
        &self,
        report: &HealthReport,
    ) -> Vec<Vec<(RecoveryStrategySpec, Arc<dyn RecoveryAction>)>> {
        let selected: Vec<(RecoveryStrategySpec, Arc<dyn RecoveryAction>)> = {
            let strategies = self.inner.strategies.lock().expect("supervisor lock");
            let budget_left = |spec: &RecoveryStrategySpec| {
                let used = self
                    .inner
                    .strategy_attempts
                    .get(&spec.id)
                    .map(|a| *a)
                    .unwrap_or(0);
                if used >= self.inner.config.max_attempts_per_strategy {
                    warn!(
                        strategy = spec.id.as_str(),
                        attempts = used,
                        "Strategy attempt budget spent, skipping"
                    );
                    return false;
                }
                true
            };

            let mut matched: Vec<(RecoveryStrategySpec, Arc<dyn RecoveryAction>)> = strategies
                .iter()
                .filter(|s| {
                    let component_match =
                        report.failed_components.contains(&s.spec.component);
                    let check_match = s
                        .spec
                        .required_health_checks
                        .iter()
                        .any(|check| report.failed_checks.contains(check));
                    (component_match || check_match) && budget_left(&s.spec)
                })
                .map(|s| (s.spec.clone(), Arc::clone(&s.action)))
                .collect();

            if matched.is_empty() {
                // Nothing targets the failure; fall back to strategies
                // that declare no specific requirement
                matched = strategies
                    .iter()
                    .filter(|s| {
                        s.spec.required_health_checks.is_empty() && budget_left(&s.spec)
                    })
                    .map(|s| (s.spec.clone(), Arc::clone(&s.action)))
                    .collect();
            }
            matched
        };

        let keyed: Vec<(String, Vec<String>)> = selected
            .iter()
            .map(|(spec, _)| (spec.id.clone(), spec.dependencies.clone()))
            .collect();
        let layers = topo::order_layers(&keyed);

        let mut slots: Vec<Option<(RecoveryStrategySpec, Arc<dyn RecoveryAction>)>> =
            selected.into_iter().map(Some).collect();
        layers
            .into_iter()
            .map(|layer| {
                let mut resolved: Vec<_> = layer
                    .into_iter()
                    .filter_map(|i| slots[i].take())
                    .collect();
                // Critical strategies run first within a layer
                resolved.sort_by_key(|(spec, _)| (!spec.critical, spec.id.clone()));
                resolved
            })
            .collect()
    }

    /// Execute the selected strategies; returns the ids that ran
    async fn execute_strategies(&self, report: &HealthReport) -> Vec<String> {
        let layers = self.select_strategies(report);
        if layers.iter().all(|l| l.is_empty()) {
            warn!(
                failed = ?report.failed_checks,
                "No applicable recovery strategy for failing checks"
            );
            return Vec::new();
        }

        let mut executed = Vec::new();
        'layers: for layer in layers {
            if self.inner.config.parallel_recovery {
                let futures: Vec<_> = layer
                    .iter()
                    .map(|(spec, action)| self.execute_one(spec, Arc::clone(action)))
                    .collect();
                let outcomes = futures::future::join_all(futures).await;
                for ((spec, _), outcome) in layer.iter().zip(outcomes) {
                    executed.push(spec.id.clone());
                    if outcome.is_err()
                        && spec.critical
                        && self.inner.config.abort_on_critical_failure
                    {
                        break 'layers;
                    }
                }
            } else {
                for (spec, action) in layer {
                    let outcome = self.execute_one(&spec, action).await;
                    executed.push(spec.id.clone());
                    if outcome.is_err()
                        && spec.critical
                        && self.inner.config.abort_on_critical_failure
                    {
                        break 'layers;
                    }
                }
            }
        }
        executed
    }

    /// Run one strategy under its cooperative timeout
    async fn execute_one(
        &self,
        spec: &RecoveryStrategySpec,
        action: Arc<dyn RecoveryAction>,
    ) -> Result<()> {
        let attempt = {
            let mut entry = self
                .inner
                .strategy_attempts
                .entry(spec.id.clone())
                .or_insert(0);
            *entry += 1;
            *entry
        };
        let timeout_ms = spec
            .timeout_ms
            .unwrap_or(self.inner.config.strategy_timeout_ms);

        let outcome = tokio::select! {
            result = action.execute() => result,
            () = self.inner.scheduler.sleep(Duration::from_millis(timeout_ms)) => {
                Err(Error::Timeout {
                    operation: format!("recovery strategy '{}'", spec.id),
                    ms: timeout_ms,
                })
            }
        };

        match &outcome {
            Ok(()) => log_recovery_outcome(&spec.id, attempt, true, None),
            Err(err) => log_recovery_outcome(&spec.id, attempt, false, Some(&err.to_string())),
        }
        outcome
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("phase", &self.phase())
            .field("attempts", &self.attempts())
            .finish()
    }
}
