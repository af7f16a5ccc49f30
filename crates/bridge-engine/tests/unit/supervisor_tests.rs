//! Unit tests for the self-healing supervisor
//!
//! Probes and strategies are closures over shared atomics so each test
//! can script a failure and observe the recovery loop under paused
//! tokio time.

use bridge_engine::adapters::{StatusChannel, TokioScheduler};
use bridge_engine::bus::EventBus;
use bridge_engine::config::{EventBusConfig, SupervisorConfig};
use bridge_engine::domain::health::{HealthCheckSpec, RecoveryPhase, RecoveryStrategySpec};
use bridge_engine::domain::ports::supervisor::{FnProbe, FnRecovery};
use bridge_engine::domain::ports::StatusSink;
use bridge_engine::domain::status::BridgeState;
use bridge_engine::domain::Error;
use bridge_engine::supervisor::Supervisor;
use bridge_engine::tracker::SubscriptionTracker;
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Fixture {
    supervisor: Supervisor,
    status: Arc<StatusChannel>,
}

fn fixture(config: SupervisorConfig) -> Fixture {
    let scheduler = Arc::new(TokioScheduler::new());
    let tracker = SubscriptionTracker::new_shared(scheduler.clone());
    let bus = EventBus::new(EventBusConfig::default(), scheduler.clone(), tracker);
    let status = StatusChannel::new_shared();
    let supervisor = Supervisor::new(
        config,
        bus,
        scheduler,
        status.clone() as Arc<dyn StatusSink>,
    );
    Fixture { supervisor, status }
}

fn flag_probe(flag: &Arc<AtomicBool>) -> Arc<FnProbe> {
    let flag = Arc::clone(flag);
    Arc::new(FnProbe::new(move || {
        let healthy = flag.load(Ordering::SeqCst);
        async move { Ok(healthy) }.boxed()
    }))
}

// =============================================================================
// Health pass
// =============================================================================

/// Test the weighted health percentage
#[tokio::test(start_paused = true)]
async fn test_health_pass_weighted_percent() {
    let f = fixture(SupervisorConfig::default());
    let healthy = Arc::new(AtomicBool::new(true));
    let failing = Arc::new(AtomicBool::new(false));
    f.supervisor.register_check(
        HealthCheckSpec::new("good", "bus").with_weight(3),
        flag_probe(&healthy),
    );
    f.supervisor
        .register_check(HealthCheckSpec::new("bad", "sync"), flag_probe(&failing));

    let report = f.supervisor.run_health_pass().await;
    assert_eq!(report.health_percent, 75);
    assert_eq!(report.failed_checks, vec!["bad"]);
    assert_eq!(report.failed_components, vec!["sync"]);
    assert!(!report.critical_failed);
}

/// Test that an erroring probe counts as failing
#[tokio::test(start_paused = true)]
async fn test_erroring_probe_fails() {
    let f = fixture(SupervisorConfig::default());
    f.supervisor.register_check(
        HealthCheckSpec::new("broken", "bus").critical(),
        Arc::new(FnProbe::new(|| {
            async { Err(Error::invalid_argument("probe exploded")) }.boxed()
        })),
    );

    let report = f.supervisor.run_health_pass().await;
    assert!(report.critical_failed);
    assert_eq!(report.health_percent, 0);
    assert!(report.results[0].error.is_some());
}

/// Test that a healthy pass marks the healthy phase
#[tokio::test(start_paused = true)]
async fn test_healthy_cycle() {
    let f = fixture(SupervisorConfig::default());
    let healthy = Arc::new(AtomicBool::new(true));
    f.supervisor
        .register_check(HealthCheckSpec::new("ok", "bus"), flag_probe(&healthy));

    f.supervisor.run_cycle().await;
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
    assert_eq!(f.supervisor.attempts(), 0);
    assert!(f.status.get_status().state.is_healthy());
}

// =============================================================================
// Recovery
// =============================================================================

/// Test that a failing check triggers its strategy and the bridge heals
#[tokio::test(start_paused = true)]
async fn test_recovery_heals_failing_check() {
    let f = fixture(SupervisorConfig::default());
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));

    let repaired = Arc::clone(&healthy);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("reconnect-store", "store").requires_checks(vec!["store"]),
        Arc::new(FnRecovery::new(move || {
            repaired.store(true, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
    assert_eq!(f.supervisor.attempts(), 0);
    assert!(f.status.get_status().state.is_healthy());
}

/// Test that dependencies execute before their dependents
#[tokio::test(start_paused = true)]
async fn test_dependency_order() {
    let f = fixture(SupervisorConfig::default());
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    // "a-top" sorts before "z-base" but depends on it
    let log = Arc::clone(&order);
    let repaired = Arc::clone(&healthy);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("a-top", "store")
            .requires_checks(vec!["store"])
            .depends_on(vec!["z-base"]),
        Arc::new(FnRecovery::new(move || {
            log.lock().unwrap().push("a-top");
            repaired.store(true, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );
    let log = Arc::clone(&order);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("z-base", "store").requires_checks(vec!["store"]),
        Arc::new(FnRecovery::new(move || {
            log.lock().unwrap().push("z-base");
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(*order.lock().unwrap(), vec!["z-base", "a-top"]);
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
}

/// Test that component match selects a strategy whose checks differ
#[tokio::test(start_paused = true)]
async fn test_component_match_selects_strategy() {
    let f = fixture(SupervisorConfig::default());
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));

    // Requires a check that is not failing, but targets the failing
    // component; the component match alone selects it
    let repaired = Arc::clone(&healthy);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("reconnect-store", "store")
            .requires_checks(vec!["disk-free"]),
        Arc::new(FnRecovery::new(move || {
            repaired.store(true, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
}

/// Test that an unconstrained strategy runs when nothing targets the failure
#[tokio::test(start_paused = true)]
async fn test_fallback_to_unconstrained_strategy() {
    let f = fixture(SupervisorConfig::default());
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));

    // Targets a component and check that are both fine
    let targeted = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&targeted);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("flush-bus", "bus").requires_checks(vec!["bus-alive"]),
        Arc::new(FnRecovery::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );
    // Declares no requirement at all; the fallback pass picks it up
    let repaired = Arc::clone(&healthy);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("restart-all", "bridge"),
        Arc::new(FnRecovery::new(move || {
            repaired.store(true, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
    assert_eq!(targeted.load(Ordering::SeqCst), 0);
}

/// Test that a hung strategy is timed out and the cycle continues
#[tokio::test(start_paused = true)]
async fn test_strategy_timeout_is_contained() {
    let f = fixture(SupervisorConfig::default());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    // Fails the first pass, heals on the verification pass
    f.supervisor.register_check(
        HealthCheckSpec::new("store", "store"),
        Arc::new(FnProbe::new(move || {
            let pass = counter.fetch_add(1, Ordering::SeqCst) > 0;
            async move { Ok(pass) }.boxed()
        })),
    );
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("hung", "store")
            .requires_checks(vec!["store"])
            .with_timeout_ms(100),
        Arc::new(FnRecovery::new(|| futures::future::pending().boxed())),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
}

/// Test that parallel execution still waits out the dependency layer
#[tokio::test(start_paused = true)]
async fn test_parallel_recovery_respects_layers() {
    let config = SupervisorConfig {
        parallel_recovery: true,
        ..SupervisorConfig::default()
    };
    let f = fixture(config);
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    // The base strategy finishes slowly; its dependent must not start
    // until the whole layer completes
    let log = Arc::clone(&order);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("z-base", "store").requires_checks(vec!["store"]),
        Arc::new(FnRecovery::new(move || {
            let log = Arc::clone(&log);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                log.lock().unwrap().push("z-base");
                Ok(())
            }
            .boxed()
        })),
    );
    let log = Arc::clone(&order);
    let repaired = Arc::clone(&healthy);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("a-top", "store")
            .requires_checks(vec!["store"])
            .depends_on(vec!["z-base"]),
        Arc::new(FnRecovery::new(move || {
            log.lock().unwrap().push("a-top");
            repaired.store(true, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(*order.lock().unwrap(), vec!["z-base", "a-top"]);
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Healthy);
}

/// Test that exhausting the attempt budget escalates to critical failure
#[tokio::test(start_paused = true)]
async fn test_escalation_after_exhausted_attempts() {
    let config = SupervisorConfig {
        max_recovery_attempts: 2,
        ..SupervisorConfig::default()
    };
    let f = fixture(config);
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("useless", "store").requires_checks(vec!["store"]),
        Arc::new(FnRecovery::new(|| {
            async { Err(Error::recovery("useless", "still broken")) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(f.status.get_status().state, BridgeState::CriticalFailure);
    assert_eq!(f.supervisor.phase(), RecoveryPhase::Idle);
}

/// Test that recovery stays halted after escalation until health returns
#[tokio::test(start_paused = true)]
async fn test_no_recovery_after_escalation() {
    let config = SupervisorConfig {
        max_recovery_attempts: 1,
        ..SupervisorConfig::default()
    };
    let f = fixture(config);
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));
    let executions = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&executions);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("useless", "store").requires_checks(vec!["store"]),
        Arc::new(FnRecovery::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    let after_escalation = executions.load(Ordering::SeqCst);
    f.supervisor.run_cycle().await;
    assert_eq!(executions.load(Ordering::SeqCst), after_escalation);

    // An externally observed healthy status re-arms recovery
    f.supervisor.start();
    f.status.update_status(
        bridge_engine::domain::status::StatusUpdate::state(BridgeState::Healthy),
    );
    assert_eq!(f.supervisor.attempts(), 0);
    f.supervisor.stop();
}

/// Test that a single strategy stops being selected once its budget is spent
#[tokio::test(start_paused = true)]
async fn test_per_strategy_attempt_budget() {
    let config = SupervisorConfig {
        max_recovery_attempts: 5,
        max_attempts_per_strategy: 2,
        ..SupervisorConfig::default()
    };
    let f = fixture(config);
    let healthy = Arc::new(AtomicBool::new(false));
    f.supervisor
        .register_check(HealthCheckSpec::new("store", "store"), flag_probe(&healthy));
    let executions = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&executions);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("limited", "store").requires_checks(vec!["store"]),
        Arc::new(FnRecovery::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(executions.load(Ordering::SeqCst), 2);
    assert_eq!(f.status.get_status().state, BridgeState::CriticalFailure);
}

/// Test that a failing critical strategy aborts the rest of the cycle
#[tokio::test(start_paused = true)]
async fn test_critical_strategy_failure_aborts_cycle() {
    let f = fixture(SupervisorConfig::default());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    // Heals on the verification pass so the loop ends after one attempt
    f.supervisor.register_check(
        HealthCheckSpec::new("store", "store"),
        Arc::new(FnProbe::new(move || {
            let pass = counter.fetch_add(1, Ordering::SeqCst) > 0;
            async move { Ok(pass) }.boxed()
        })),
    );

    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("a-critical", "store")
            .requires_checks(vec!["store"])
            .critical(),
        Arc::new(FnRecovery::new(|| {
            async { Err(Error::recovery("a-critical", "failed")) }.boxed()
        })),
    );
    let skipped = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&skipped);
    f.supervisor.register_strategy(
        RecoveryStrategySpec::new("b-follower", "store")
            .requires_checks(vec!["store"])
            .depends_on(vec!["a-critical"]),
        Arc::new(FnRecovery::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }.boxed()
        })),
    );

    f.supervisor.run_cycle().await;
    assert_eq!(skipped.load(Ordering::SeqCst), 0);
}
