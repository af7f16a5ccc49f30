//! Unit tests for the memory guard
//!
//! Ages are produced by advancing paused tokio time past the stale
//! and suspect thresholds before sweeping.

use bridge_engine::adapters::TokioScheduler;
use bridge_engine::bus::EventBus;
use bridge_engine::config::{EventBusConfig, GuardConfig};
use bridge_engine::domain::subscription::SubscribeOptions;
use bridge_engine::guard::MemoryGuard;
use bridge_engine::tracker::SubscriptionTracker;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    bus: EventBus,
    tracker: Arc<SubscriptionTracker>,
    guard: Arc<MemoryGuard>,
}

fn fixture(config: GuardConfig) -> Fixture {
    let scheduler = Arc::new(TokioScheduler::new());
    let tracker = SubscriptionTracker::new_shared(scheduler.clone());
    let bus = EventBus::new(EventBusConfig::default(), scheduler.clone(), tracker.clone());
    let guard = MemoryGuard::new(config, tracker.clone(), bus.clone(), scheduler);
    Fixture { bus, tracker, guard }
}

/// Test that a fresh active listener is not flagged
#[tokio::test(start_paused = true)]
async fn test_clean_sweep() {
    let f = fixture(GuardConfig::default());
    f.bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());

    let report = f.guard.sweep();
    assert!(!report.has_findings());
    assert_eq!(report.total, 1);
}

/// Test that an idle but previously used listener is flagged stale only
#[tokio::test(start_paused = true)]
async fn test_stale_listener_flagged() {
    let f = fixture(GuardConfig::default());
    f.bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());
    f.bus.emit("app:tick", json!(1));

    // Past the 600s stale age, short of the 1200s suspect age
    tokio::time::sleep(Duration::from_secs(700)).await;
    let report = f.guard.sweep();

    assert_eq!(report.stale.len(), 1);
    assert!(report.leak_suspects.is_empty());
}

/// Test that a never-fired listener past twice the stale age is a suspect
#[tokio::test(start_paused = true)]
async fn test_leak_suspect_flagged() {
    let f = fixture(GuardConfig::default());
    f.bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());

    tokio::time::sleep(Duration::from_secs(1201)).await;
    let report = f.guard.sweep();

    assert_eq!(report.leak_suspects.len(), 1);
    // Observe-only by default
    assert_eq!(report.remediated, 0);
    assert_eq!(f.bus.listener_count("app:tick"), 1);
}

/// Test that auto-remediation detaches suspects
#[tokio::test(start_paused = true)]
async fn test_auto_remediation_detaches_suspects() {
    let f = fixture(GuardConfig::remediating());
    f.bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());

    tokio::time::sleep(Duration::from_secs(1201)).await;
    let report = f.guard.sweep();

    assert_eq!(report.remediated, 1);
    assert_eq!(f.bus.listener_count("app:tick"), 0);
}

/// Test that subscriptions of an unregistered component are dangling
#[tokio::test(start_paused = true)]
async fn test_dangling_after_component_teardown() {
    let f = fixture(GuardConfig::default());
    f.tracker.components().register("chat-panel");
    f.bus.on(
        "chat:message:new",
        |_| Ok(()),
        SubscribeOptions::default().with_owner("chat-panel"),
    );

    assert!(f.guard.sweep().dangling.is_empty());
    f.tracker.components().unregister("chat-panel");
    assert_eq!(f.guard.sweep().dangling.len(), 1);
}

/// Test that a component reincarnation orphans older subscriptions
#[tokio::test(start_paused = true)]
async fn test_dangling_after_component_reincarnation() {
    let f = fixture(GuardConfig::default());
    f.tracker.components().register("chat-panel");
    f.bus.on(
        "chat:message:new",
        |_| Ok(()),
        SubscribeOptions::default().with_owner("chat-panel"),
    );

    // Re-registration bumps the generation; the old subscription now
    // belongs to a dead incarnation
    f.tracker.components().register("chat-panel");
    assert_eq!(f.guard.sweep().dangling.len(), 1);
}

/// Test the per-event listener count warning
#[tokio::test(start_paused = true)]
async fn test_over_limit_warning() {
    let config = GuardConfig {
        max_event_listeners_per_type: 2,
        ..GuardConfig::default()
    };
    let f = fixture(config);
    for _ in 0..3 {
        f.bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());
    }

    let report = f.guard.sweep();
    assert_eq!(report.over_limit, vec![("app:tick".to_string(), 3)]);
}

/// Test that remediate_now forces detachment in observe-only mode
#[tokio::test(start_paused = true)]
async fn test_remediate_now_overrides_mode() {
    let f = fixture(GuardConfig::default());
    f.bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());

    tokio::time::sleep(Duration::from_secs(1201)).await;
    let report = f.guard.remediate_now();

    assert_eq!(report.remediated, 1);
    assert_eq!(f.bus.listener_count("app:tick"), 0);
}
