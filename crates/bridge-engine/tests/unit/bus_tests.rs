//! Unit tests for the event bus
//!
//! Covers dispatch ordering, once/error/timeout containment, wildcard
//! listeners, batching, throttling, and the orphan sweep.

use bridge_engine::adapters::TokioScheduler;
use bridge_engine::bus::EventBus;
use bridge_engine::config::{EventBusConfig, EventTuning};
use bridge_engine::domain::subscription::SubscribeOptions;
use bridge_engine::domain::Error;
use bridge_engine::tracker::SubscriptionTracker;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn bus_with(config: EventBusConfig) -> EventBus {
    let scheduler = Arc::new(TokioScheduler::new());
    let tracker = SubscriptionTracker::new_shared(scheduler.clone());
    EventBus::new(config, scheduler, tracker)
}

fn recording_sink() -> (Arc<Mutex<Vec<Value>>>, impl Fn(Value) -> Result<(), Error>) {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |value| {
        sink.lock().unwrap().push(value);
        Ok(())
    })
}

// =============================================================================
// Dispatch
// =============================================================================

/// Test that an untuned event dispatches synchronously and unchanged
#[tokio::test(start_paused = true)]
async fn test_immediate_dispatch() {
    let bus = bus_with(EventBusConfig::default());
    let (seen, sink) = recording_sink();
    bus.on("chat:message:new", sink, SubscribeOptions::default());

    bus.emit("chat:message:new", json!({ "body": "hi" }));
    assert_eq!(*seen.lock().unwrap(), vec![json!({ "body": "hi" })]);
}

/// Test that higher-priority listeners run first
#[tokio::test(start_paused = true)]
async fn test_priority_ordering() {
    let bus = bus_with(EventBusConfig::default());
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    for (name, priority) in [("low", 1), ("high", 10), ("mid", 5)] {
        let order = Arc::clone(&order);
        bus.on(
            "app:tick",
            move |_| {
                order.lock().unwrap().push(name);
                Ok(())
            },
            SubscribeOptions::priority(priority),
        );
    }

    bus.emit("app:tick", json!(null));
    assert_eq!(*order.lock().unwrap(), vec!["high", "mid", "low"]);
}

/// Test that a once-listener fires exactly once
#[tokio::test(start_paused = true)]
async fn test_once_listener_fires_once() {
    let bus = bus_with(EventBusConfig::default());
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    bus.on(
        "app:ready",
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
        SubscribeOptions::once(),
    );

    bus.emit("app:ready", json!(1));
    bus.emit("app:ready", json!(2));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// Test that a failing listener does not stop the rest
#[tokio::test(start_paused = true)]
async fn test_listener_error_is_contained() {
    let bus = bus_with(EventBusConfig::default());
    bus.on(
        "app:tick",
        |_| Err(Error::dispatch("app:tick", "listener exploded")),
        SubscribeOptions::priority(10),
    );
    let (seen, sink) = recording_sink();
    bus.on("app:tick", sink, SubscribeOptions::default());

    bus.emit("app:tick", json!(7));
    assert_eq!(*seen.lock().unwrap(), vec![json!(7)]);
}

/// Test that wildcard listeners receive matching events
#[tokio::test(start_paused = true)]
async fn test_wildcard_listener() {
    let bus = bus_with(EventBusConfig::default());
    let (seen, sink) = recording_sink();
    bus.on("chat:**", sink, SubscribeOptions::default());

    bus.emit("chat:message:new", json!(1));
    bus.emit("settings:changed", json!(2));
    assert_eq!(*seen.lock().unwrap(), vec![json!(1)]);
}

/// Test that off() deactivates a listener
#[tokio::test(start_paused = true)]
async fn test_off_deactivates() {
    let bus = bus_with(EventBusConfig::default());
    let (seen, sink) = recording_sink();
    let subscription = bus.on("app:tick", sink, SubscribeOptions::default());
    assert_eq!(bus.listener_count("app:tick"), 1);

    bus.off(&subscription);
    bus.emit("app:tick", json!(1));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(bus.listener_count("app:tick"), 0);
}

// =============================================================================
// Batching
// =============================================================================

fn batched_config() -> EventBusConfig {
    EventBusConfig::default().with_event("chat:message:new", EventTuning::batched(20, 50))
}

/// Test that a full batch flushes at size and the remainder on the timer
#[tokio::test(start_paused = true)]
async fn test_batch_flushes_at_size_then_delay() {
    let bus = bus_with(batched_config());
    let (seen, sink) = recording_sink();
    bus.on("chat:message:new", sink, SubscribeOptions::default());

    for i in 0..25 {
        bus.emit("chat:message:new", json!(i));
    }

    // 20 dispatched immediately at the size threshold
    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_array().unwrap().len(), 20);
    }

    // The remaining 5 wait for the delay timer
    tokio::time::sleep(Duration::from_millis(60)).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let tail: Vec<i64> = seen[1]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(tail, vec![20, 21, 22, 23, 24]);
}

/// Test that a batch of one dispatches its payload unchanged
#[tokio::test(start_paused = true)]
async fn test_batch_of_one_is_not_wrapped() {
    let bus = bus_with(batched_config());
    let (seen, sink) = recording_sink();
    bus.on("chat:message:new", sink, SubscribeOptions::default());

    bus.emit("chat:message:new", json!({ "body": "solo" }));
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(*seen.lock().unwrap(), vec![json!({ "body": "solo" })]);
}

/// Test that flush_all force-completes pending batches
#[tokio::test(start_paused = true)]
async fn test_flush_all_drains_batches() {
    let bus = bus_with(batched_config());
    let (seen, sink) = recording_sink();
    bus.on("chat:message:new", sink, SubscribeOptions::default());

    bus.emit("chat:message:new", json!(1));
    bus.emit("chat:message:new", json!(2));
    assert_eq!(bus.pending_depth(), 2);

    bus.flush_all();
    assert_eq!(bus.pending_depth(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![json!([1, 2])]);
}

// =============================================================================
// Throttling
// =============================================================================

/// Test that a throttled event forwards only the latest payload per window
#[tokio::test(start_paused = true)]
async fn test_throttled_event_coalesces() {
    let config =
        EventBusConfig::default().with_event("scroll:position", EventTuning::throttled(100));
    let bus = bus_with(config);
    let (seen, sink) = recording_sink();
    bus.on("scroll:position", sink, SubscribeOptions::default());

    bus.emit("scroll:position", json!(10));
    bus.emit("scroll:position", json!(20));
    bus.emit("scroll:position", json!(30));
    assert!(seen.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(110)).await;
    assert_eq!(*seen.lock().unwrap(), vec![json!(30)]);
}

// =============================================================================
// Orphan sweep
// =============================================================================

/// Test that deactivated never-fired listeners are purged after the orphan age
#[tokio::test(start_paused = true)]
async fn test_orphan_sweep_purges_dead_listeners() {
    let bus = bus_with(EventBusConfig::default());
    let subscription = bus.on("app:tick", |_| Ok(()), SubscribeOptions::default());
    bus.off(&subscription);

    // Default orphan age is 300 seconds
    assert_eq!(bus.sweep_orphans(), 0);
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(bus.sweep_orphans(), 1);
}
