//! Unit tests for the debounce and throttle primitives
//!
//! All tests run under paused tokio time so windows elapse
//! deterministically.

use bridge_engine::adapters::TokioScheduler;
use bridge_engine::sched::{Debouncer, Throttler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test that a burst of debounced calls fires once with the last payload
#[tokio::test(start_paused = true)]
async fn test_debounce_coalesces_burst() {
    let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let debouncer = Debouncer::new(
        Arc::new(TokioScheduler::new()),
        Duration::from_millis(50),
        move |v: u32| sink.lock().unwrap().push(v),
    );

    debouncer.call(1);
    debouncer.call(2);
    debouncer.call(3);
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(*seen.lock().unwrap(), vec![3]);
}

/// Test that each debounced call restarts the quiet window
#[tokio::test(start_paused = true)]
async fn test_debounce_restarts_window() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let debouncer = Debouncer::new(
        Arc::new(TokioScheduler::new()),
        Duration::from_millis(50),
        move |_: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    debouncer.call(1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    debouncer.call(2);
    tokio::time::sleep(Duration::from_millis(30)).await;
    // 60ms elapsed but the window was restarted at 30ms
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// Test that cancel discards the queued payload
#[tokio::test(start_paused = true)]
async fn test_debounce_cancel() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let debouncer = Debouncer::new(
        Arc::new(TokioScheduler::new()),
        Duration::from_millis(50),
        move |_: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    debouncer.call(1);
    debouncer.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

/// Test that a throttled burst forwards only the latest payload
#[tokio::test(start_paused = true)]
async fn test_throttle_forwards_latest_per_window() {
    let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let throttler = Throttler::new(
        Arc::new(TokioScheduler::new()),
        Duration::from_millis(100),
        move |v: u32| sink.lock().unwrap().push(v),
    );

    throttler.call(1);
    throttler.call(2);
    throttler.call(3);
    tokio::time::sleep(Duration::from_millis(110)).await;
    assert_eq!(*seen.lock().unwrap(), vec![3]);

    // A fresh call after the window opens a new one
    throttler.call(4);
    tokio::time::sleep(Duration::from_millis(110)).await;
    assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
}
