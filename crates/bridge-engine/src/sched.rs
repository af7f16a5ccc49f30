//! Scheduling primitives
//!
//! Cancellable debounce and throttle wrappers over the injectable
//! [`Scheduler`] port. Both are trailing-edge: they forward the most
//! recent payload once their window elapses, coalescing everything
//! queued inside it.

use bridge_domain::ports::Scheduler;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to one outstanding timer task
#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    /// Wrap a spawned timer task
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Cancel the timer; the pending action never runs
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer has fired or been cancelled
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Trailing-edge debouncer
///
/// Each call restarts the window; the action runs once with the most
/// recent payload after `delay` of quiet.
pub struct Debouncer<T: Send + 'static> {
    scheduler: Arc<dyn Scheduler>,
    delay: Duration,
    action: Arc<dyn Fn(T) + Send + Sync>,
    latest: Arc<Mutex<Option<T>>>,
    timer: Mutex<Option<TimerHandle>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer invoking `action` after `delay` of quiet
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, delay: Duration, action: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            scheduler,
            delay,
            action: Arc::new(action),
            latest: Arc::new(Mutex::new(None)),
            timer: Mutex::new(None),
        }
    }

    /// Queue a payload, restarting the debounce window
    pub fn call(&self, value: T) {
        *self.latest.lock().expect("debounce payload lock") = Some(value);

        let mut timer = self.timer.lock().expect("debounce timer lock");
        if let Some(previous) = timer.take() {
            previous.cancel();
        }

        let scheduler = Arc::clone(&self.scheduler);
        let action = Arc::clone(&self.action);
        let latest = Arc::clone(&self.latest);
        let delay = self.delay;
        *timer = Some(TimerHandle::new(tokio::spawn(async move {
            scheduler.sleep(delay).await;
            let value = latest.lock().expect("debounce payload lock").take();
            if let Some(value) = value {
                action(value);
            }
        })));
    }

    /// Cancel the pending window and discard the queued payload
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().expect("debounce timer lock").take() {
            timer.cancel();
        }
        self.latest.lock().expect("debounce payload lock").take();
    }

    /// Whether a window is currently armed
    pub fn is_pending(&self) -> bool {
        self.timer
            .lock()
            .expect("debounce timer lock")
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

/// Trailing-edge throttler
///
/// At most one forward per `interval`; each window forwards only the
/// most recent payload queued inside it.
pub struct Throttler<T: Send + 'static> {
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    action: Arc<dyn Fn(T) + Send + Sync>,
    pending: Arc<Mutex<Option<T>>>,
    timer: Mutex<Option<TimerHandle>>,
}

impl<T: Send + 'static> Throttler<T> {
    /// Create a throttler forwarding at most once per `interval`
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, interval: Duration, action: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            scheduler,
            interval,
            action: Arc::new(action),
            pending: Arc::new(Mutex::new(None)),
            timer: Mutex::new(None),
        }
    }

    /// Queue a payload for the current window
    pub fn call(&self, value: T) {
        *self.pending.lock().expect("throttle payload lock") = Some(value);

        let mut timer = self.timer.lock().expect("throttle timer lock");
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            // Window already armed; the stored payload was refreshed above
            return;
        }

        let scheduler = Arc::clone(&self.scheduler);
        let action = Arc::clone(&self.action);
        let pending = Arc::clone(&self.pending);
        let interval = self.interval;
        *timer = Some(TimerHandle::new(tokio::spawn(async move {
            scheduler.sleep(interval).await;
            let value = pending.lock().expect("throttle payload lock").take();
            if let Some(value) = value {
                action(value);
            }
        })));
    }

    /// Cancel the current window and discard the queued payload
    pub fn cancel(&self) {
        if let Some(timer) = self.timer.lock().expect("throttle timer lock").take() {
            timer.cancel();
        }
        self.pending.lock().expect("throttle payload lock").take();
    }
}
