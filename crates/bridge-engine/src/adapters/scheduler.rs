//! Tokio-backed scheduler adapter

use async_trait::async_trait;
use bridge_domain::ports::Scheduler;
use std::time::{Duration, Instant};

/// Scheduler over tokio's timer wheel
///
/// Under `#[tokio::test(start_paused = true)]` all delays resolve
/// deterministically, which is how the timer-driven engine paths are
/// tested.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        // tokio's clock so paused-time tests see consistent readings
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    async fn yield_tick(&self) {
        tokio::task::yield_now().await;
    }
}
