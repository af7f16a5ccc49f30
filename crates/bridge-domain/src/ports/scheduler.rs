//! Injectable timer and clock source
//!
//! All suspension in the engine is a deferred task, never a blocking
//! wait. Routing every delay through this trait keeps the core
//! testable without real timers (tokio's paused clock drives the
//! default adapter deterministically).

use async_trait::async_trait;
use std::time::{Duration, Instant};

/// Platform scheduling collaborator
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Current monotonic time
    fn now(&self) -> Instant;

    /// Suspend for a delay
    async fn sleep(&self, delay: Duration);

    /// Suspend until the next scheduler tick (zero-delay deferral)
    ///
    /// Used to coalesce synchronous bursts: work queued during the
    /// current tick is flushed together on the next one.
    async fn yield_tick(&self);
}
