//! Health probe and recovery action contracts
//!
//! Probes answer "is this component healthy right now"; actions try to
//! make it healthy again. Both may suspend. Closure wrappers are
//! provided so call sites can register plain async blocks without
//! defining a struct per check.

use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;

/// One executable health check
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Run the probe; `Ok(false)` and `Err(_)` both count as failing
    async fn check(&self) -> Result<bool>;
}

/// One executable recovery strategy
#[async_trait]
pub trait RecoveryAction: Send + Sync {
    /// Attempt the recovery
    async fn execute(&self) -> Result<()>;
}

/// [`HealthProbe`] built from a closure
pub struct FnProbe {
    f: Box<dyn Fn() -> BoxFuture<'static, Result<bool>> + Send + Sync>,
}

impl FnProbe {
    /// Wrap a closure producing a boxed future
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<bool>> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl HealthProbe for FnProbe {
    async fn check(&self) -> Result<bool> {
        (self.f)().await
    }
}

/// [`RecoveryAction`] built from a closure
pub struct FnRecovery {
    f: Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>,
}

impl FnRecovery {
    /// Wrap a closure producing a boxed future
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

#[async_trait]
impl RecoveryAction for FnRecovery {
    async fn execute(&self) -> Result<()> {
        (self.f)().await
    }
}
