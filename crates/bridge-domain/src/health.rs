//! Health check and recovery strategy descriptors
//!
//! The supervisor registers probes and actions against these specs.
//! Specs are pure metadata; the executable parts are the
//! [`crate::ports::HealthProbe`] and [`crate::ports::RecoveryAction`]
//! traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of one supervisor cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPhase {
    /// Waiting for the next scheduled cycle
    Idle,
    /// Running registered health checks
    Checking,
    /// All checks passed
    Healthy,
    /// Executing recovery strategies
    Recovering,
}

/// Metadata describing one registered health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    /// Unique check id
    pub id: String,
    /// Component this check probes
    pub component: String,
    /// A failing critical check forces `CriticalFailure`
    pub critical: bool,
    /// Contribution to the weighted health percentage
    pub weight: u32,
}

impl HealthCheckSpec {
    /// Create a non-critical check of weight 1
    pub fn new<I: Into<String>, C: Into<String>>(id: I, component: C) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            critical: false,
            weight: 1,
        }
    }

    /// Mark the check critical
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Set the check weight
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Result of one executed health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check id
    pub id: String,
    /// Whether the check passed; an erroring probe counts as failing
    pub passed: bool,
    /// Error message when the probe itself failed
    pub error: Option<String>,
    /// When the check ran
    pub checked_at: DateTime<Utc>,
}

/// Aggregated outcome of one health pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Weighted percentage of passing checks, 0..=100
    pub health_percent: u32,
    /// Whether any critical check failed
    pub critical_failed: bool,
    /// Ids of failing checks
    pub failed_checks: Vec<String>,
    /// Components of failing checks
    pub failed_components: Vec<String>,
    /// Per-check results
    pub results: Vec<CheckResult>,
}

impl HealthReport {
    /// Whether every check passed
    pub fn is_healthy(&self) -> bool {
        self.failed_checks.is_empty()
    }
}

/// Metadata describing one registered recovery strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryStrategySpec {
    /// Unique strategy id
    pub id: String,
    /// Component this strategy repairs
    pub component: String,
    /// Failure of a critical strategy may abort the remaining cycle
    pub critical: bool,
    /// Check ids whose failure selects this strategy
    pub required_health_checks: Vec<String>,
    /// Ids of strategies that must begin before this one
    pub dependencies: Vec<String>,
    /// Per-execution timeout override in milliseconds
    pub timeout_ms: Option<u64>,
}

impl RecoveryStrategySpec {
    /// Create a strategy for a component
    pub fn new<I: Into<String>, C: Into<String>>(id: I, component: C) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            critical: false,
            required_health_checks: Vec::new(),
            dependencies: Vec::new(),
            timeout_ms: None,
        }
    }

    /// Mark the strategy critical
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Select this strategy when any of these checks fail
    pub fn requires_checks<S: Into<String>>(mut self, checks: Vec<S>) -> Self {
        self.required_health_checks = checks.into_iter().map(Into::into).collect();
        self
    }

    /// Declare strategies that must begin before this one
    pub fn depends_on<S: Into<String>>(mut self, deps: Vec<S>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Override the execution timeout
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}
