//! Bridge-wide status reporting types
//!
//! The status collaborator owns one [`BridgeStatus`] snapshot that the
//! synchronizer and supervisor report into. Reporters never
//! read-modify-write it concurrently; the cooperative model guarantees
//! a single writer per tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall state of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    /// All components operating normally
    Healthy,
    /// Non-critical checks failing or sync falling behind
    DegradedPerformance,
    /// A collaborator interface is unreachable
    CommunicationError,
    /// One or more update operations failed to apply
    SyncError,
    /// A critical check is failing or automatic recovery is exhausted
    CriticalFailure,
}

impl BridgeState {
    /// Whether this state allows normal operation
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Whether the bridge is still operational (possibly degraded)
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::CriticalFailure)
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::DegradedPerformance => write!(f, "degraded_performance"),
            Self::CommunicationError => write!(f, "communication_error"),
            Self::SyncError => write!(f, "sync_error"),
            Self::CriticalFailure => write!(f, "critical_failure"),
        }
    }
}

/// Current status snapshot of the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    /// Overall state
    pub state: BridgeState,
    /// Human-readable summary of how the bridge got here
    pub message: String,
    /// Components implicated in the current state
    pub affected_components: Vec<String>,
    /// Automatic recovery attempts taken since the last healthy observation
    pub recovery_attempts: u32,
    /// Time of the last status transition
    pub updated_at: DateTime<Utc>,
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self {
            state: BridgeState::Healthy,
            message: String::new(),
            affected_components: Vec::new(),
            recovery_attempts: 0,
            updated_at: Utc::now(),
        }
    }
}

/// One status report from a component
///
/// Fields left `None` keep their previous value in the snapshot.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    /// New overall state
    pub state: Option<BridgeState>,
    /// New summary message
    pub message: Option<String>,
    /// New affected-component list
    pub affected_components: Option<Vec<String>>,
    /// New recovery-attempt count
    pub recovery_attempts: Option<u32>,
}

impl StatusUpdate {
    /// A report that only changes the state
    pub fn state(state: BridgeState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    /// Set the summary message
    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the affected components
    pub fn with_affected(mut self, components: Vec<String>) -> Self {
        self.affected_components = Some(components);
        self
    }

    /// Set the recovery-attempt count
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.recovery_attempts = Some(attempts);
        self
    }

    /// Apply this report onto a snapshot, returning the updated copy
    pub fn apply(&self, current: &BridgeStatus) -> BridgeStatus {
        BridgeStatus {
            state: self.state.unwrap_or(current.state),
            message: self.message.clone().unwrap_or_else(|| current.message.clone()),
            affected_components: self
                .affected_components
                .clone()
                .unwrap_or_else(|| current.affected_components.clone()),
            recovery_attempts: self.recovery_attempts.unwrap_or(current.recovery_attempts),
            updated_at: Utc::now(),
        }
    }
}
