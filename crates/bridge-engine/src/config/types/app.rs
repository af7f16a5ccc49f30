//! Aggregate configuration

use super::{EventBusConfig, GuardConfig, LoggingConfig, SupervisorConfig, SyncConfig};
use serde::{Deserialize, Serialize};

/// Full bridge configuration, one section per component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Selective state synchronizer
    pub sync: SyncConfig,
    /// Event bus
    pub bus: EventBusConfig,
    /// Memory guard
    pub guard: GuardConfig,
    /// Self-healing supervisor
    pub supervisor: SupervisorConfig,
    /// Structured logging
    pub logging: LoggingConfig,
}
