//! Configuration loader
//!
//! Handles loading configuration from TOML files, environment
//! variables, and default values, merged with Figment.

use crate::config::BridgeConfig;
use crate::constants::{CONFIG_ENV_PREFIX, DEFAULT_CONFIG_FILENAME};
use crate::error_ext::ErrorContext;
use crate::logging::log_config_loaded;
use bridge_domain::error::{Error, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Sources are merged in this order (later overrides earlier):
    /// 1. Default values from `BridgeConfig::default()`
    /// 2. TOML configuration file (if it exists)
    /// 3. Environment variables with prefix, `__` between nesting
    ///    levels (e.g. `BRIDGE_SUPERVISOR__MAX_RECOVERY_ATTEMPTS`)
    pub fn load(&self) -> Result<BridgeConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(BridgeConfig::default()));

        let candidate = self
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
        if candidate.exists() {
            figment = figment.merge(Toml::file(&candidate));
            log_config_loaded(&candidate, true);
        } else if self.config_path.is_some() {
            log_config_loaded(&candidate, false);
        }

        // Double underscore separates nesting so multi-word field
        // names survive, e.g. BRIDGE_GUARD__AUTO_REMEDIATE
        figment = figment.merge(Env::prefixed(&format!("{}_", self.env_prefix)).split("__"));

        let config: BridgeConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;

        self.validate(&config)?;

        Ok(config)
    }

    /// Reject configurations that cannot work
    fn validate(&self, config: &BridgeConfig) -> Result<()> {
        for (key, tuning) in &config.bus.events {
            if tuning.batched && tuning.batch_size == 0 {
                return Err(Error::config(format!(
                    "Event '{key}': batch_size must be non-zero when batching is enabled"
                )));
            }
            if tuning.throttled && tuning.throttle_ms == 0 {
                return Err(Error::config(format!(
                    "Event '{key}': throttle_ms must be non-zero when throttling is enabled"
                )));
            }
        }

        if config.supervisor.backoff_base_ms > config.supervisor.backoff_cap_ms {
            return Err(Error::config(format!(
                "Supervisor backoff base ({}ms) exceeds cap ({}ms)",
                config.supervisor.backoff_base_ms, config.supervisor.backoff_cap_ms
            )));
        }
        if config.supervisor.max_recovery_attempts == 0 {
            return Err(Error::config(
                "Supervisor max_recovery_attempts must be non-zero",
            ));
        }

        if config.sync.max_watch_depth == 0 {
            return Err(Error::config("Sync max_watch_depth must be non-zero"));
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("config_path", &self.config_path)
            .field("env_prefix", &self.env_prefix)
            .finish()
    }
}
