//! Structured logging with tracing
//!
//! Centralized logging configuration and log helpers using the
//! tracing ecosystem: level filtering, optional JSON output, optional
//! daily-rotating file appender.

use bridge_domain::error::{Error, Result};

// Re-export LoggingConfig for convenience
pub use crate::config::LoggingConfig;
use crate::constants::LOG_ENV_VAR;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize logging with the provided configuration
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_appender = config.file_output.as_ref().map(|path| {
        tracing_appender::rolling::daily(
            path.parent().unwrap_or_else(|| std::path::Path::new(".")),
            path.file_stem()
                .unwrap_or_else(|| std::ffi::OsStr::new("bridge")),
        )
    });

    // Initialize based on json_format (types differ so we need separate branches)
    if config.json_format {
        let stdout = fmt::layer().json().with_target(true);
        let registry = Registry::default().with(filter);
        if let Some(appender) = file_appender {
            let file = fmt::layer()
                .json()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true);
            registry.with(stdout).with(file).init();
        } else {
            registry.with(stdout).init();
        }
    } else {
        let stdout = fmt::layer().with_target(true);
        let registry = Registry::default().with(filter);
        if let Some(appender) = file_appender {
            let file = fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true);
            registry.with(stdout).with(file).init();
        } else {
            registry.with(stdout).init();
        }
    }

    info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Error::config(format!(
            "Invalid log level: {level}. Use trace, debug, info, warn, or error"
        ))),
    }
}

/// Log configuration loading status
pub fn log_config_loaded(config_path: &std::path::Path, success: bool) {
    if success {
        info!("Configuration loaded from {}", config_path.display());
    } else {
        warn!("Configuration file not found: {}", config_path.display());
    }
}

/// Log health check result
pub fn log_health_check(check_id: &str, component: &str, passed: bool, error: Option<&str>) {
    if passed {
        debug!(check = check_id, component = component, "Health check passed");
    } else {
        warn!(
            check = check_id,
            component = component,
            error = error.unwrap_or("check returned false"),
            "Health check failed"
        );
    }
}

/// Log the outcome of one recovery strategy execution
pub fn log_recovery_outcome(strategy_id: &str, attempt: u32, success: bool, error: Option<&str>) {
    if success {
        info!(strategy = strategy_id, attempt = attempt, "Recovery strategy succeeded");
    } else {
        warn!(
            strategy = strategy_id,
            attempt = attempt,
            error = error.unwrap_or("unknown"),
            "Recovery strategy failed"
        );
    }
}

/// Log a flagged leak suspect
pub fn log_leak_suspect(subscription: &str, pattern: &str, age_secs: u64, remediated: bool) {
    warn!(
        subscription = subscription,
        pattern = pattern,
        age_secs = age_secs,
        remediated = remediated,
        "Leak suspect: listener never fired and exceeded twice the stale age"
    );
}
