//! Unit tests for configuration loading and validation

use bridge_engine::config::{ArrayStrategy, BridgeConfig, ConfigLoader};
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

/// Test the documented default values
#[test]
fn test_default_values() {
    let config = BridgeConfig::default();

    assert!(config.sync.watch_roots.is_empty());
    assert_eq!(config.sync.max_watch_depth, 5);
    assert_eq!(config.sync.large_collection_threshold, 100);
    assert_eq!(config.sync.array_strategy, ArrayStrategy::Id);

    assert_eq!(config.bus.orphan_age_secs, 300);

    assert_eq!(config.guard.poll_interval_secs, 30);
    assert_eq!(config.guard.max_stale_listener_age_secs, 600);
    assert_eq!(config.guard.max_event_listeners_per_type, 25);
    assert!(!config.guard.auto_remediate);

    assert_eq!(config.supervisor.check_interval_secs, 30);
    assert_eq!(config.supervisor.max_recovery_attempts, 5);
    assert_eq!(config.supervisor.max_attempts_per_strategy, 3);
    assert_eq!(config.supervisor.strategy_timeout_ms, 10_000);
    assert_eq!(config.supervisor.verify_delay_ms, 250);
    assert_eq!(config.supervisor.backoff_base_ms, 1_000);
    assert_eq!(config.supervisor.backoff_cap_ms, 60_000);
    assert!(config.supervisor.progressive_backoff);
}

/// Test loading with no file falls back to defaults
#[test]
fn test_load_without_file_uses_defaults() {
    let config = ConfigLoader::new()
        .with_config_path("/nonexistent/bridge.toml")
        .with_env_prefix("BRIDGE_UNSET_TEST")
        .load()
        .expect("defaults should load");
    assert_eq!(config.supervisor.max_recovery_attempts, 5);
}

/// Test that a TOML file overrides defaults section by section
#[test]
fn test_toml_overrides_defaults() {
    let file = write_config(
        r#"
[sync]
watch_roots = ["chat", "settings"]
exclude_paths = ["*.messages.*"]
array_strategy = "reference"

[guard]
auto_remediate = true

[supervisor]
max_recovery_attempts = 7

[bus.events."chat:message:new"]
batched = true
batch_size = 20
batch_delay_ms = 50
throttled = false
throttle_ms = 100
priority = 0
"#,
    );
    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("BRIDGE_UNSET_TEST")
        .load()
        .expect("config should load");

    assert_eq!(config.sync.watch_roots, vec!["chat", "settings"]);
    assert_eq!(config.sync.exclude_paths, vec!["*.messages.*"]);
    assert_eq!(config.sync.array_strategy, ArrayStrategy::Reference);
    assert!(config.guard.auto_remediate);
    assert_eq!(config.supervisor.max_recovery_attempts, 7);
    // Unspecified sections keep their defaults
    assert_eq!(config.guard.poll_interval_secs, 30);

    let tuning = &config.bus.events["chat:message:new"];
    assert!(tuning.batched);
    assert_eq!(tuning.batch_size, 20);
}

/// Test that environment variables override the file
#[test]
fn test_env_overrides_file() {
    let file = write_config("[supervisor]\nmax_recovery_attempts = 7\n");

    std::env::set_var("BRIDGETEST_SUPERVISOR__MAX_RECOVERY_ATTEMPTS", "9");
    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("BRIDGETEST")
        .load()
        .expect("config should load");
    std::env::remove_var("BRIDGETEST_SUPERVISOR__MAX_RECOVERY_ATTEMPTS");

    assert_eq!(config.supervisor.max_recovery_attempts, 9);
}

/// Test rejection of a zero batch size on a batched event
#[test]
fn test_rejects_zero_batch_size() {
    let file = write_config(
        r#"
[bus.events."chat:message:new"]
batched = true
batch_size = 0
batch_delay_ms = 50
throttled = false
throttle_ms = 100
priority = 0
"#,
    );
    let result = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("BRIDGE_UNSET_TEST")
        .load();
    assert!(result.is_err());
}

/// Test rejection of an inverted backoff range
#[test]
fn test_rejects_backoff_base_above_cap() {
    let file = write_config("[supervisor]\nbackoff_base_ms = 5000\nbackoff_cap_ms = 1000\n");
    let result = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("BRIDGE_UNSET_TEST")
        .load();
    assert!(result.is_err());
}

/// Test rejection of a zero watch depth
#[test]
fn test_rejects_zero_watch_depth() {
    let file = write_config("[sync]\nmax_watch_depth = 0\n");
    let result = ConfigLoader::new()
        .with_config_path(file.path())
        .with_env_prefix("BRIDGE_UNSET_TEST")
        .load();
    assert!(result.is_err());
}
