//! Integration test: Configuration utilities
//!
//! Config path lookup from bin_common and loading of the shipped YAML.

use livesync_client::bin_common::{load_config_from_env, ConfigType};
use livesync_client::livesync::{SyncConfig, SyncMode};
use std::env;
use std::io::Write;
use std::path::Path;

#[test]
fn test_sync_config_path_from_env() {
    env::remove_var("LIVESYNC_CONFIG_PATH");
    let config_path = load_config_from_env(ConfigType::Sync);
    assert_eq!(config_path.to_str().unwrap(), "config/livesync.yaml");

    env::set_var("LIVESYNC_CONFIG_PATH", "/etc/livesync/prod.yaml");
    let config_path = load_config_from_env(ConfigType::Sync);
    assert_eq!(config_path.to_str().unwrap(), "/etc/livesync/prod.yaml");
    env::remove_var("LIVESYNC_CONFIG_PATH");
}

#[test]
fn test_custom_config() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let config_path = load_config_from_env(custom);

    assert_eq!(config_path.to_str().unwrap(), "custom/path.yaml");
}

#[test]
fn test_shipped_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/livesync.yaml");
    let config = SyncConfig::from_file(&path).unwrap();

    assert_eq!(config.url, "ws://localhost:8080/ws");
    assert_eq!(config.mode, SyncMode::Live);
    assert_eq!(config.simulation_interval_secs, 30);
    assert_eq!(config.backoff.max_attempts, 5);
}

#[test]
fn test_partial_config_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "mode: simulation").unwrap();
    writeln!(file, "simulation_seed: 7").unwrap();

    let config = SyncConfig::from_file(file.path()).unwrap();
    assert_eq!(config.mode, SyncMode::Simulation);
    assert_eq!(config.simulation_seed, Some(7));
    assert_eq!(config, SyncConfig {
        mode: SyncMode::Simulation,
        simulation_seed: Some(7),
        ..SyncConfig::default()
    });
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "url: \"http://not-a-websocket\"").unwrap();

    assert!(SyncConfig::from_file(file.path()).is_err());
}
