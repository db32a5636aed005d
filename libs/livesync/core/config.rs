use crate::core::simulation::{DEFAULT_SIMULATION_INTERVAL, MAX_SIMULATION_INTERVAL};
use crate::traits::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Upper bound for `backoff.max_delay_secs` (one hour)
const MAX_BACKOFF_DELAY_SECS: u64 = 60 * 60;

/// Upper bound for `connect_timeout_secs`
const MAX_CONNECT_TIMEOUT_SECS: u64 = 5 * 60;

/// Where events come from
///
/// Chosen by the host at construction time; the manager never inspects
/// its environment to decide this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Try the live transport, fall back to simulation on failure
    #[default]
    Live,
    /// Never touch the network; simulation only
    Simulation,
}

impl std::str::FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(SyncMode::Live),
            "simulation" | "sim" => Ok(SyncMode::Simulation),
            other => Err(ConfigError::ValidationError(format!(
                "unknown sync mode '{other}' (expected 'live' or 'simulation')"
            ))),
        }
    }
}

/// Reconnect backoff parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_secs: u64,
    pub max_attempts: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_secs: 30,
            max_attempts: 5,
        }
    }
}

impl BackoffConfig {
    pub fn strategy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_secs(self.max_delay_secs),
            Some(self.max_attempts),
        )
    }
}

/// Configuration for one [`ConnectionManager`](crate::manager::ConnectionManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// WebSocket URL (ws:// or wss://)
    pub url: String,
    pub mode: SyncMode,
    pub simulation_interval_secs: u64,
    /// Fixes simulated template selection when set
    pub simulation_seed: Option<u64>,
    pub connect_timeout_secs: u64,
    pub backoff: BackoffConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            mode: SyncMode::Live,
            simulation_interval_secs: DEFAULT_SIMULATION_INTERVAL.as_secs(),
            simulation_seed: None,
            connect_timeout_secs: 10,
            backoff: BackoffConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a YAML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Loading sync config from: {}", path.as_ref().display());

        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_yaml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Override fields from `LIVESYNC_URL` and `LIVESYNC_MODE` when present
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("LIVESYNC_URL") {
            self.url = url;
        }
        if let Ok(mode) = std::env::var("LIVESYNC_MODE") {
            self.mode = mode.parse()?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.mode == SyncMode::Live
            && !(self.url.starts_with("ws://") || self.url.starts_with("wss://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "url must start with ws:// or wss://, got '{}'",
                self.url
            )));
        }

        check_range(
            "simulation_interval_secs",
            self.simulation_interval_secs,
            MAX_SIMULATION_INTERVAL.as_secs(),
        )?;
        check_range(
            "connect_timeout_secs",
            self.connect_timeout_secs,
            MAX_CONNECT_TIMEOUT_SECS,
        )?;
        check_range(
            "backoff.max_delay_secs",
            self.backoff.max_delay_secs,
            MAX_BACKOFF_DELAY_SECS,
        )?;
        check_range(
            "backoff.initial_delay_ms",
            self.backoff.initial_delay_ms,
            MAX_BACKOFF_DELAY_SECS * 1_000,
        )?;

        Ok(())
    }

    pub fn simulation_interval(&self) -> Duration {
        Duration::from_secs(self.simulation_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn check_range(field: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 || value > max {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be between 1 and {max}, got {value}"
        )));
    }
    Ok(())
}
