//! CLI utilities for binaries
//!
//! Handles configuration path lookup and command line arguments.

use std::path::PathBuf;

/// Which configuration file to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Sync client configuration (config/livesync.yaml)
    Sync,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Sync => "config/livesync.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        "LIVESYNC_CONFIG_PATH"
    }
}

/// Load configuration path from environment or use default
///
/// A custom path always wins over the environment.
///
/// # Examples
/// ```
/// use livesync_client::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Custom("demo.yaml".into()));
/// assert_eq!(path.to_str(), Some("demo.yaml"));
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
