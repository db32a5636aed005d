//! livesync client - Main Library
//!
//! Thin wrapper around the `livesync` workspace library plus the helpers
//! shared by the binaries.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config path, logging)
//! - **livesync**: Real-time event synchronization client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use livesync_client::bin_common::{init_tracing, load_config_from_env, ConfigType};
//! use livesync_client::livesync::ConnectionManager;
//! ```

// Re-export workspace libraries for convenience
pub use livesync;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use logging::init_tracing;
}
