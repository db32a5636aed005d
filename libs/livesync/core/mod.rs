//! # livesync core
//!
//! Building blocks the connection manager is assembled from:
//!
//! - **connection_state**: lock-free lifecycle state and counters
//! - **registry**: topic-keyed subscriber fan-out with panic isolation
//! - **simulation**: synthetic events while no live transport is open
//! - **transport**: WebSocket connector over tokio-tungstenite
//! - **config**: YAML-backed settings, including the live/simulation flag

pub mod config;
pub mod connection_state;
pub mod registry;
pub mod simulation;
pub mod transport;

pub use config::{BackoffConfig, ConfigError, SyncConfig, SyncMode};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use registry::{Callback, DispatchReport, SharedRegistry, SubscriberRegistry};
pub use simulation::{EventTemplate, SimulationSource, CATALOG, SIMULATION_TOPIC};
pub use transport::WsConnector;
