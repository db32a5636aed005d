//! # livesync
//!
//! Real-time event synchronization client for the booking platform's
//! dashboards, chat and availability widgets.
//!
//! ## Features
//!
//! - **One manager per session**: explicitly built, explicitly torn down
//! - **Topic fan-out**: ordered delivery to every subscriber, panics isolated
//! - **Backoff reconnects**: 1s, 2s, 4s, 8s, 16s and then give up
//! - **Simulation fallback**: synthetic events through the same dispatch path
//!   whenever the live transport is missing or has failed
//! - **Pluggable seams**: codec, connector, global handler, reconnect strategy

pub mod traits;
pub mod core;
pub mod manager;

// Re-export all traits
pub use traits::*;

// Re-export core building blocks
pub use crate::core::{
    config, connection_state, registry, simulation,
    config::{BackoffConfig, ConfigError, SyncConfig, SyncMode},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    registry::{SharedRegistry, SubscriberRegistry},
    simulation::{SimulationSource, CATALOG, SIMULATION_TOPIC},
    transport::WsConnector,
};

// Re-export manager
pub use manager::{ConnectionManager, ConnectionManagerBuilder, Metrics, Status, SyncEvent};
