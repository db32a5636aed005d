//! # livesync manager
//!
//! The consumer-facing [`ConnectionManager`] and the driver task behind it.

mod driver;
pub mod manager;

pub use manager::{ConnectionManager, ConnectionManagerBuilder, Metrics, Status, SyncEvent};
