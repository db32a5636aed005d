//! # livesync traits
//!
//! Seams the connection manager is assembled from:
//!
//! - **Codec**: frames in, events out; outbound messages to frames
//! - **Connector**: opens a live transport
//! - **ReconnectionStrategy**: how long to wait, and when to give up
//! - **GlobalHandler**: cross-cutting hook run for every event

pub mod codec;
pub mod error;
pub mod handler;
pub mod reconnect;
pub mod transport;

pub use codec::{Codec, Envelope, Event, JsonCodec, OutboundMessage, WsMessage};
pub use error::{Result, SyncError};
pub use handler::{GlobalHandler, LoggingHandler, NoOpHandler};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
pub use transport::{Connector, Transport, TransportEvent, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
