//! Transport seam
//!
//! A [`Connector`] opens a [`Transport`]: a pair of channels the manager
//! talks through. Whatever pumps the real socket sits on the other end, so
//! the manager never sees tungstenite types and tests can script a
//! connection by holding the far ends themselves.

use crate::traits::codec::WsMessage;
use crate::traits::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// WebSocket close code for a normal, deliberate closure
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the stream ends without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A data frame from the server
    Frame(WsMessage),
    /// The transport is gone
    Closed { code: u16, reason: String },
}

impl TransportEvent {
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        TransportEvent::Closed {
            code,
            reason: reason.into(),
        }
    }
}

/// An open transport as seen by the manager
///
/// Dropping it drops the outbound sender, which the pump on the other end
/// takes as the signal to close the socket normally.
#[derive(Debug)]
pub struct Transport {
    outbound: mpsc::UnboundedSender<WsMessage>,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Transport {
    pub fn new(
        outbound: mpsc::UnboundedSender<WsMessage>,
        inbound: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self { outbound, inbound }
    }

    /// Queue a frame for transmission
    ///
    /// Returns false if the pump has already gone away.
    pub fn send(&self, frame: WsMessage) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Next event from the server
    ///
    /// A pump that vanished without reporting a close is treated as an
    /// abnormal closure.
    pub async fn recv(&mut self) -> TransportEvent {
        match self.inbound.recv().await {
            Some(event) => event,
            None => TransportEvent::closed(ABNORMAL_CLOSURE, "transport channel closed"),
        }
    }
}

/// Opens live transports
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport on behalf of `identity`
    ///
    /// An `Err` is a failed attempt; the manager decides what happens next.
    async fn connect(&self, identity: &str) -> Result<Transport>;
}
