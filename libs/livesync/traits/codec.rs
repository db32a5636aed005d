//! Wire codec
//!
//! Every frame in both directions is a JSON envelope:
//!
//! ```text
//! { "type": string, "data": any, "timestamp": RFC 3339, "userId"?: string }
//! ```
//!
//! Inbound envelopes become [`Event`]s keyed by `type`. Outbound
//! [`OutboundMessage`]s are stamped with the send time and the session
//! identity right before encoding, whatever the caller put there.

use crate::traits::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw frame exchanged with a transport
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }
}

/// Wire envelope, field-for-field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    /// Frames without a timestamp are stamped on receipt
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A decoded inbound event
///
/// Immutable once dispatched. Live and simulated events have the same shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub topic: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub origin_id: Option<String>,
}

impl From<Envelope> for Event {
    fn from(envelope: Envelope) -> Self {
        Self {
            topic: envelope.kind,
            data: envelope.data,
            timestamp: envelope.timestamp,
            origin_id: envelope.user_id,
        }
    }
}

/// A message a consumer wants to push to the server
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub kind: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub origin_id: Option<String>,
}

impl OutboundMessage {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
            origin_id: None,
        }
    }

    /// Overwrite timestamp and origin with transmission-time values
    pub fn stamp(&mut self, identity: Option<&str>, now: DateTime<Utc>) {
        self.timestamp = now;
        self.origin_id = identity.map(str::to_owned);
    }
}

/// Translates between frames and typed events
pub trait Codec: Send + Sync + 'static {
    /// Serialize an already stamped outbound message
    fn encode(&self, message: &OutboundMessage) -> Result<WsMessage>;

    /// Parse a frame; malformed input is a [`SyncError::Decode`]
    fn decode(&self, frame: &WsMessage) -> Result<Event>;
}

/// JSON envelope codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &OutboundMessage) -> Result<WsMessage> {
        let envelope = Envelope {
            kind: message.kind.clone(),
            data: message.payload.clone(),
            timestamp: message.timestamp,
            user_id: message.origin_id.clone(),
        };
        let text = serde_json::to_string(&envelope).map_err(|e| SyncError::Encode(e.to_string()))?;
        Ok(WsMessage::Text(text))
    }

    fn decode(&self, frame: &WsMessage) -> Result<Event> {
        let envelope: Envelope = match frame {
            WsMessage::Text(text) => serde_json::from_str(text)?,
            WsMessage::Binary(bytes) => serde_json::from_slice(bytes)?,
        };

        if envelope.kind.is_empty() {
            return Err(SyncError::Decode("envelope has an empty type".into()));
        }

        Ok(envelope.into())
    }
}
