//! WebSocket transport over tokio-tungstenite
//!
//! `WsConnector::connect` performs the handshake and spawns a pump task that
//! owns the socket. The pump forwards data frames and the final close to the
//! manager, and writes whatever the manager queues. When the manager drops
//! its [`Transport`] the outbound channel closes and the pump sends a normal
//! close frame before exiting.

use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

/// Close code used when the server closes without a status
const NO_STATUS_RECEIVED: u16 = 1005;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket transports to a fixed URL
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL with the session identity attached as a percent-encoded `userId`
    fn url_for(&self, identity: &str) -> Result<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| SyncError::Configuration(format!("Invalid url '{}': {}", self.url, e)))?;
        if !identity.is_empty() {
            url.query_pairs_mut().append_pair("userId", identity);
        }
        Ok(url.into())
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, identity: &str) -> Result<Transport> {
        let request = self
            .url_for(identity)?
            .into_client_request()
            .map_err(|e| SyncError::WebSocket(format!("Failed to create request: {}", e)))?;

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| SyncError::WebSocket(e.to_string()))?;
        info!("Connected to {}", self.url);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(ws_stream, outbound_rx, inbound_tx));

        Ok(Transport::new(outbound_tx, inbound_rx))
    }
}

/// Move frames between the socket and the manager's channels
async fn pump(
    ws_stream: WsStream,
    mut outbound: mpsc::UnboundedReceiver<WsMessage>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                        debug!(code, reason = %reason, "Server closed the connection");
                        let _ = inbound.send(TransportEvent::Closed { code, reason });
                        break;
                    }
                    Some(Ok(msg)) => {
                        if let Some(frame) = tungstenite_to_ws_message(msg) {
                            if inbound.send(TransportEvent::Frame(frame)).is_err() {
                                // Manager is gone; nobody will read further frames.
                                let _ = write.close().await;
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        let _ = inbound.send(TransportEvent::closed(ABNORMAL_CLOSURE, e.to_string()));
                        break;
                    }
                    None => {
                        warn!("WebSocket stream closed");
                        let _ = inbound.send(TransportEvent::closed(ABNORMAL_CLOSURE, "Stream ended"));
                        break;
                    }
                }
            }

            frame = outbound.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = write.send(ws_message_to_tungstenite(frame)).await {
                            warn!("Failed to write frame: {}", e);
                            let _ = inbound.send(TransportEvent::closed(ABNORMAL_CLOSURE, e.to_string()));
                            break;
                        }
                    }
                    None => {
                        debug!("Transport released, closing socket");
                        let close = Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client teardown".into(),
                        }));
                        let _ = write.send(close).await;
                        let _ = write.close().await;
                        break;
                    }
                }
            }
        }
    }

    debug!("Transport pump exiting");
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
