//! Common test utilities for livesync integration tests
//!
//! - `MockConnector`: scripted connector whose transports are driven by the test
//! - `MockWsServer`: local tungstenite echo server for end-to-end tests
//! - `Collector`: subscriber callback that records what it receives

#![allow(dead_code)]

use async_trait::async_trait;
use livesync::{Connector, Event, SyncError, Transport, TransportEvent, WsMessage};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

/// Let the driver task catch up without moving the clock meaningfully
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// What the next connect attempt does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Accept,
    Refuse,
}

/// The server side of a mock transport
pub struct ServerEnd {
    pub to_client: mpsc::UnboundedSender<TransportEvent>,
    pub from_client: mpsc::UnboundedReceiver<WsMessage>,
}

impl ServerEnd {
    pub fn push_text(&self, text: &str) {
        self.to_client
            .send(TransportEvent::Frame(WsMessage::Text(text.to_string())))
            .unwrap();
    }

    pub fn push_event(&self, topic: &str, data: serde_json::Value) {
        let frame = serde_json::json!({
            "type": topic,
            "data": data,
            "timestamp": chrono::Utc::now(),
            "userId": "server",
        });
        self.push_text(&frame.to_string());
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.to_client.send(TransportEvent::closed(code, reason));
    }
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Script>,
    fallback: Option<Script>,
    attempts: Vec<(Instant, String)>,
    links: VecDeque<ServerEnd>,
}

/// Scripted connector
///
/// Attempts follow the script in order, then the fallback (Refuse unless
/// set). Clones share state, so the test keeps one and hands one to the
/// builder.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn scripted(script: &[Script]) -> Self {
        let connector = Self::default();
        connector.state.lock().script = script.iter().copied().collect();
        connector
    }

    pub fn always(script: Script) -> Self {
        let connector = Self::default();
        connector.state.lock().fallback = Some(script);
        connector
    }

    pub fn attempt_count(&self) -> usize {
        self.state.lock().attempts.len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.state.lock().attempts.iter().map(|(at, _)| *at).collect()
    }

    pub fn identities(&self) -> Vec<String> {
        self.state.lock().attempts.iter().map(|(_, id)| id.clone()).collect()
    }

    /// Server end of the oldest accepted transport not yet taken
    pub fn take_link(&self) -> ServerEnd {
        self.state
            .lock()
            .links
            .pop_front()
            .expect("no accepted transport to take")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, identity: &str) -> livesync::Result<Transport> {
        let mut state = self.state.lock();
        state.attempts.push((Instant::now(), identity.to_string()));

        let step = state
            .script
            .pop_front()
            .or(state.fallback)
            .unwrap_or(Script::Refuse);

        match step {
            Script::Refuse => Err(SyncError::WebSocket("connection refused".into())),
            Script::Accept => {
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
                state.links.push_back(ServerEnd {
                    to_client: inbound_tx,
                    from_client: outbound_rx,
                });
                Ok(Transport::new(outbound_tx, inbound_rx))
            }
        }
    }
}

/// Subscriber callback recording every event it sees
#[derive(Clone, Default)]
pub struct Collector {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Collector {
    pub fn callback(&self) -> impl Fn(&Event) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &Event| events.lock().push(event.clone())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

/// A simple echo WebSocket server for end-to-end tests
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self { addr, shutdown }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, shutdown: Arc<Notify>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
