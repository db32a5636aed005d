use super::driver::{Command, Driver};
use crate::core::{
    AtomicConnectionState, AtomicMetrics, ConnectionState, SharedRegistry, SyncConfig, SyncMode,
    WsConnector,
};
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lifecycle notifications published by the manager
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Live transport opened
    Connected,
    /// Live transport went away
    Disconnected { code: u16, reason: String },
    /// Next attempt scheduled (1-based attempt number)
    Reconnecting { attempt: usize, delay: Duration },
    /// Live transport given up on for this session
    Failed { reason: String },
    SimulationStarted,
    SimulationStopped,
    /// Torn down, or closed normally by the server
    Closed,
}

/// What consumers see of the connection
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub connected: bool,
    pub last_event: Option<Event>,
}

/// Metrics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub messages_sent: u64,
    /// Frames read from the live transport; simulated events are in `simulated_events`
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub dropped_sends: u64,
    pub decode_errors: u64,
    pub simulated_events: u64,
    /// Current backoff attempt; reset to 0 on every successful open
    pub backoff_attempt: usize,
    pub connection_state: ConnectionState,
}

/// State the driver writes and the handle reads
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) state: AtomicConnectionState,
    pub(crate) metrics: AtomicMetrics,
    pub(crate) backoff_attempt: AtomicUsize,
    pub(crate) simulating: AtomicBool,
    pub(crate) last_event: RwLock<Option<Event>>,
}

/// Real-time event synchronization client
///
/// One instance per consumer session. All transitions happen on a single
/// driver task spawned at build time; this handle only queues commands and
/// reads published state, so none of its methods block or fail.
///
/// # Example
/// ```ignore
/// let mut manager = ConnectionManager::builder()
///     .config(SyncConfig::from_file("config/livesync.yaml")?)
///     .build()?;
///
/// manager.subscribe("booking_update", |event| {
///     println!("booking changed: {}", event.data);
/// });
/// manager.connect("user-42");
/// manager.send(OutboundMessage::new("chat_message", json!({"text": "hi"})));
///
/// // ...
/// manager.teardown().await;
/// ```
pub struct ConnectionManager {
    command_tx: mpsc::UnboundedSender<Command>,
    registry: SharedRegistry,
    shared: Arc<Shared>,
    event_rx: Receiver<SyncEvent>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    /// Build a manager with default collaborators for `config`
    pub fn new(config: SyncConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Open the live channel on behalf of `identity`
    ///
    /// Ignored while an attempt is already in flight or the transport is up.
    /// Failure is reported through [`status`](Self::status) and the event
    /// stream, never returned.
    pub fn connect(&self, identity: impl Into<String>) {
        self.command(Command::Connect(identity.into()));
    }

    /// Transmit `message` if the live transport is open, otherwise drop it
    pub fn send(&self, message: OutboundMessage) {
        self.command(Command::Send(message));
    }

    /// Register `callback` for `topic`
    ///
    /// Takes effect immediately, including for a dispatch already queued.
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let topic = topic.into();
        debug!(topic = %topic, "Subscribing");
        self.registry.add(topic, Arc::new(callback));
    }

    /// Remove **every** callback registered for `topic`
    ///
    /// Returns how many were removed. Consumers sharing a topic lose their
    /// subscriptions together.
    pub fn unsubscribe(&self, topic: &str) -> usize {
        let removed = self.registry.remove_all(topic);
        debug!(topic, removed, "Unsubscribed");
        removed
    }

    pub fn status(&self) -> Status {
        Status {
            connected: self.shared.state.is_open(),
            last_event: self.shared.last_event.read().clone(),
        }
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_open()
    }

    /// Whether synthetic events are currently being generated
    #[inline]
    pub fn is_simulating(&self) -> bool {
        self.shared.simulating.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> Metrics {
        let metrics = &self.shared.metrics;
        Metrics {
            messages_sent: metrics.messages_sent(),
            messages_received: metrics.messages_received(),
            reconnect_count: metrics.reconnect_count(),
            dropped_sends: metrics.dropped_sends(),
            decode_errors: metrics.decode_errors(),
            simulated_events: metrics.simulated_events(),
            backoff_attempt: self.shared.backoff_attempt.load(Ordering::Acquire),
            connection_state: self.shared.state.get(),
        }
    }

    /// Topics with at least one subscriber
    pub fn topics(&self) -> Vec<String> {
        self.registry.topics()
    }

    /// Try to receive a lifecycle event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SyncEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive a lifecycle event (blocking)
    pub fn recv_event(&self) -> std::result::Result<SyncEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Clone of the lifecycle event receiver
    pub fn events(&self) -> Receiver<SyncEvent> {
        self.event_rx.clone()
    }

    /// Cancel every timer, close the transport and stop the driver
    ///
    /// Safe to call more than once. Dropping the manager without calling
    /// this aborts the driver, which releases the same resources.
    pub async fn teardown(&mut self) {
        let Some(handle) = self.task_handle.take() else {
            debug!("Teardown already completed");
            return;
        };

        info!("Tearing down connection manager");
        let _ = self.command_tx.send(Command::Teardown);
        if let Err(e) = handle.await {
            warn!("Driver task ended abnormally: {}", e);
        }
        self.shared.state.set(ConnectionState::Closed);
    }

    fn command(&self, command: Command) {
        if let Err(e) = self.command_tx.send(command) {
            warn!("Manager already torn down, ignoring {:?}", e.0);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            debug!("Manager dropped without teardown, aborting driver");
            handle.abort();
        }
    }
}

/// Builder for [`ConnectionManager`]
pub struct ConnectionManagerBuilder {
    config: SyncConfig,
    connector: Option<Arc<dyn Connector>>,
    codec: Arc<dyn Codec>,
    global_handler: Arc<dyn GlobalHandler>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
}

impl ConnectionManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            connector: None,
            codec: Arc::new(JsonCodec),
            global_handler: Arc::new(LoggingHandler),
            reconnect_strategy: None,
        }
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for setting only the deployment mode
    pub fn mode(mut self, mode: SyncMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Replace the WebSocket connector (defaults to the configured URL)
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub fn codec(mut self, codec: impl Codec) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn global_handler(mut self, handler: impl GlobalHandler) -> Self {
        self.global_handler = Arc::new(handler);
        self
    }

    /// Replace the backoff derived from `config.backoff`
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Validate the configuration and spawn the driver task
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<ConnectionManager> {
        self.config
            .validate()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new(self.config.url.clone())));
        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(self.config.backoff.strategy()));

        let shared = Arc::new(Shared::default());
        let registry = SharedRegistry::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let driver = Driver::new(
            self.config,
            connector,
            self.codec,
            self.global_handler,
            strategy,
            registry.clone(),
            Arc::clone(&shared),
            event_tx,
            command_rx,
        );
        let task_handle = tokio::spawn(driver.run());

        Ok(ConnectionManager {
            command_tx,
            registry,
            shared,
            event_rx,
            task_handle: Some(task_handle),
        })
    }
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
