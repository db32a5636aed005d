//! Driver task owning the connection lifecycle
//!
//! ```text
//!            connect()                ok
//!   Idle ───────────────> Connecting ────> Open ──── close 1000 ────> Closed
//!                             │             │
//!                   consumer  │ err         │ unexpected close
//!                   attempt   v             v
//!                           Failed <──── Reconnecting ──(delay)──> Connecting
//!                      (simulation)   cap     ^                        │
//!                                             └──── reconnect err ─────┘
//! ```
//!
//! Everything here runs on one task: commands from the handle, the
//! in-flight connect attempt, transport reads, the reconnect timer and the
//! simulation interval are all arms of a single select loop. Teardown drops
//! each of them in place.

use super::manager::{Shared, SyncEvent};
use crate::core::{ConnectionState, SharedRegistry, SimulationSource, SyncConfig, SyncMode};
use crate::traits::*;
use chrono::Utc;
use crossbeam_channel::Sender;
use futures::future::BoxFuture;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

/// Requests from the consumer handle
#[derive(Debug)]
pub(crate) enum Command {
    Connect(String),
    Send(OutboundMessage),
    Teardown,
}

/// Who asked for a connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOrigin {
    /// `connect()` from the consumer: failure falls back to simulation
    Consumer,
    /// Backoff timer: failure feeds the next backoff step
    Reconnect,
}

struct PendingConnect {
    origin: AttemptOrigin,
    future: BoxFuture<'static, Result<Transport>>,
}

/// Reconnect bookkeeping; `attempt` resets on every successful open
#[derive(Debug, Default)]
struct BackoffState {
    attempt: usize,
}

pub(crate) struct Driver {
    config: SyncConfig,
    connector: Arc<dyn Connector>,
    codec: Arc<dyn Codec>,
    global_handler: Arc<dyn GlobalHandler>,
    strategy: Box<dyn ReconnectionStrategy>,
    registry: SharedRegistry,
    shared: Arc<Shared>,
    events: Sender<SyncEvent>,
    commands: mpsc::UnboundedReceiver<Command>,

    identity: Option<String>,
    backoff: BackoffState,
    pending_connect: Option<PendingConnect>,
    transport: Option<Transport>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    simulation: Option<SimulationSource>,
}

impl Driver {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: SyncConfig,
        connector: Arc<dyn Connector>,
        codec: Arc<dyn Codec>,
        global_handler: Arc<dyn GlobalHandler>,
        strategy: Box<dyn ReconnectionStrategy>,
        registry: SharedRegistry,
        shared: Arc<Shared>,
        events: Sender<SyncEvent>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            config,
            connector,
            codec,
            global_handler,
            strategy,
            registry,
            shared,
            events,
            commands,
            identity: None,
            backoff: BackoffState::default(),
            pending_connect: None,
            transport: None,
            reconnect_timer: None,
            simulation: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Connect(identity)) => self.handle_connect(identity),
                        Some(Command::Send(message)) => self.handle_send(message),
                        Some(Command::Teardown) | None => {
                            self.teardown();
                            break;
                        }
                    }
                }

                (origin, result) = next_connect_result(&mut self.pending_connect),
                    if self.pending_connect.is_some() => {
                    self.pending_connect = None;
                    self.on_connect_result(origin, result);
                }

                event = next_transport_event(&mut self.transport), if self.transport.is_some() => {
                    match event {
                        TransportEvent::Frame(frame) => {
                            self.shared.metrics.increment_received();
                            self.on_inbound_frame(&frame);
                        }
                        TransportEvent::Closed { code, reason } => self.on_transport_closed(code, reason),
                    }
                }

                () = reconnect_due(&mut self.reconnect_timer), if self.reconnect_timer.is_some() => {
                    self.reconnect_timer = None;
                    self.start_attempt(AttemptOrigin::Reconnect);
                }

                message = next_simulated(&mut self.simulation), if self.simulation.is_some() => {
                    self.on_simulated(message);
                }
            }
        }

        debug!("Driver task exiting");
    }

    fn handle_connect(&mut self, identity: String) {
        let state = self.shared.state.get();
        if !state.accepts_connect() {
            debug!(%state, "Connect ignored, an attempt is already live");
            return;
        }

        self.identity = Some(identity);

        if self.config.mode == SyncMode::Simulation {
            self.set_state(ConnectionState::Connecting);
            self.enter_failed("simulation mode, no live transport configured".to_string());
            return;
        }

        self.start_attempt(AttemptOrigin::Consumer);
    }

    fn start_attempt(&mut self, origin: AttemptOrigin) {
        let identity = self.identity.clone().unwrap_or_default();
        let connector = Arc::clone(&self.connector);
        let timeout = self.config.connect_timeout();

        debug!(?origin, attempt = self.backoff.attempt, "Starting connect attempt");
        self.set_state(ConnectionState::Connecting);

        let future = Box::pin(async move {
            match tokio::time::timeout(timeout, connector.connect(&identity)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::ConnectTimeout(timeout)),
            }
        });
        self.pending_connect = Some(PendingConnect { origin, future });
    }

    fn on_connect_result(&mut self, origin: AttemptOrigin, result: Result<Transport>) {
        match result {
            Ok(transport) => {
                info!("Live transport open");
                self.transport = Some(transport);
                self.backoff.attempt = 0;
                self.shared.backoff_attempt.store(0, Ordering::Release);
                self.stop_simulation();
                self.set_state(ConnectionState::Open);
                self.emit(SyncEvent::Connected);
            }
            Err(e) => match origin {
                AttemptOrigin::Consumer => {
                    warn!("Failed to connect: {}", e);
                    self.enter_failed(e.to_string());
                }
                AttemptOrigin::Reconnect => {
                    warn!(attempt = self.backoff.attempt, "Reconnect attempt failed: {}", e);
                    self.schedule_reconnect(&e.to_string());
                }
            },
        }
    }

    /// Decode and deliver a live or simulated frame
    fn on_inbound_frame(&mut self, frame: &WsMessage) {
        match self.codec.decode(frame) {
            Ok(event) => self.deliver(event),
            Err(e) => {
                self.shared.metrics.increment_decode_errors();
                warn!("Dropping undecodable frame: {}", e);
            }
        }
    }

    fn deliver(&self, event: Event) {
        *self.shared.last_event.write() = Some(event.clone());

        let handler = &self.global_handler;
        if catch_unwind(AssertUnwindSafe(|| handler.handle(&event))).is_err() {
            error!(topic = %event.topic, "Global handler panicked");
        }

        self.registry.dispatch(&event.topic, &event);
    }

    fn on_simulated(&mut self, message: OutboundMessage) {
        match self.codec.encode(&message) {
            Ok(frame) => {
                self.shared.metrics.increment_simulated();
                self.on_inbound_frame(&frame);
            }
            Err(e) => warn!("Failed to encode simulated event: {}", e),
        }
    }

    fn on_transport_closed(&mut self, code: u16, reason: String) {
        self.transport = None;
        info!(code, reason = %reason, "Live transport closed");
        self.emit(SyncEvent::Disconnected {
            code,
            reason: reason.clone(),
        });

        if code == NORMAL_CLOSURE {
            self.reconnect_timer = None;
            self.stop_simulation();
            self.set_state(ConnectionState::Closed);
            self.emit(SyncEvent::Closed);
            return;
        }

        self.schedule_reconnect(&reason);
    }

    fn schedule_reconnect(&mut self, reason: &str) {
        let attempt = self.backoff.attempt;

        match self.strategy.next_delay(attempt) {
            Some(delay) => {
                self.backoff.attempt += 1;
                self.shared
                    .backoff_attempt
                    .store(self.backoff.attempt, Ordering::Release);
                self.shared.metrics.increment_reconnects();

                info!("Reconnecting in {:?} (attempt {})", delay, self.backoff.attempt);
                self.set_state(ConnectionState::Reconnecting);
                self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
                self.emit(SyncEvent::Reconnecting {
                    attempt: self.backoff.attempt,
                    delay,
                });
            }
            None => {
                warn!(attempts = attempt, "Reconnection strategy exhausted");
                self.enter_failed(format!(
                    "gave up after {} reconnect attempts: {}",
                    attempt, reason
                ));
            }
        }
    }

    fn enter_failed(&mut self, reason: String) {
        self.set_state(ConnectionState::Failed);
        self.emit(SyncEvent::Failed { reason });
        self.start_simulation();
    }

    fn handle_send(&mut self, mut message: OutboundMessage) {
        message.stamp(self.identity.as_deref(), Utc::now());

        let frame = match self.codec.encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                self.shared.metrics.increment_dropped_sends();
                warn!(kind = %message.kind, "Failed to encode outbound message: {}", e);
                return;
            }
        };

        let state = self.shared.state.get();
        match &self.transport {
            Some(transport) if state == ConnectionState::Open => {
                if transport.send(frame) {
                    self.shared.metrics.increment_sent();
                    debug!(kind = %message.kind, "Sent message");
                } else {
                    self.shared.metrics.increment_dropped_sends();
                    debug!(kind = %message.kind, "Transport gone, message dropped");
                }
            }
            _ => {
                self.shared.metrics.increment_dropped_sends();
                if self.identity.is_none() {
                    warn!(kind = %message.kind, "send called before connect, message dropped");
                } else {
                    debug!(kind = %message.kind, %state, "Not connected, message dropped");
                }
            }
        }
    }

    fn start_simulation(&mut self) {
        if self.simulation.is_some() {
            return;
        }

        let identity = self.identity.clone().unwrap_or_default();
        info!(
            "Starting simulated events every {:?}",
            self.config.simulation_interval()
        );
        self.simulation = Some(SimulationSource::start(
            identity,
            self.config.simulation_interval(),
            self.config.simulation_seed,
        ));
        self.shared.simulating.store(true, Ordering::Release);
        self.emit(SyncEvent::SimulationStarted);
    }

    fn stop_simulation(&mut self) {
        if let Some(source) = self.simulation.take() {
            info!(emitted = source.emitted(), "Stopping simulated events");
            self.shared.simulating.store(false, Ordering::Release);
            self.emit(SyncEvent::SimulationStopped);
        }
    }

    /// Release every timer and the transport
    fn teardown(&mut self) {
        self.reconnect_timer = None;
        if self.pending_connect.take().is_some() {
            debug!("Abandoning in-flight connect attempt");
        }
        self.stop_simulation();
        if self.transport.take().is_some() {
            debug!("Closing live transport");
        }
        self.set_state(ConnectionState::Closed);
        self.emit(SyncEvent::Closed);
        info!("Connection manager torn down");
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.shared.state.get();
        if previous != state {
            debug!(from = %previous, to = %state, "State transition");
            self.shared.state.set(state);
        }
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine; the handle may have been dropped.
        let _ = self.events.send(event);
    }
}

async fn next_connect_result(
    pending: &mut Option<PendingConnect>,
) -> (AttemptOrigin, Result<Transport>) {
    match pending {
        Some(pending) => {
            let result = (&mut pending.future).await;
            (pending.origin, result)
        }
        None => std::future::pending().await,
    }
}

async fn next_transport_event(transport: &mut Option<Transport>) -> TransportEvent {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_simulated(simulation: &mut Option<SimulationSource>) -> OutboundMessage {
    match simulation {
        Some(source) => source.tick().await,
        None => std::future::pending().await,
    }
}

