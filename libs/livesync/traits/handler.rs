use crate::traits::codec::Event;
use tracing::debug;

/// Cross-cutting hook run for every decoded event
///
/// Runs before topic fan-out and regardless of whether anyone subscribed
/// to the topic. Meant for diagnostics and bookkeeping, not business logic.
pub trait GlobalHandler: Send + Sync + 'static {
    fn handle(&self, event: &Event);
}

/// Logs every event at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl GlobalHandler for LoggingHandler {
    fn handle(&self, event: &Event) {
        debug!(
            topic = %event.topic,
            origin = event.origin_id.as_deref().unwrap_or("-"),
            timestamp = %event.timestamp,
            "Received event"
        );
    }
}

/// Does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl GlobalHandler for NoOpHandler {
    fn handle(&self, _event: &Event) {}
}

impl<F> GlobalHandler for F
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    fn handle(&self, event: &Event) {
        self(event)
    }
}
