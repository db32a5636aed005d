//! Topic-keyed subscriber registry
//!
//! Each topic maps to a copy-on-write list of callbacks. Dispatch runs over
//! a snapshot of the list, so a callback that subscribes or unsubscribes
//! while being dispatched to never disturbs the iteration in progress; the
//! change is visible from the next dispatch on.

use crate::traits::Event;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace};

/// Subscriber callback
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that returned normally
    pub delivered: usize,
    /// Callbacks that panicked
    pub panicked: usize,
}

/// Topic → ordered callbacks
#[derive(Default, Clone)]
pub struct SubscriberRegistry {
    topics: HashMap<String, Arc<Vec<Callback>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to `topic`
    pub fn add(&mut self, topic: impl Into<String>, callback: Callback) {
        let list = self.topics.entry(topic.into()).or_default();
        Arc::make_mut(list).push(callback);
    }

    /// Drop every callback registered for `topic`
    ///
    /// Returns how many were removed. There is no per-callback removal.
    pub fn remove_all(&mut self, topic: &str) -> usize {
        self.topics.remove(topic).map_or(0, |list| list.len())
    }

    /// Current callbacks for `topic`, shared rather than copied
    pub fn snapshot(&self, topic: &str) -> Option<Arc<Vec<Callback>>> {
        self.topics.get(topic).cloned()
    }

    /// Invoke every callback for `topic` in insertion order
    pub fn dispatch(&self, topic: &str, event: &Event) -> DispatchReport {
        match self.snapshot(topic) {
            Some(callbacks) => fan_out(topic, &callbacks, event),
            None => DispatchReport::default(),
        }
    }

    pub fn len(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |list| list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topics with at least one subscriber
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.keys().cloned().collect();
        topics.sort();
        topics
    }
}

/// Run `callbacks` against `event`, isolating panics
///
/// A panicking callback is logged and skipped; the ones after it still run.
pub fn fan_out(topic: &str, callbacks: &[Callback], event: &Event) -> DispatchReport {
    let mut report = DispatchReport::default();

    for (index, callback) in callbacks.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(()) => report.delivered += 1,
            Err(payload) => {
                report.panicked += 1;
                error!(
                    topic,
                    subscriber = index,
                    panic = %panic_message(payload.as_ref()),
                    "Subscriber panicked during dispatch"
                );
            }
        }
    }

    trace!(topic, delivered = report.delivered, "Dispatched event");
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Registry shared between the consumer handle and the driver task
///
/// Locks are held only to mutate or to take a snapshot, never while a
/// callback runs.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<SubscriberRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, topic: impl Into<String>, callback: Callback) {
        self.inner.write().add(topic, callback);
    }

    pub fn remove_all(&self, topic: &str) -> usize {
        self.inner.write().remove_all(topic)
    }

    pub fn dispatch(&self, topic: &str, event: &Event) -> DispatchReport {
        let snapshot = self.inner.read().snapshot(topic);
        match snapshot {
            Some(callbacks) => fan_out(topic, &callbacks, event),
            None => DispatchReport::default(),
        }
    }

    pub fn len(&self, topic: &str) -> usize {
        self.inner.read().len(topic)
    }

    pub fn topics(&self) -> Vec<String> {
        self.inner.read().topics()
    }
}
