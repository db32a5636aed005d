//! Synthetic event source used whenever no live transport is open
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  SimulationSource   │
//! │                     │
//! │  Every period:      │
//! │  1. Wait for tick   │
//! │  2. Pick template   │
//! │  3. Stamp + emit ───┼──> Codec::encode ──> inbound frame path ──> registry
//! └─────────────────────┘
//! ```
//!
//! The source is owned by the driver task and polled from its select loop,
//! so stopping it is just dropping it: the interval goes with it and no
//! already-produced frame can be left queued behind a live transport.

use crate::traits::OutboundMessage;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Topic every simulated event is published on
pub const SIMULATION_TOPIC: &str = "notification";

/// Default period between synthetic events
pub const DEFAULT_SIMULATION_INTERVAL: Duration = Duration::from_secs(30);

/// Longest accepted period between synthetic events (one week)
pub const MAX_SIMULATION_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One entry of the fixed catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTemplate {
    pub category: &'static str,
    pub title: &'static str,
    pub message: &'static str,
}

/// Everything the simulation can emit
pub const CATALOG: [EventTemplate; 4] = [
    EventTemplate {
        category: "availability_change",
        title: "New availability",
        message: "A provider you follow just opened new appointment slots",
    },
    EventTemplate {
        category: "booking_update",
        title: "Booking updated",
        message: "One of your upcoming appointments was confirmed",
    },
    EventTemplate {
        category: "provider_status",
        title: "Provider online",
        message: "A provider you booked with is now accepting requests",
    },
    EventTemplate {
        category: "general",
        title: "Reminder",
        message: "You have an appointment coming up tomorrow",
    },
];

/// Timer-driven generator of synthetic events
pub struct SimulationSource {
    identity: String,
    ticker: Interval,
    rng: StdRng,
    sequence: u64,
}

impl SimulationSource {
    /// Start a source for `identity`
    ///
    /// The first event comes one full `period` after start, not immediately.
    /// A `seed` makes template selection reproducible. `period` is clamped
    /// to between one millisecond and [`MAX_SIMULATION_INTERVAL`].
    pub fn start(identity: impl Into<String>, period: Duration, seed: Option<u64>) -> Self {
        let period = period.clamp(Duration::from_millis(1), MAX_SIMULATION_INTERVAL);
        let now = Instant::now();
        let first = now.checked_add(period).unwrap_or(now);
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let identity = identity.into();
        debug!(identity = %identity, period = ?period, "Simulation source started");

        Self {
            identity,
            ticker,
            rng,
            sequence: 0,
        }
    }

    /// Wait for the next tick and produce that tick's message
    pub async fn tick(&mut self) -> OutboundMessage {
        self.ticker.tick().await;
        self.next_message(Utc::now())
    }

    /// Build the next synthetic message without waiting
    pub fn next_message(&mut self, now: DateTime<Utc>) -> OutboundMessage {
        let template = CATALOG[self.rng.gen_range(0..CATALOG.len())];
        self.sequence += 1;

        let mut message = OutboundMessage::new(
            SIMULATION_TOPIC,
            json!({
                "id": format!("sim-{}", self.sequence),
                "category": template.category,
                "title": template.title,
                "message": template.message,
            }),
        );
        message.stamp(Some(&self.identity), now);
        message
    }

    /// Number of messages produced so far
    pub fn emitted(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let started = Instant::now();
        let mut source = SimulationSource::start("user-1", Duration::from_secs(30), Some(7));

        let message = source.tick().await;

        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(message.kind, SIMULATION_TOPIC);
        assert_eq!(message.origin_id.as_deref(), Some("user-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn messages_come_from_the_catalog() {
        let mut source = SimulationSource::start("user-1", Duration::from_secs(1), None);
        let categories: Vec<&str> = CATALOG.iter().map(|t| t.category).collect();

        for expected in 1..=20u64 {
            let message = source.tick().await;
            let category = message.payload["category"].as_str().unwrap();
            assert!(categories.contains(&category), "unexpected category {category}");
            assert_eq!(message.payload["id"], format!("sim-{expected}"));
        }
        assert_eq!(source.emitted(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_period_is_clamped() {
        let started = Instant::now();
        let mut source = SimulationSource::start("user-1", Duration::MAX, Some(1));

        source.tick().await;
        assert_eq!(started.elapsed(), MAX_SIMULATION_INTERVAL);
    }

    #[tokio::test]
    async fn same_seed_same_sequence() {
        let now = Utc::now();
        let mut a = SimulationSource::start("u", DEFAULT_SIMULATION_INTERVAL, Some(42));
        let mut b = SimulationSource::start("u", DEFAULT_SIMULATION_INTERVAL, Some(42));

        for _ in 0..10 {
            assert_eq!(a.next_message(now).payload, b.next_message(now).payload);
        }
    }
}
