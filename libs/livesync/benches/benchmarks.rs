//! Benchmarks for livesync
//!
//! Run with: cargo bench -p livesync

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use livesync::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use livesync::core::registry::SharedRegistry;
use livesync::traits::codec::{Codec, Event, JsonCodec, OutboundMessage, WsMessage};
use livesync::traits::reconnect::{ExponentialBackoff, ReconnectionStrategy};

fn sample_event() -> Event {
    Event {
        topic: "booking_update".to_string(),
        data: json!({"bookingId": 42, "status": "confirmed"}),
        timestamp: chrono::Utc::now(),
        origin_id: Some("user-1".to_string()),
    }
}

/// Benchmark atomic state operations
fn bench_atomic_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic_state");

    group.bench_function("get", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Open);
        b.iter(|| black_box(state.get()))
    });

    group.bench_function("is_open", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Open);
        b.iter(|| black_box(state.is_open()))
    });

    group.bench_function("increment_received", |b| {
        let metrics = AtomicMetrics::new();
        b.iter(|| metrics.increment_received())
    });

    group.finish();
}

/// Benchmark topic fan-out
fn bench_registry_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let event = sample_event();

    for subscribers in [1usize, 8, 64] {
        let registry = SharedRegistry::new();
        let hits = Arc::new(AtomicU64::new(0));
        for _ in 0..subscribers {
            let hits = Arc::clone(&hits);
            registry.add(
                "booking_update",
                Arc::new(move |_: &Event| {
                    hits.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_function(format!("dispatch_{}", subscribers), |b| {
            b.iter(|| registry.dispatch(black_box("booking_update"), black_box(&event)))
        });
    }

    group.bench_function("dispatch_unknown_topic", |b| {
        let registry = SharedRegistry::new();
        b.iter(|| registry.dispatch(black_box("nobody"), black_box(&event)))
    });

    group.finish();
}

/// Benchmark envelope encode/decode
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let codec = JsonCodec;

    let frame = WsMessage::Text(
        r#"{"type":"availability_change","data":{"providerId":7,"slots":["09:00","09:30"]},"timestamp":"2024-05-01T09:00:00Z","userId":"u-1"}"#
            .to_string(),
    );
    group.bench_function("decode", |b| {
        b.iter(|| codec.decode(black_box(&frame)))
    });

    let message = OutboundMessage::new("chat_message", json!({"text": "hello there"}));
    group.bench_function("encode", |b| {
        b.iter(|| codec.encode(black_box(&message)))
    });

    group.finish();
}

/// Benchmark reconnection strategies
fn bench_reconnection_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconnection");

    let backoff = ExponentialBackoff::default();
    group.bench_function("exponential_backoff", |b| {
        b.iter(|| {
            for attempt in 0..6 {
                black_box(backoff.next_delay(black_box(attempt)));
            }
        })
    });

    let uncapped = ExponentialBackoff::new(Duration::from_millis(1), Duration::from_secs(60), None);
    group.bench_function("exponential_backoff_large_attempt", |b| {
        b.iter(|| black_box(uncapped.next_delay(black_box(200))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_atomic_state,
    bench_registry_dispatch,
    bench_codec,
    bench_reconnection_strategies,
);

criterion_main!(benches);
