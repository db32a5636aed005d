//! Demo binary for the livesync client
//!
//! Connects as the identity given on the command line (default `demo-user`),
//! logs every event on the well-known topics and announces presence once
//! the live transport is up.
//! Set `LIVESYNC_MODE=simulation` to run without a server.

use anyhow::Result;
use livesync_client::bin_common::{init_tracing, load_config_from_env, parse_args, ConfigType};
use livesync_client::livesync::{ConnectionManager, Event, OutboundMessage, SyncConfig};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const TOPICS: [&str; 4] = [
    "notification",
    "booking_update",
    "availability_change",
    "chat_message",
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config_path = load_config_from_env(ConfigType::Sync);
    let mut config = if config_path.exists() {
        info!("Loading configuration from {}", config_path.display());
        SyncConfig::from_file(&config_path)?
    } else {
        warn!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
        SyncConfig::default()
    };
    config.apply_env_overrides()?;

    let identity = parse_args()
        .into_iter()
        .next()
        .unwrap_or_else(|| "demo-user".to_string());

    info!(url = %config.url, mode = ?config.mode, identity = %identity, "Starting livesync demo");
    let mut manager = ConnectionManager::new(config)?;

    for topic in TOPICS {
        manager.subscribe(topic, move |event: &Event| {
            info!(topic, data = %event.data, "Event");
        });
    }

    let events = manager.events();
    std::thread::spawn(move || {
        while let Ok(event) = events.recv() {
            info!("Lifecycle: {:?}", event);
        }
    });

    manager.connect(identity.as_str());

    tokio::time::sleep(Duration::from_secs(1)).await;
    if manager.is_connected() {
        manager.send(OutboundMessage::new("presence", json!({ "status": "online" })));
    }

    println!("Press Ctrl+C to stop\n");
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal (Ctrl+C)");

    let metrics = manager.metrics();
    manager.teardown().await;
    info!(
        sent = metrics.messages_sent,
        received = metrics.messages_received,
        simulated = metrics.simulated_events,
        dropped = metrics.dropped_sends,
        "Shutdown complete"
    );
    Ok(())
}
