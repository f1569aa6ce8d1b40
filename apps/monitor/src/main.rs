//! Replay a call-signal scenario and print every status delivery.
//!
//! Run with: cargo run -p calldetect-monitor -- [scenario.json]

mod scenario;

use anyhow::Context;
use calldetect_core::{bus_callback, new_callback, CallDetector, DetectorConfig};
use calldetect_events::{event_names, InMemoryEventBus};
use scenario::Scenario;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,calldetect=debug")),
        )
        .init();

    let scenario = match std::env::args_os().nth(1) {
        Some(path) => Scenario::load(&PathBuf::from(path))?,
        None => Scenario::incoming_call(),
    };
    let config = DetectorConfig::from_env().context("invalid CALLDETECT_* configuration")?;

    tracing::info!(
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        capabilities = ?scenario.capabilities,
        "starting monitor"
    );

    let platform = Arc::new(scenario.platform());
    let detector = CallDetector::new(platform.clone(), config)?;
    let bus = Arc::new(InMemoryEventBus::new());
    let publish = bus_callback(bus.clone());

    detector
        .start(new_callback(move |in_call| {
            println!(
                "[{}] in call: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                if in_call { "yes" } else { "no" }
            );
            publish(in_call);
        }))
        .await?;

    scenario.play(&platform, &detector).await?;
    detector.stop().await;

    let events = bus.events_for(event_names::CALL_STATUS_CHANGED);
    println!("\n{} deliveries:", events.len());
    for event in events {
        println!("{}", serde_json::to_string(&event.payload)?);
    }
    Ok(())
}
