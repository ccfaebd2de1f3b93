//! Aura Daemon - loopback harness for the UAC2 audio function.
//!
//! Registers the audio function on an in-memory device stack, logs the
//! enumerated descriptor and services the function on a fixed tick against a
//! simulated host that echoes audio back.

use std::time::Duration;

use anyhow::Result;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod harness;
mod signals;

use harness::Harness;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::load_config()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("aura_daemon={}", config.daemon.log_level).parse()?)
                .add_directive(format!("aura_function={}", config.daemon.log_level).parse()?)
                .add_directive(format!("aura_stream={}", config.daemon.log_level).parse()?)
                .add_directive(format!("aura_descriptor={}", config.daemon.log_level).parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Aura daemon");
    debug!(?config, "Configuration loaded");

    // Register the function on the loopback device and enumerate
    let mut harness = Harness::new(config.function.clone(), &config.harness)?;
    let blocks = harness.descriptor()?;
    info!(blocks = blocks.len(), "Audio function enumerated");
    info!(descriptor = %serde_json::to_string(&blocks)?, "Decoded configuration descriptor");

    // Set up signal handling
    let mut shutdown_rx = signals::setup_signal_handlers();
    let mut ticker = interval(Duration::from_millis(config.harness.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(tick_ms = config.harness.tick_ms, ticks = ?config.harness.ticks, "Harness running. Press Ctrl+C to exit.");

    // Main service loop
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                harness.tick();
                if config.harness.ticks.is_some_and(|limit| harness.stats().ticks >= limit) {
                    info!("Tick limit reached");
                    break;
                }
            }

            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    let stats = harness.stats();
    info!(stats = %serde_json::to_string(&stats)?, "Aura daemon stopped");
    Ok(())
}
