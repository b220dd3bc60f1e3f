//! Loopback demo
//!
//! Runs capture → encode → decode → playback in one process so the codec
//! and device setup can be checked without a second machine.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_voice_link::{
    audio::device::list_devices,
    config::AppConfig,
    pipeline::{wait_for_stop, Mode, Pipeline},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if std::env::args().len() != 1 {
        eprintln!("Usage: loopback");
        std::process::exit(1);
    }

    tracing::info!("Starting loopback");

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("\n=== Available Devices ===");
    for device in list_devices() {
        let direction = match (device.is_input, device.is_output) {
            (true, true) => "in/out",
            (true, false) => "in",
            _ => "out",
        };
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {} ({}){}", device.name, direction, default_marker);
    }
    println!();

    let mut pipeline = Pipeline::start(&config, Mode::Loopback).context("failed to start loopback")?;

    println!("Speak into the microphone. Press Enter to stop.");
    wait_for_stop(&pipeline, config.stats_interval()).await;

    pipeline.stop().context("failed to stop loopback")?;
    tracing::info!("Final stats: {}", pipeline.stats());

    Ok(())
}
