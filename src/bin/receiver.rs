//! Voice Receiver
//!
//! Listens for voice packets on a UDP port and plays them on the output
//! device until Enter or Ctrl-C.

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

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <listen_port>", args.first().map_or("receiver", String::as_str));
        std::process::exit(1);
    }
    let listen_port: u16 = args[1]
        .parse()
        .with_context(|| format!("invalid port '{}'", args[1]))?;

    tracing::info!("Starting voice receiver");

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("\n=== Available Output Devices ===");
    for device in list_devices().iter().filter(|d| d.is_output) {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}", device.name, default_marker);
    }
    println!();

    let mut pipeline = Pipeline::start(&config, Mode::Receiver { listen_port })
        .context("failed to start receiver")?;

    println!("Receiving on port {}. Press Enter to stop.", listen_port);
    wait_for_stop(&pipeline, config.stats_interval()).await;

    pipeline.stop().context("failed to stop receiver")?;
    tracing::info!("Final stats: {}", pipeline.stats());

    Ok(())
}
