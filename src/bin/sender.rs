//! Voice Sender
//!
//! Captures the input device, encodes 20 ms frames and sends them to a
//! receiver until Enter or Ctrl-C.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_voice_link::{
    audio::device::list_devices,
    config::AppConfig,
    network::resolve_target,
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
    if args.len() != 3 {
        eprintln!("Usage: {} <server_ip> <port>", args.first().map_or("sender", String::as_str));
        std::process::exit(1);
    }
    let port: u16 = args[2]
        .parse()
        .with_context(|| format!("invalid port '{}'", args[2]))?;
    let target = resolve_target(&args[1], port).context("invalid receiver address")?;

    tracing::info!("Starting voice sender");

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("\n=== Available Input Devices ===");
    for device in list_devices().iter().filter(|d| d.is_input) {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}", device.name, default_marker);
    }
    println!();

    let mut pipeline =
        Pipeline::start(&config, Mode::Sender { target }).context("failed to start sender")?;

    println!("Sending to {}. Press Enter to stop.", target);
    wait_for_stop(&pipeline, config.stats_interval()).await;

    pipeline.stop().context("failed to stop sender")?;
    tracing::info!("Final stats: {}", pipeline.stats());

    Ok(())
}
