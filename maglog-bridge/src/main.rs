use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use maglog_bridge::{Config, LogIndicator, Relay};
use maglog_link::{RadioLink, RadioSettings, SerialLink};

#[derive(Parser)]
#[command(name = "maglog-bridge")]
#[command(about = "Maglog base-node bridge")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "maglog-bridge.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "maglog_bridge=info,maglog_link=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        serial = %config.serial.device,
        radio = %config.radio.device,
        channel = config.radio.channel,
        "Starting maglog-bridge"
    );

    let serial = SerialLink::new(&config.serial.device, config.serial.baud);
    let radio = RadioLink::new(RadioSettings::new(
        &config.radio.device,
        config.radio.baud,
        config.radio.channel,
    ));

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            cancel_for_signal.cancel();
        }
    });

    let mut relay = Relay::new(radio, serial, LogIndicator);
    relay.run(cancel).await?;

    info!("maglog-bridge shut down complete");
    Ok(())
}
