use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use maglog_link::SerialLink;
use maglog_station::{Config, Engine, EventLogger, SheetClient};

#[derive(Parser)]
#[command(name = "maglog-station")]
#[command(about = "Maglog desktop collector")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "maglog-station.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the bridge with the system time
    Init {
        /// Seconds to wait for the acknowledgement
        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
    },
    /// Wait for counter data and files
    Listen,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "maglog_station=info,maglog_link=info".to_owned());
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
        data_dir = %config.data.dir.display(),
        "Starting maglog-station"
    );

    let link = SerialLink::new(&config.serial.device, config.serial.baud);
    let sheets = config.sheets.endpoint.as_deref().map(SheetClient::new);
    let logger = EventLogger::new(&config.data.dir, sheets)?;
    let mut engine = Engine::new(link, logger);

    engine.init().await?;

    match cli.command {
        Command::Init { timeout_secs } => {
            let acknowledged = engine
                .send_time(Duration::from_secs(timeout_secs))
                .await?;
            if !acknowledged {
                return Err(color_eyre::eyre::eyre!(
                    "bridge did not acknowledge the time reference"
                ));
            }
        }
        Command::Listen => {
            let cancel = CancellationToken::new();
            let cancel_for_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down...");
                    cancel_for_signal.cancel();
                }
            });
            engine.listen(cancel).await?;
        }
    }

    info!("maglog-station shut down complete");
    Ok(())
}
