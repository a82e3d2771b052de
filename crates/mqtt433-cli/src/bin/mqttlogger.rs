//! MQTT topic logger daemon.

use anyhow::Result;
use clap::Parser;
use mqtt433_cli::{init_logging, open_config, shutdown_flag, DaemonArgs};
use mqtt433_logger::{run_logger, CONFIG_FILE, LOGGER_SCHEMA};
use tracing::info;

/// Logging of MQTT traffic.
#[derive(Parser, Debug)]
#[command(name = "mqttlogger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    daemon: DaemonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.daemon.debug);

    let path = cli.daemon.config_path(CONFIG_FILE);
    let store = open_config(&path, LOGGER_SCHEMA)?;
    info!("mqttlogger {} using {}", mqtt433_core::VERSION, path.display());

    let running = shutdown_flag();
    run_logger(store.tree(), running).await?;
    Ok(())
}
