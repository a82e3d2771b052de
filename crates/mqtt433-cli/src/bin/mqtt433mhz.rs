//! MQTT to 433 MHz bridge daemon.

use anyhow::Result;
use clap::Parser;
use mqtt433_cli::{init_logging, open_config, shutdown_flag, DaemonArgs};
use mqtt433_devices::{run_bridge, BRIDGE_SCHEMA, CONFIG_FILE};
use tracing::info;

/// 433 MHz to MQTT translator.
#[derive(Parser, Debug)]
#[command(name = "mqtt433mhz")]
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
    let store = open_config(&path, BRIDGE_SCHEMA)?;
    info!("mqtt433mhz {} using {}", mqtt433_core::VERSION, path.display());

    let running = shutdown_flag();
    run_bridge(store.tree(), running).await?;
    Ok(())
}
