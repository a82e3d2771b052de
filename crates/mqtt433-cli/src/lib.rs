//! Shared start-up for the mqtt433 daemons.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use mqtt433_core::config::{env_vars, CONFIG_DIR};
use mqtt433_core::{ConfigStore, DocumentSchema};
use tracing::info;

/// Options common to both daemons.
#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
    /// Debug communication.
    #[arg(short, long)]
    pub debug: bool,

    /// Configuration document.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl DaemonArgs {
    /// Configured document path, or `file_name` under `/etc`.
    pub fn config_path(&self, file_name: &str) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join(file_name))
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `debug`.
pub fn init_logging(debug: bool) {
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_level = if debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .init();
    }
}

/// Open the configuration document. A document that is missing and cannot
/// be created is fatal.
pub fn open_config(path: &Path, schema: DocumentSchema) -> Result<ConfigStore> {
    let store = ConfigStore::open(path, schema)
        .with_context(|| format!("Error parsing XML file {}", path.display()))?;
    if !path.is_file() {
        bail!(
            "No XML file found at {}, please run as super user to create one",
            path.display()
        );
    }
    Ok(store)
}

/// Running flag cleared on SIGINT or SIGTERM.
pub fn shutdown_flag() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Terminating ...");
        flag.store(false, Ordering::Relaxed);
    });
    running
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
