use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::demo::demo_app;
use crate::config::{AppConfig, Config, Configer};
use crate::logging::{self, LogConfig};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};

/// Command-line interface of the `strip` binary.
#[derive(Parser)]
#[command(name = "strip")]
#[command(about = "strip HTTP toolkit", long_about = None, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo application
    Serve {
        /// Address and port to bind to; overrides the config
        #[arg(long)]
        addr: Option<String>,

        /// TOML configuration file
        #[arg(short, long, env = "STRIP_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the demo route table
    Routes,
}

/// Parse the command line and run it.
///
/// # Errors
///
/// Config loading, route configuration, or binding the listener.
pub fn run_cli() -> Result<()> {
    run(Cli::parse())
}

pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { addr, config } => serve(addr, config),
        Commands::Routes => {
            let app = demo_app(None)?;
            for (method, template) in app.table().routes() {
                println!("{method:<8} {template}");
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Option<Arc<dyn Configer>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let config: Arc<dyn Configer> = Arc::new(Config::from_file(&path)?);
    Ok(Some(config))
}

fn serve(addr: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    let run_mode = config
        .as_deref()
        .map(AppConfig::from_configer)
        .unwrap_or_default()
        .run_mode;
    logging::init(&LogConfig::for_run_mode(run_mode).overlay_env())?;
    let runtime = RuntimeConfig::from_env();
    runtime.apply();

    let app = demo_app(config)?;
    let addr = addr.unwrap_or_else(|| app.config().listen_addr());

    let service = app.build();
    let handle = HttpServer(AppService::new(service))
        .start(addr.as_str())
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        addr = %handle.addr(),
        stack_size = runtime.stack_size,
        workers = runtime.workers,
        "strip serving"
    );

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGTERM, SIGINT]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
