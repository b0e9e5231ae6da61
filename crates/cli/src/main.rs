//! Buildwatch CLI - debounced build watcher daemon
//!
//! This binary runs the daemon in the foreground (`serve`) and drives its
//! control surface as a client (`add`, `hello`, `stop`).

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod client;

use anyhow::{Context, Result};
use buildwatch_core::{find_project_root, DaemonConfig, Notifier, NotifyBackend, ProjectConfig};
use buildwatch_runner::ShellBuildRunner;
use buildwatch_server::{DesktopNotifier, LogNotifier};
use clap::{Parser, Subcommand};
use client::ControlClient;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "buildwatch")]
#[command(about = "Watches projects and rebuilds them when they change")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground
    Serve,
    /// Register the enclosing project with the daemon
    Add {
        /// Directory to search upward from (defaults to the current directory)
        path: Option<PathBuf>,
    },
    /// Check that the daemon is alive
    Hello,
    /// Shut the daemon down
    Stop,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = DaemonConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Add { path } => add(config, path).await,
        Commands::Hello => hello(config).await,
        Commands::Stop => stop(config).await,
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = [
        "buildwatch",
        "buildwatch_core",
        "buildwatch_watcher",
        "buildwatch_runner",
        "buildwatch_server",
    ]
    .map(|krate| format!("{krate}={level}"))
    .join(",");

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Run the daemon until a shutdown call or Ctrl-C
async fn serve(config: DaemonConfig) -> Result<()> {
    let runner = Arc::new(ShellBuildRunner::new());
    let notifier: Arc<dyn Notifier> = match config.notifications {
        NotifyBackend::Desktop => Arc::new(DesktopNotifier::new()),
        NotifyBackend::Log => Arc::new(LogNotifier::new()),
    };

    buildwatch_server::run_server(config, runner, notifier).await?;
    Ok(())
}

/// Locate the enclosing project and register it with the daemon
async fn add(config: DaemonConfig, path: Option<PathBuf>) -> Result<()> {
    let start = match path {
        Some(path) => path,
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let root = find_project_root(&start)?;
    let project_config = ProjectConfig::load(&root).with_context(|| {
        format!(
            "A watched project needs a {} file in its root",
            buildwatch_core::PROJECT_CONFIG_FILENAME
        )
    })?;

    let client = ControlClient::new(&config);
    let name = client.add_project(&root, &project_config).await?;
    println!("Watching {name} ({})", root.display());
    Ok(())
}

/// Probe the daemon
async fn hello(config: DaemonConfig) -> Result<()> {
    let client = ControlClient::new(&config);
    let reply = client.hello().await?;
    println!("{reply}");
    Ok(())
}

/// Ask the daemon to shut down
async fn stop(config: DaemonConfig) -> Result<()> {
    let client = ControlClient::new(&config);
    client.shutdown().await?;
    println!("Daemon stopped");
    Ok(())
}
