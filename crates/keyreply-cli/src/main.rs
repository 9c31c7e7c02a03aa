#![deny(unsafe_code)]

//! keyreply CLI: runs the auto-reply daemon and controls it over IPC.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyreply_channel::{LineMessenger, pump};
use keyreply_config::AppConfig;
use keyreply_core::ipc::{IpcClient, IpcState, serve, socket_path_from_config};
use keyreply_core::{Daemon, FileStore};

/// keyreply: keyword-triggered, throttled auto-replies for a chat bot.
#[derive(Parser)]
#[command(name = "keyreply", version = keyreply_core::build_info::VERSION, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "keyreply.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon. Chat client events are read from stdin as JSON
    /// lines; replies are written to stdout.
    Start,

    /// Stop a running daemon.
    Stop,

    /// Show daemon status.
    Status,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Commit the `[reply]` section of a TOML file to the running daemon.
    Apply {
        /// File containing a `[reply]` table.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));
    // A pending stdin read cannot be cancelled; don't wait on it.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config_or_default(&cli.config).await;

    // stdout carries replies in `start`, so logs always go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config))),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start => cmd_start(&cli.config).await,
        Commands::Stop => cmd_stop(&config).await,
        Commands::Status => cmd_status(&config).await,
        Commands::Config { show } => cmd_config(&cli.config, show).await,
        Commands::Apply { file } => cmd_apply(&config, &file).await,
    }
}

/// `-v` overrides the configured level; `RUST_LOG` overrides both.
fn log_filter(verbose: u8, config: &AppConfig) -> String {
    match verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

async fn cmd_start(config_path: &Path) -> Result<()> {
    let store = Arc::new(FileStore::new(config_path));
    let messenger = Arc::new(LineMessenger::new(tokio::io::stdout()));
    let daemon = Arc::new(Daemon::bootstrap(store, messenger).await?);
    let shutdown = daemon.shutdown_token();
    info!(config = %config_path.display(), version = %keyreply_core::build_info::version_string(), "Starting keyreply daemon");

    let ipc = {
        let socket_path = socket_path_from_config(daemon.settings());
        let state = IpcState::new(Arc::clone(&daemon));
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(&socket_path, state, shutdown).await {
                warn!(path = %socket_path.display(), error = %e, "IPC server failed");
            }
        })
    };

    let printer = {
        let mut feed = daemon.subscribe();
        tokio::spawn(async move {
            while let Some(line) = feed.recv().await {
                eprintln!("{line}");
            }
        })
    };

    {
        let daemon = Arc::clone(&daemon);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, initiating graceful shutdown");
                daemon.shutdown();
            }
        });
    }

    let (events_tx, events_rx) = mpsc::channel(256);
    let channel = tokio::spawn(pump(
        BufReader::new(tokio::io::stdin()),
        events_tx,
        shutdown.clone(),
    ));

    let result = daemon.run(events_rx).await;

    if let Ok(Err(e)) = channel.await {
        warn!(error = %e, "Chat client channel ended with an error");
    }
    ipc.await.ok();
    printer.await.ok();

    result?;
    info!("keyreply daemon stopped");
    Ok(())
}

async fn cmd_stop(config: &AppConfig) -> Result<()> {
    let client = IpcClient::new(socket_path_from_config(config));
    let resp = client.stop().await?;
    println!("{}", resp.message);
    Ok(())
}

async fn cmd_status(config: &AppConfig) -> Result<()> {
    let client = IpcClient::new(socket_path_from_config(config));
    let status = client.status().await?;

    println!("keyreply {} ({})", status.version, status.git_hash);
    println!("  running:         {}", status.running);
    println!("  pid:             {}", status.pid);
    println!("  uptime:          {}s", status.uptime_secs);
    println!("  config version:  {}", status.config_version);
    println!("  target:          {}", status.target);
    println!("  interval:        {}", status.interval);
    println!("  tomorrow reset:  {}", status.tomorrow_reset);
    println!("  contacts:        {}", status.contacts);
    println!("  keywords:        {}", status.keywords);
    println!("  reply count:     {}", status.reply_count);
    println!("  last event:      {}", status.last_event_time);
    println!("  feed subscribers: {}", status.subscribers);
    Ok(())
}

async fn cmd_config(config_path: &Path, show: bool) -> Result<()> {
    let config = if config_path.exists() {
        AppConfig::load(config_path)
            .await
            .with_context(|| format!("invalid configuration at '{}'", config_path.display()))?
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    if show {
        println!("{}", config.to_toml()?);
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

async fn cmd_apply(config: &AppConfig, file: &Path) -> Result<()> {
    let settings = AppConfig::load(file)
        .await
        .with_context(|| format!("failed to read reply settings from '{}'", file.display()))?;

    let client = IpcClient::new(socket_path_from_config(config));
    let commit = client.apply_reply(&settings.reply).await?;
    println!(
        "Committed version {} ({} contacts, {} keywords)",
        commit.version, commit.contacts, commit.keywords
    );
    Ok(())
}

/// Best-effort config for logging and socket lookup: a missing or broken
/// file yields defaults (the daemon reports the problem itself on start).
async fn load_config_or_default(path: &Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    match AppConfig::load(path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: ignoring '{}': {e}", path.display());
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["keyreply", "-c", "bot.toml", "-vv", "apply", "reply.toml"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("bot.toml"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Apply { file } if file == PathBuf::from("reply.toml")));
    }

    #[test]
    fn test_parse_config_show_default_path() {
        let cli = Cli::try_parse_from(["keyreply", "config", "--show"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("keyreply.toml"));
        assert!(matches!(cli.command, Commands::Config { show: true }));
    }

    #[test]
    fn test_log_filter_precedence() {
        let mut config = AppConfig::default();
        config.logging.level = "warn".to_string();
        assert_eq!(log_filter(0, &config), "warn");
        assert_eq!(log_filter(1, &config), "debug");
        assert_eq!(log_filter(3, &config), "trace");
    }

    #[tokio::test]
    async fn test_load_config_or_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let defaults = load_config_or_default(&missing).await;
        assert_eq!(defaults.reply, AppConfig::default().reply);
        assert_eq!(defaults.logging.level, "info");

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[logging]\nlevel = \"loud\"\n").unwrap();
        assert_eq!(load_config_or_default(&broken).await.logging.level, "info");

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(load_config_or_default(&good).await.logging.level, "debug");
    }
}
