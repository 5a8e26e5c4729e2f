// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! tracewatch entry point: watch loop and one-shot commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tracing::{info, warn};

use tracewatch::config::{self, CliOptions, ConfigReloader};
use tracewatch::dispatch::WebhookDispatcher;
use tracewatch::pipeline::EnrichmentPipeline;
use tracewatch::telemetry::{init_telemetry, TelemetryConfig};
use tracewatch::types::{DeliveryPayload, ErrorTrace};
use tracewatch::vcs::{GitCli, VersionControl};
use tracewatch::watcher::LogWatcher;
use tracewatch::VERSION;

/// tracewatch - forward web-server error traces with their git provenance.
#[derive(Parser)]
#[command(name = "tracewatch")]
#[command(author, version, about = "Forward web-server error traces with git provenance", long_about = None)]
struct Cli {
    /// Config file (default: ./tracewatch.json, ./config.json, ~/.tracewatch/config.json)
    #[arg(short, long, global = true, env = "TRACEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log file to tail
    #[arg(long, global = true, env = "TRACEWATCH_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Webhook receiving the traces
    #[arg(long, global = true, env = "TRACEWATCH_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Directory of virtual-host configs
    #[arg(long, global = true, env = "TRACEWATCH_VHOST_DIR")]
    vhost_dir: Option<PathBuf>,

    /// Show debug output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Show trace output (every log line read)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn cli_options(&self) -> CliOptions {
        CliOptions {
            log_file: self.log_file.clone(),
            webhook_url: self.webhook_url.clone(),
            vhost_dir: self.vhost_dir.clone(),
            enabled: None,
        }
    }

    fn config_path(&self) -> anyhow::Result<Option<PathBuf>> {
        let working_dir = std::env::current_dir()?;
        Ok(config::resolve_config_path(self.config.as_deref(), &working_dir))
    }
}

/// Subcommands for tracewatch.
#[derive(Subcommand)]
enum Commands {
    /// Tail the log and deliver traces (default)
    Run,

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Write an example tracewatch.json in the current directory
    Init,

    /// Enrich one trace and print the payload that would be delivered
    Enrich {
        /// Trace text; read from stdin when omitted
        text: Option<String>,
    },

    /// Show version information
    Version,
}

/// Config subcommand actions.
#[derive(Subcommand)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::for_verbosity(cli.verbose, cli.debug);
    let _guard = init_telemetry(&telemetry)?;

    match &cli.command {
        None | Some(Commands::Run) => run(&cli).await,
        Some(Commands::Config { action }) => match action {
            Some(ConfigAction::Show) | None => show_config(&cli),
        },
        Some(Commands::Init) => {
            let working_dir = std::env::current_dir()?;
            let path = config::init_config(&working_dir)?;
            println!("{} Created config file: {}", "✓".green(), path.display());
            Ok(())
        }
        Some(Commands::Enrich { text }) => enrich(&cli, text.clone()).await,
        Some(Commands::Version) => {
            println!("tracewatch {}", VERSION);
            Ok(())
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config_path()?;
    match &path {
        Some(path) => info!(config = %path.display(), "loading config"),
        None => warn!("no config file found; using defaults and CLI flags"),
    }

    let reloader = ConfigReloader::new(path, cli.cli_options()).context("Failed to load config")?;
    let config = reloader.current().clone();
    if !config.enabled {
        warn!("watcher is disabled; traces will be read but not delivered");
    }

    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli::new());
    let pipeline = EnrichmentPipeline::from_config(&config, vcs);
    let dispatcher = Arc::new(WebhookDispatcher::new(config.delivery_timeout())?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let watcher = LogWatcher::new(reloader, pipeline, dispatcher, shutdown_rx);
    let snapshot = watcher.run().await;
    eprintln!("{} {}", "tracewatch stopped:".dimmed(), snapshot.summary());
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM; only Ctrl-C stops the watcher");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn show_config(cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config_path()?;
    let config = config::load_config(path.as_deref(), &cli.cli_options())?;

    match &path {
        Some(path) => eprintln!("{} {}", "Config file:".bright_blue(), path.display()),
        None => eprintln!("{}", "No config file found; showing defaults".yellow()),
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn enrich(cli: &Cli, text: Option<String>) -> anyhow::Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
    let Some(trace) = ErrorTrace::new(lines) else {
        anyhow::bail!("no trace text given");
    };

    let path = cli.config_path()?;
    let config = config::load_config(path.as_deref(), &cli.cli_options())?;
    let vcs: Arc<dyn VersionControl> = Arc::new(GitCli::new());
    let pipeline = EnrichmentPipeline::from_config(&config, vcs);

    let detail = pipeline.enrich(&trace).await;
    if detail.is_none() {
        eprintln!("{}", "No `in <file> on line <N>` reference found".yellow());
    }
    let payload = DeliveryPayload::new(&trace, detail);
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
