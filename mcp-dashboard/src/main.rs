//! mcp-dashboard - live dashboard for MCP tool-call logs
//!
//! Tails the logs written by the MCP logging wrapper, keeps running metrics,
//! and serves them over HTTP:
//!
//! - `GET /api/metrics`: current metrics plus a summary
//! - `GET /api/health`: liveness and connected viewer count
//! - `GET /ws`: every parsed event, as JSON, as it happens
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/mcp-dashboard/config.toml (~/.config/mcp-dashboard/config.toml)
//! - Logs: $XDG_STATE_HOME/mcp-dashboard/ (~/.local/state/mcp-dashboard/)

mod server;

use anyhow::{Context, Result};
use clap::Parser;
use mcp_dashboard_core::ingest::{spawn_tailers, Pipeline, TailStats};
use mcp_dashboard_core::{BroadcastHub, Config, MetricsStore};
use server::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "mcp-dashboard")]
#[command(about = "Live metrics over MCP tool-call logs")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/mcp-dashboard/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and MCP_DASHBOARD_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding the MCP log files (overrides config and MCP_DASHBOARD_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the resolved settings and exit without serving
    #[arg(long)]
    dry_run: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            config.apply_env().context("invalid environment override")?;
            config
        }
        None => Config::load().context("failed to load configuration")?,
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = &args.log_dir {
        config.watch.log_dir = Some(dir.clone());
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn print_plan(config: &Config) {
    println!("Listen:  {}:{}", config.server.bind, config.server.port);
    println!("Watch:");
    for path in config.watch.paths() {
        let marker = if path.exists() { "" } else { " (missing)" };
        println!("  {}{}", path.display(), marker);
    }
    println!("Viewer queue: {}", config.viewer.queue_capacity);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.dry_run {
        print_plan(&config);
        return Ok(());
    }

    let _log_guard = mcp_dashboard_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    let pipeline = Pipeline::new(
        Arc::new(MetricsStore::new()),
        BroadcastHub::new(config.viewer.queue_capacity),
    );
    let (stop_tailers, tailer_shutdown) = watch::channel(false);
    let tailers = spawn_tailers(config.watch.paths(), &pipeline, &tailer_shutdown);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("MCP Dashboard listening on http://{}", addr);

    let state = AppState::new(pipeline, config.viewer.clone());
    server::serve(listener, state, shutdown_signal())
        .await
        .context("server error")?;

    stop_tailers.send_replace(true);
    let mut total = TailStats::default();
    for tailer in tailers {
        match tailer.await {
            Ok(Some(stats)) => {
                total.lines_read += stats.lines_read;
                total.events_dispatched += stats.events_dispatched;
                total.errors += stats.errors;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Tailer task failed"),
        }
    }
    tracing::info!(
        lines_read = total.lines_read,
        events = total.events_dispatched,
        errors = total.errors,
        "Shut down"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
