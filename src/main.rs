#![forbid(unsafe_code)]

//! `acp-gateway` — agent client protocol gateway binary.
//!
//! Bootstraps configuration, the session registry with its expiry sweep,
//! the tool registry, and one transport (stdio or WebSocket).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use acp_gateway::agent::LoopbackRuntime;
use acp_gateway::config::GatewayConfig;
use acp_gateway::protocol::GatewayMethods;
use acp_gateway::session::{spawn_sweep_task, SessionManager};
use acp_gateway::tools::ToolRegistry;
use acp_gateway::transport::{run_stdio, run_ws};
use acp_gateway::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Transport {
    Stdio,
    Websocket,
}

#[derive(Debug, Parser)]
#[command(name = "acp-gateway", about = "Agent client protocol gateway", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transport to serve.
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the default session working directory.
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("acp-gateway bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => GatewayConfig::load_from_path(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(ws) = args.workspace {
        let canonical = ws
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid workspace override: {err}")))?;
        config.working_directory = canonical;
    }

    let config = Arc::new(config);
    info!(
        max_sessions = config.max_sessions,
        default_model = %config.default_model,
        "configuration loaded"
    );

    // ── Build shared state ──────────────────────────────
    let sessions = Arc::new(SessionManager::new(
        config.max_sessions,
        config.session_timeout(),
    ));
    let tools = Arc::new(ToolRegistry::with_builtin_tools(
        config.legacy_error_heuristic,
    ));
    let runtime = Arc::new(LoopbackRuntime::new());
    let methods = Arc::new(GatewayMethods::new(
        Arc::clone(&config),
        Arc::clone(&sessions),
        tools,
        runtime,
    ));

    // ── Start expiry sweep ──────────────────────────────
    let ct = CancellationToken::new();
    let sweep_handle = spawn_sweep_task(Arc::clone(&sessions), config.sweep_interval(), ct.clone());

    // ── Start transport ─────────────────────────────────
    let transport_ct = ct.clone();
    let mut transport_handle = match args.transport {
        Transport::Stdio => tokio::spawn(async move {
            if let Err(err) = run_stdio(methods, transport_ct).await {
                error!(%err, "stdio transport failed");
            }
        }),
        Transport::Websocket => {
            let host = config.http_host.clone();
            let port = config.http_port;
            tokio::spawn(async move {
                if let Err(err) = run_ws(methods, &host, port, transport_ct).await {
                    error!(%err, "websocket transport failed");
                }
            })
        }
    };

    info!("acp-gateway ready");

    // ── Wait for shutdown or transport exit ─────────────
    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received");
            ct.cancel();
            let _ = transport_handle.await;
        }
        _ = &mut transport_handle => {
            info!("transport stopped");
            ct.cancel();
        }
    }

    let _ = sweep_handle.await;
    info!("acp-gateway shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

/// Logs go to stderr: the stdio transport owns stdout for frames.
fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
