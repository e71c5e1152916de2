#![forbid(unsafe_code)]

//! `checkpoint-relay` — human-in-the-loop conversation server binary.
//!
//! Loads configuration, connects the rendezvous backend, wires the agent
//! capability, checkpoint gate and webhook notifier together, and serves
//! the inbound API until ctrl-c or SIGTERM.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use checkpoint_relay::config::{GlobalConfig, RendezvousBackend};
use checkpoint_relay::driver::{AgentCapability, ProcessAgent, ProcessAgentConfig};
use checkpoint_relay::gate::{BlockingGate, CheckpointGate, RespawnGate};
use checkpoint_relay::inbound::{serve_http, InboundRouter};
use checkpoint_relay::notify::{EventSink, WebhookNotifier};
use checkpoint_relay::orchestrator::{ActiveConversations, ConversationOrchestrator};
use checkpoint_relay::persistence::{db, retention};
use checkpoint_relay::rendezvous::{MemoryRendezvous, Rendezvous, SqliteRendezvous};
use checkpoint_relay::strategy::CheckpointStrategy;
use checkpoint_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "checkpoint-relay", about = "Human-in-the-loop agent conversation server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the agent working directory.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Override the checkpoint strategy.
    #[arg(long, value_enum)]
    strategy: Option<CheckpointStrategy>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("checkpoint-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(workspace) = args.workspace {
        config.workspace_dir = workspace;
    }
    if let Some(strategy) = args.strategy {
        config.checkpoint_strategy = strategy;
    }
    config.load_credentials().await?;
    info!(
        strategy = config.checkpoint_strategy.as_str(),
        idle_seconds = config.timeouts.idle_seconds,
        hard_limit_seconds = config.timeouts.hard_limit_seconds,
        "configuration loaded"
    );

    let ct = CancellationToken::new();

    // ── Rendezvous backend ──────────────────────────────
    let (rendezvous, retention_handle) = match config.rendezvous.backend {
        RendezvousBackend::Memory => {
            let memory: Arc<dyn Rendezvous> = Arc::new(MemoryRendezvous::new());
            (memory, None)
        }
        RendezvousBackend::Sqlite => {
            let path = config
                .rendezvous
                .db_path
                .clone()
                .ok_or_else(|| AppError::Config("sqlite backend requires db_path".into()))?;
            let pool = Arc::new(db::connect(&path).await?);
            info!(path = %path.display(), "rendezvous database connected");
            let handle = retention::spawn_retention_task(
                Arc::clone(&pool),
                config.rendezvous.retention_hours,
                ct.clone(),
            );
            let sqlite: Arc<dyn Rendezvous> =
                Arc::new(SqliteRendezvous::new(pool, config.poll_interval()));
            (sqlite, Some(handle))
        }
    };

    // ── Collaborators ───────────────────────────────────
    let sink: Arc<dyn EventSink> = Arc::new(WebhookNotifier::new(
        config.webhook_secret.clone(),
        config.notification_timeout(),
    )?);
    let gate: Arc<dyn CheckpointGate> = match config.checkpoint_strategy {
        CheckpointStrategy::Blocking => Arc::new(BlockingGate::new(
            Arc::clone(&rendezvous),
            Arc::clone(&sink),
        )),
        CheckpointStrategy::Respawn => Arc::new(RespawnGate::new(Arc::clone(&sink))),
    };
    let agent: Arc<dyn AgentCapability> = Arc::new(ProcessAgent::new(ProcessAgentConfig {
        host_cli: config.host_cli.clone(),
        host_cli_args: config.host_cli_args.clone(),
    }));
    let orchestrator = Arc::new(
        ConversationOrchestrator::new(
            Arc::new(config.orchestrator_config()),
            agent,
            gate,
            Arc::clone(&rendezvous),
            sink,
        )
        .with_shutdown(ct.clone()),
    );

    let active = ActiveConversations::new();
    let router = Arc::new(InboundRouter::new(
        config.checkpoint_strategy,
        rendezvous,
        orchestrator,
        active.clone(),
    ));

    // ── Serve ───────────────────────────────────────────
    let host: IpAddr = config
        .bind_host
        .parse()
        .map_err(|err| AppError::Config(format!("invalid bind_host: {err}")))?;
    let bind = SocketAddr::new(host, config.http_port);

    let http_ct = ct.clone();
    let http_router = Arc::clone(&router);
    let http_handle = tokio::spawn(async move {
        if let Err(err) = serve_http(http_router, bind, http_ct).await {
            error!(%err, "http server failed");
        }
    });

    info!("checkpoint-relay ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!(in_flight = active.len(), "shutdown signal received");
    ct.cancel();

    let _ = http_handle.await;

    // Cancelled runs still send `failed` and release their channel.
    let runs = router.runs();
    runs.close();
    let grace = config.notification_timeout() + Duration::from_secs(5);
    if tokio::time::timeout(grace, runs.wait()).await.is_err() {
        warn!(remaining = runs.len(), "conversations still running at exit");
    }
    if let Some(handle) = retention_handle {
        let _ = handle.await;
    }
    info!("checkpoint-relay shut down");

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

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

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
