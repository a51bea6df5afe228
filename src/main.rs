//! Campus Kiosk - Grounded question-answering pipeline for information kiosks.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use campus_kiosk::cache::ResponseCache;
use campus_kiosk::config::{load_config, KioskConfig};
use campus_kiosk::coordinator::Coordinator;
use campus_kiosk::display;
use campus_kiosk::hub::FanoutHub;
use campus_kiosk::inference::{InferenceProvider, OllamaClient};
use campus_kiosk::knowledge::{KnowledgeSnapshot, MemoryKnowledgeStore};
use campus_kiosk::retention::RetentionScheduler;
use campus_kiosk::server::{AppState, KioskServer};
use campus_kiosk::storage::{default_store_path, QueryLog};

#[derive(Parser)]
#[command(
    name = "campus-kiosk",
    about = "Grounded question-answering pipeline for campus information kiosks",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kiosk server.
    Serve {
        /// Override the bind host.
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port.
        #[arg(long)]
        port: Option<u16>,
        /// JSON file with knowledge records to serve (faqs, people,
        /// facilities, events).
        #[arg(long)]
        knowledge: Option<PathBuf>,
    },
    /// Run one retention cleanup pass and exit.
    Cleanup,
    /// Probe the inference service and exit.
    Check,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve {
            host,
            port,
            knowledge,
        } => serve(config, host, port, knowledge).await,
        Commands::Cleanup => cleanup(config).await,
        Commands::Check => check(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(
    mut config: KioskConfig,
    host: Option<String>,
    port: Option<u16>,
    knowledge_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let database = config
        .database_path
        .clone()
        .unwrap_or_else(default_store_path);
    let log = QueryLog::open(&database).await?;

    let knowledge = Arc::new(MemoryKnowledgeStore::new());
    if let Some(path) = knowledge_file {
        let contents = tokio::fs::read_to_string(&path).await?;
        let snapshot: KnowledgeSnapshot = serde_json::from_str(&contents)?;
        knowledge.replace(snapshot).await;
    }
    let (faqs, people, facilities, events) = knowledge.counts().await;

    let provider: Arc<dyn InferenceProvider> = Arc::new(OllamaClient::new(
        &config.inference.base_url,
        config.inference.model.clone(),
        Duration::from_secs(config.inference.request_timeout_secs),
    )?);
    if !provider.health_check().await {
        tracing::warn!(
            base_url = %config.inference.base_url,
            "Inference service is not reachable; grounded answers will fail until it is"
        );
    }

    let cache = Arc::new(ResponseCache::new(
        config.cache.capacity,
        Duration::from_secs(config.cache.ttl_secs),
    ));
    let hub = Arc::new(FanoutHub::new());
    let coordinator = Coordinator::new(
        knowledge.clone(),
        provider.clone(),
        cache.clone(),
        hub.clone(),
        log.clone(),
    );

    let cancel = CancellationToken::new();
    let scheduler = RetentionScheduler::new(log.clone(), config.retention.clone());
    let retention_task = scheduler.spawn_daily(cancel.clone());

    display::print_startup(&config, &database);
    display::print_knowledge_counts(faqs, people, facilities, events);

    let state = AppState {
        coordinator,
        hub,
        log,
        knowledge,
        provider,
        cache,
        cancel: cancel.clone(),
    };
    let server = KioskServer::new(state).with_config(config.server.clone());

    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received interrupt, shutting down");
            shutdown_cancel.cancel();
        }
    });

    server.run().await?;
    cancel.cancel();
    let _ = retention_task.await;
    Ok(())
}

async fn cleanup(config: KioskConfig) -> Result<(), Box<dyn std::error::Error>> {
    let database = config
        .database_path
        .clone()
        .unwrap_or_else(default_store_path);
    let log = QueryLog::open(&database).await?;

    let scheduler = RetentionScheduler::new(log, config.retention);
    let counts = scheduler.run_once().await;
    display::print_retention_summary(&counts);
    Ok(())
}

async fn check(config: &KioskConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = OllamaClient::new(
        &config.inference.base_url,
        config.inference.model.clone(),
        Duration::from_secs(config.inference.request_timeout_secs),
    )?;
    let ready = provider.health_check().await;
    display::print_health(
        provider.model_name(),
        &config.inference.base_url,
        ready,
    );
    if ready {
        Ok(())
    } else {
        Err("inference service is not reachable".into())
    }
}
