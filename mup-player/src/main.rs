//! MuPlayer playback service - main entry point

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mup_common::config::TomlConfig;
use mup_player::api::{self, AppContext};
use mup_player::audio::DeviceBackend;
use mup_player::db::{self, settings::load_engine_settings, PlaybackStore, SqliteStore};
use mup_player::gateway::HttpGateway;
use mup_player::playback::{EngineCommand, EngineContext, PlaybackEngine};
use mup_player::SharedState;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mup-player
#[derive(Parser, Debug)]
#[command(name = "mup-player")]
#[command(about = "MuPlayer playback service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "MUP_PORT")]
    port: Option<u16>,

    /// Bootstrap config file
    #[arg(short, long, env = "MUP_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(short, long, env = "MUP_DATABASE")]
    database: Option<PathBuf>,

    /// Base URL of the music API
    #[arg(long, env = "MUP_API_BASE_URL")]
    api_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref());

    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mup_player={level},mup_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = args.port.unwrap_or(config.port);
    let database = args.database.unwrap_or_else(|| config.database_path_or_default());
    let api_base_url = args.api_base_url.unwrap_or_else(|| config.api_base_url.clone());

    info!("Starting MuPlayer playback service on port {}", port);
    info!("Database: {}", database.display());
    info!("Music API: {}", api_base_url);

    let pool = db::connect(&database)
        .await
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    let settings = load_engine_settings(&pool)
        .await
        .context("Failed to load engine settings")?;
    let store: Arc<dyn PlaybackStore> = Arc::new(SqliteStore::new(pool));

    let gateway = Arc::new(HttpGateway::new(api_base_url).context("Failed to build API client")?);
    let audio_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("Failed to build audio client")?;

    let ctx = EngineContext {
        backend: Arc::new(DeviceBackend::new(audio_client)),
        streams: gateway.clone(),
        lyrics: gateway.clone(),
        recommendations: gateway,
        store: Arc::clone(&store),
        settings,
    };
    let state = Arc::new(SharedState::new());
    let engine = PlaybackEngine::spawn(ctx, Arc::clone(&state));
    info!("Playback engine initialized");

    match store.load_session().await {
        Ok(Some(session)) => {
            info!("Restoring session: {} songs", session.playlist.len());
            if let Err(e) = engine.execute(EngineCommand::Restore(session)).await {
                warn!("Failed to restore session: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Failed to read saved session: {}", e),
    }

    let app = AppContext {
        engine: engine.clone(),
        state,
        store,
    };
    api::run(port, app, shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(e) = engine.shutdown().await {
        error!("Engine shutdown failed: {}", e);
    }
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
