//! HTTP server setup and routing

use crate::db::PlaybackStore;
use crate::error::Result;
use crate::playback::PlaybackEngine;
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: PlaybackEngine,
    pub state: Arc<SharedState>,
    pub store: Arc<dyn PlaybackStore>,
}

/// Build the router with all routes attached
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))

        // Transport
        .route("/playback/state", get(super::handlers::get_state))
        .route("/playback/load", post(super::handlers::load_playlist))
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/pause", post(super::handlers::pause))
        .route("/playback/toggle", post(super::handlers::toggle_play))
        .route("/playback/next", post(super::handlers::next))
        .route("/playback/previous", post(super::handlers::previous))
        .route("/playback/seek", post(super::handlers::seek))
        .route("/playback/rate", post(super::handlers::set_rate))
        .route("/playback/mode", post(super::handlers::set_mode))

        // Playlist
        .route("/playback/insert-next", post(super::handlers::insert_next))
        .route("/playback/play-index", post(super::handlers::play_index))
        .route("/playback/playlist/clear", post(super::handlers::clear_playlist))
        .route("/playback/playlist/:index", delete(super::handlers::remove_at))
        .route("/playback/history", get(super::handlers::get_history))

        // Recommendation sub-modes
        .route("/playback/heartbeat", post(super::handlers::set_heartbeat))
        .route("/playback/personal-radio", post(super::handlers::set_personal_radio))
        .route("/playback/radio/trash", post(super::handlers::trash_radio_song))

        // Volume
        .route("/audio/volume", post(super::handlers::set_volume))
        .route("/audio/volume/adjust", post(super::handlers::adjust_volume))
        .route("/audio/mute", post(super::handlers::toggle_mute))

        // Lyrics
        .route("/lyrics/offset", post(super::handlers::set_lyric_offset))
        .route("/lyrics/karaoke", post(super::handlers::set_karaoke_lyrics))

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown` resolves
pub async fn run<F>(port: u16, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
