//! HTTP request handlers
//!
//! Every mutating endpoint forwards one `EngineCommand` and answers
//! `{"status": "ok"}`; engine errors are mapped to status codes by `ApiError`.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playback::{EngineCommand, VolumeStep};
use crate::state::EngineSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mup_common::models::{PlayMode, Song, SongId};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    songs: Vec<Song>,
    #[serde(default)]
    start: Option<SongId>,
    #[serde(default)]
    playlist_id: Option<String>,
    #[serde(default = "default_true")]
    play: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    /// Seconds
    position: f64,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    rate: f32,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: f32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustVolumeRequest {
    step: VolumeStep,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    /// Omitted to cycle
    #[serde(default)]
    mode: Option<PlayMode>,
}

#[derive(Debug, Deserialize)]
pub struct InsertNextRequest {
    song: Song,
    #[serde(default)]
    play: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlayIndexRequest {
    index: usize,
    #[serde(default = "default_true")]
    play: bool,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct TrashRequest {
    song_id: SongId,
}

#[derive(Debug, Deserialize)]
pub struct LyricOffsetRequest {
    /// Seconds
    offset: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    songs: Vec<Song>,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Engine error carried to the HTTP boundary
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

/// Status code for an engine error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::EmptyPlaylist | Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        let body = ErrorResponse {
            status: "error".to_string(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn run(ctx: &AppContext, command: EngineCommand) -> ApiResult<StatusResponse> {
    ctx.engine.execute(command).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

// ============================================================================
// Health and reads
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "mup-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /playback/state - snapshot taken inside the engine
pub async fn get_state(State(ctx): State<AppContext>) -> ApiResult<EngineSnapshot> {
    Ok(Json(ctx.engine.snapshot().await?))
}

/// GET /playback/history - most recent first
pub async fn get_history(State(ctx): State<AppContext>) -> ApiResult<HistoryResponse> {
    let songs = ctx.store.history().await?;
    Ok(Json(HistoryResponse { songs }))
}

// ============================================================================
// Transport
// ============================================================================

/// POST /playback/load
pub async fn load_playlist(
    State(ctx): State<AppContext>,
    Json(req): Json<LoadRequest>,
) -> ApiResult<StatusResponse> {
    info!("Load playlist: {} songs", req.songs.len());
    run(
        &ctx,
        EngineCommand::LoadPlaylist {
            songs: req.songs,
            start: req.start,
            playlist_id: req.playlist_id,
            play: req.play,
        },
    )
    .await
}

/// POST /playback/play
pub async fn play(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::Play).await
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::Pause).await
}

/// POST /playback/toggle
pub async fn toggle_play(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::TogglePlay).await
}

/// POST /playback/next
pub async fn next(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::Next).await
}

/// POST /playback/previous
pub async fn previous(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::Prev).await
}

/// POST /playback/seek
pub async fn seek(State(ctx): State<AppContext>, Json(req): Json<SeekRequest>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::Seek(req.position)).await
}

/// POST /playback/rate
pub async fn set_rate(State(ctx): State<AppContext>, Json(req): Json<RateRequest>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetRate(req.rate)).await
}

/// POST /playback/mode
pub async fn set_mode(State(ctx): State<AppContext>, Json(req): Json<ModeRequest>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetMode(req.mode)).await
}

// ============================================================================
// Playlist
// ============================================================================

/// POST /playback/insert-next
pub async fn insert_next(
    State(ctx): State<AppContext>,
    Json(req): Json<InsertNextRequest>,
) -> ApiResult<StatusResponse> {
    run(
        &ctx,
        EngineCommand::InsertNext {
            song: req.song,
            play: req.play,
        },
    )
    .await
}

/// POST /playback/play-index
pub async fn play_index(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayIndexRequest>,
) -> ApiResult<StatusResponse> {
    run(
        &ctx,
        EngineCommand::PlayIndex {
            index: req.index,
            play: req.play,
        },
    )
    .await
}

/// DELETE /playback/playlist/:index
pub async fn remove_at(State(ctx): State<AppContext>, Path(index): Path<usize>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::RemoveAt(index)).await
}

/// POST /playback/playlist/clear
pub async fn clear_playlist(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::ClearPlaylist).await
}

// ============================================================================
// Recommendation sub-modes
// ============================================================================

/// POST /playback/heartbeat
pub async fn set_heartbeat(
    State(ctx): State<AppContext>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetHeartbeat(req.enabled)).await
}

/// POST /playback/personal-radio
pub async fn set_personal_radio(
    State(ctx): State<AppContext>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetPersonalRadio(req.enabled)).await
}

/// POST /playback/radio/trash
pub async fn trash_radio_song(
    State(ctx): State<AppContext>,
    Json(req): Json<TrashRequest>,
) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::TrashRadioSong(req.song_id)).await
}

// ============================================================================
// Volume and lyrics
// ============================================================================

/// POST /audio/volume
pub async fn set_volume(State(ctx): State<AppContext>, Json(req): Json<VolumeRequest>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetVolume(req.volume)).await
}

/// POST /audio/volume/adjust
pub async fn adjust_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<AdjustVolumeRequest>,
) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::AdjustVolume(req.step)).await
}

/// POST /audio/mute
pub async fn toggle_mute(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::ToggleMute).await
}

/// POST /lyrics/offset
pub async fn set_lyric_offset(
    State(ctx): State<AppContext>,
    Json(req): Json<LyricOffsetRequest>,
) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetLyricOffset(req.offset)).await
}

/// POST /lyrics/karaoke
pub async fn set_karaoke_lyrics(
    State(ctx): State<AppContext>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<StatusResponse> {
    run(&ctx, EngineCommand::SetKaraokeLyrics(req.enabled)).await
}
