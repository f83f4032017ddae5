//! Session API handlers
//!
//! GET /api/session, PUT /api/tracks/:slot, PUT /api/settings,
//! GET /api/styles, POST /api/matches, POST /api/remix
//!
//! Long-running actions are accepted inline (202) and finish in a background
//! task; their outcome arrives on the event stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::engine::SessionSnapshot;
use crate::error::ApiResult;
use crate::models::{RemixSettings, RemixStyle, TrackFile, TrackSlot};
use crate::AppState;

/// GET /api/session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.engine.snapshot().await)
}

/// PUT /api/tracks/:slot
///
/// A file body selects the track and starts its analysis; `null` clears it.
pub async fn put_track(
    State(state): State<AppState>,
    Path(slot): Path<u8>,
    Json(file): Json<Option<TrackFile>>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let slot = TrackSlot::try_from(slot)?;

    let Some(file) = file else {
        state.engine.clear_track(slot).await;
        return Ok((StatusCode::OK, Json(state.engine.snapshot().await)));
    };

    let job = state.engine.begin_track(slot, file).await?;

    let engine = state.engine.clone();
    tokio::spawn(async move {
        engine.run_analysis(job).await;
    });

    Ok((StatusCode::ACCEPTED, Json(state.engine.snapshot().await)))
}

/// PUT /api/settings
pub async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<RemixSettings>,
) -> ApiResult<Json<SessionSnapshot>> {
    state.engine.update_settings(settings).await?;
    Ok(Json(state.engine.snapshot().await))
}

/// Style catalogue entry
#[derive(Debug, Serialize)]
pub struct StyleInfo {
    pub id: RemixStyle,
    pub label: &'static str,
    pub description: &'static str,
}

/// GET /api/styles
pub async fn get_styles() -> Json<Vec<StyleInfo>> {
    Json(
        RemixStyle::ALL
            .iter()
            .map(|style| StyleInfo {
                id: *style,
                label: style.label(),
                description: style.description(),
            })
            .collect(),
    )
}

/// POST /api/matches
pub async fn post_matches(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let job = state.engine.begin_matches().await?;

    let engine = state.engine.clone();
    tokio::spawn(async move {
        engine.run_matches(job).await;
    });

    Ok((StatusCode::ACCEPTED, Json(state.engine.snapshot().await)))
}

/// POST /api/remix
///
/// 409 when track 1 has no analysis or a remix is already running.
pub async fn post_remix(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let job = state.engine.begin_remix().await?;

    let engine = state.engine.clone();
    tokio::spawn(async move {
        engine.run_remix(job).await;
        info!("Background remix task finished");
    });

    Ok((StatusCode::ACCEPTED, Json(state.engine.snapshot().await)))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/tracks/:slot", put(put_track))
        .route("/api/settings", put(put_settings))
        .route("/api/styles", get(get_styles))
        .route("/api/matches", post(post_matches))
        .route("/api/remix", post(post_remix))
}
