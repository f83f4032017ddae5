//! remix-engine library interface
//!
//! Orchestrates track analysis, match search and remix generation against
//! three AI functions, and exposes the session over HTTP + SSE.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;

pub use crate::engine::RemixEngine;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use remix_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Session orchestrator
    pub engine: RemixEngine,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: RemixEngine) -> Self {
        Self {
            event_bus: engine.event_bus().clone(),
            engine,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::session_routes())
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
