//! HTTP API handlers for the remix engine
//!
//! REST endpoints for the session plus an SSE stream of engine events.

pub mod health;
pub mod session;
pub mod sse;

pub use health::health_routes;
pub use session::session_routes;
pub use sse::event_stream;
