//! Call route configuration
//!
//! # Endpoints
//!
//! - `GET /` - liveness check
//! - `GET|POST /incoming-call?agent=ID` - TwiML answering a call
//! - `GET|POST /voice?agent=ID` - alias of `/incoming-call`
//! - `GET /media-stream?agent=ID` - WebSocket upgrade carrying the call audio
//!
//! The routes are unauthenticated; the telephony platform calls them directly.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::api::health_check;
use crate::handlers::media_stream::media_stream_handler;
use crate::handlers::voice::incoming_call;
use crate::state::AppState;
use std::sync::Arc;

/// Create the router with all call routes and the shared state applied.
pub fn create_voice_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/incoming-call", get(incoming_call).post(incoming_call))
        .route("/voice", get(incoming_call).post(incoming_call))
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
