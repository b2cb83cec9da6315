//! Call-answer handler.
//!
//! The telephony platform requests this route when a call comes in (or when
//! an outbound call is answered) and receives TwiML telling it to stream the
//! call audio to `/media-stream` with the same agent id.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::telephony::incoming_call_twiml;
use crate::state::AppState;

/// `?agent=` query of the call routes.
#[derive(Debug, Default, Deserialize)]
pub struct AgentQuery {
    pub agent: Option<String>,
}

impl AgentQuery {
    /// The requested agent id, or `default` when absent or blank.
    pub fn agent_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.agent
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(default)
    }
}

/// Answer an incoming call with a `<Connect><Stream>` TwiML document.
///
/// Served for both `GET` and `POST` on `/incoming-call` and `/voice`.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentQuery>,
    headers: HeaderMap,
) -> Response {
    let agent = query.agent_or(state.agents.default_id());

    let request_host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let Some(host) = state.stream_host(request_host) else {
        warn!("Incoming call without a Host header and no PUBLIC_HOST configured");
        return (StatusCode::BAD_REQUEST, "missing Host header").into_response();
    };

    match incoming_call_twiml(host, agent, state.config.fallback_message.as_deref()) {
        Ok(twiml) => {
            info!(agent = %agent, host = %host, "Answering incoming call");
            ([(header::CONTENT_TYPE, "application/xml")], twiml).into_response()
        }
        Err(e) => {
            warn!("Failed to build call-answer markup: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
