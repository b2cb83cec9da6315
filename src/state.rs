//! Shared application state.

use std::sync::Arc;

use crate::config::{ConfigResult, ServerConfig};
use crate::core::agents::AgentRegistry;
use crate::core::realtime::UpstreamConnector;

/// State shared by all routes. Nothing call-specific lives here.
pub struct AppState {
    pub config: ServerConfig,
    pub agents: AgentRegistry,
    /// Opens one speech-AI session per call
    pub connector: Arc<dyn UpstreamConnector>,
}

impl AppState {
    /// Build state for serving. Requires the speech-AI key.
    pub fn new(config: ServerConfig) -> ConfigResult<Arc<Self>> {
        let connector = Arc::new(config.realtime_connector()?);
        Self::with_connector(config, connector)
    }

    /// Build state around an existing connector.
    pub fn with_connector(
        config: ServerConfig,
        connector: Arc<dyn UpstreamConnector>,
    ) -> ConfigResult<Arc<Self>> {
        let agents = config.agent_registry()?;
        tracing::info!(
            agents = ?agents.ids(),
            default_agent = %agents.default_id(),
            provider = %connector.provider_info()["provider"],
            "Application state initialized"
        );
        Ok(Arc::new(Self {
            config,
            agents,
            connector,
        }))
    }

    /// Host to put in stream URLs: the configured public host, else the
    /// request's `Host` header.
    pub fn stream_host<'a>(&'a self, request_host: Option<&'a str>) -> Option<&'a str> {
        self.config
            .public_host
            .as_deref()
            .or(request_host)
            .filter(|h| !h.trim().is_empty())
    }
}
