//! OpenAI Realtime session negotiation.
//!
//! [`OpenAIRealtimeConnector`] opens one WebSocket per call and sends the
//! `session.update` that fixes formats, turn detection, voice and prompt.
//! It stops there: the greeting is sent by the relay once the
//! telephony stream has started, and from then on the relay owns the socket.
//!
//! # Example
//! ```rust,no_run
//! use callrelay_gateway::core::agents::AgentRegistry;
//! use callrelay_gateway::core::realtime::{
//!     OpenAIRealtimeConnector, OpenAIRealtimeModel, UpstreamConnector, OPENAI_REALTIME_URL,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = OpenAIRealtimeConnector::new(
//!         "sk-...",
//!         OpenAIRealtimeModel::default(),
//!         OPENAI_REALTIME_URL,
//!         0.8,
//!     )?;
//!     let agent = AgentRegistry::builtin().lookup("michela");
//!     let handle = connector.open_session(&agent).await?;
//!     println!("negotiated {}", handle.session_label);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use futures::SinkExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;
use zeroize::Zeroize;

use super::config::{
    Modality, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel, TEMPERATURE_RANGE,
};
use super::messages::{ClientEvent, SessionConfig, TurnDetection};
use crate::core::agents::AgentConfig;
use crate::core::realtime::base::{
    RealtimeError, RealtimeResult, UpstreamConnector, UpstreamHandle,
};

/// Session negotiator for the OpenAI Realtime API.
pub struct OpenAIRealtimeConnector {
    api_key: String,
    model: OpenAIRealtimeModel,
    base_url: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAIRealtimeConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIRealtimeConnector")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl Drop for OpenAIRealtimeConnector {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

impl OpenAIRealtimeConnector {
    /// Create a connector.
    ///
    /// # Errors
    /// - `AuthenticationFailed` if `api_key` is empty
    /// - `InvalidConfiguration` if `base_url` is not a ws/wss URL or the
    ///   temperature is outside the accepted range
    pub fn new(
        api_key: impl Into<String>,
        model: OpenAIRealtimeModel,
        base_url: impl Into<String>,
        temperature: f32,
    ) -> RealtimeResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "temperature {} outside {:?}",
                temperature, TEMPERATURE_RANGE
            )));
        }

        let connector = Self {
            api_key,
            model,
            base_url: base_url.into(),
            temperature,
        };
        connector.build_ws_url()?;
        Ok(connector)
    }

    pub fn model(&self) -> OpenAIRealtimeModel {
        self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Endpoint URL with the model query parameter.
    pub fn build_ws_url(&self) -> RealtimeResult<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("{}: {}", self.base_url, e)))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "unsupported scheme '{}' in realtime URL",
                url.scheme()
            )));
        }

        url.query_pairs_mut().append_pair("model", self.model.as_str());
        Ok(url.to_string())
    }

    /// The `session.update` payload for one agent.
    pub fn build_session_config(&self, agent: &AgentConfig) -> SessionConfig {
        SessionConfig {
            turn_detection: TurnDetection::server_vad(),
            input_audio_format: OpenAIRealtimeAudioFormat::Pcm16,
            output_audio_format: OpenAIRealtimeAudioFormat::Pcm16,
            voice: agent.voice,
            instructions: agent.instructions.clone(),
            modalities: vec![Modality::Text, Modality::Audio],
            temperature: Some(self.temperature),
        }
    }

    fn build_request(&self) -> RealtimeResult<tungstenite::handshake::client::Request> {
        let url = self.build_ws_url()?;
        let mut request = url
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Authorization", bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        Ok(request)
    }
}

fn map_connect_error(error: tungstenite::Error) -> RealtimeError {
    match error {
        tungstenite::Error::Http(response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            RealtimeError::AuthenticationFailed(format!(
                "upstream rejected credentials ({})",
                response.status()
            ))
        }
        other => RealtimeError::ConnectionFailed(other.to_string()),
    }
}

#[async_trait]
impl UpstreamConnector for OpenAIRealtimeConnector {
    async fn open_session(&self, agent: &AgentConfig) -> RealtimeResult<UpstreamHandle> {
        let request = self.build_request()?;

        let (mut socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(map_connect_error)?;

        tracing::info!(agent = %agent.id, model = %self.model, "Connected to OpenAI Realtime API");

        let update = ClientEvent::SessionUpdate {
            session: self.build_session_config(agent),
        };
        socket.send(Message::Text(update.to_json()?.into())).await?;

        tracing::debug!(agent = %agent.id, voice = %agent.voice, "Sent session update");

        Ok(UpstreamHandle {
            socket,
            session_label: format!("openai:{}", self.model),
        })
    }

    fn provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "openai",
            "api_type": "WebSocket Realtime",
            "endpoint": self.base_url,
            "model": self.model.as_str(),
            "audio_format": OpenAIRealtimeAudioFormat::Pcm16.as_str(),
            "sample_rate": OpenAIRealtimeAudioFormat::Pcm16.sample_rate(),
            "turn_detection": "server_vad",
        })
    }
}
