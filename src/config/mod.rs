//! Configuration module for the call relay gateway
//!
//! This module handles server configuration from `.env` files, environment
//! variables and an optional YAML file. Priority: YAML > ENV vars > .env
//! values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//!
//! # Example
//! ```rust,no_run
//! use callrelay_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

mod env;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::agents::{AgentDefinition, AgentRegistry};
use crate::core::realtime::{OpenAIRealtimeConnector, OpenAIRealtimeModel, TEMPERATURE_RANGE};
use crate::core::telephony::TwilioCredentials;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for this schema
    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value could not be parsed
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },

    /// A required value is absent
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// Values parse but do not make sense together
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Server configuration
///
/// Contains everything needed to run the relay and to place outbound calls:
/// - Server settings (host, port, public host)
/// - Speech-AI service settings (key, model, endpoint, temperature)
/// - Relay behaviour (default agent, fallback message, timing logs)
/// - Telephony REST settings (only needed for call placement)
/// - Extra agent definitions
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Host used in stream URLs instead of the request `Host` header
    pub public_host: Option<String>,

    // Speech-AI service
    pub openai_api_key: Option<String>,
    pub openai_model: OpenAIRealtimeModel,
    pub openai_realtime_url: String,
    pub temperature: f32,

    // Relay behaviour
    pub default_agent: String,
    /// Agents merged over the built-in table
    pub agents: HashMap<String, AgentDefinition>,
    /// Spoken by the telephony platform if the relay drops the stream
    pub fallback_message: Option<String>,
    /// Log truncation arithmetic at info level
    pub log_timing_math: bool,

    // Telephony REST API
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    pub twilio_api_base_url: String,
    /// Public base URL of this server, used for outbound call webhooks
    pub webhook_base_url: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("public_host", &self.public_host)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("openai_model", &self.openai_model)
            .field("openai_realtime_url", &self.openai_realtime_url)
            .field("temperature", &self.temperature)
            .field("default_agent", &self.default_agent)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("fallback_message", &self.fallback_message)
            .field("log_timing_math", &self.log_timing_math)
            .field("twilio_account_sid", &self.twilio_account_sid)
            .field("twilio_auth_token", &self.twilio_auth_token.as_ref().map(|_| "***"))
            .field("twilio_phone_number", &self.twilio_phone_number)
            .field("twilio_api_base_url", &self.twilio_api_base_url)
            .field("webhook_base_url", &self.webhook_base_url)
            .finish()
    }
}

/// Implement Drop to zeroize secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.twilio_auth_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// The `.env` file is loaded in `main` before this is called.
    pub fn from_env() -> ConfigResult<Self> {
        let config = env::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let yaml_config = YamlConfig::from_file(path)?;
        let mut config = env::load_from_env()?;
        config.apply_yaml(yaml_config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) -> ConfigResult<()> {
        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
            if server.public_host.is_some() {
                self.public_host = server.public_host;
            }
        }

        if let Some(openai) = yaml.openai {
            if openai.api_key.is_some() {
                self.openai_api_key = openai.api_key;
            }
            if let Some(model) = openai.model {
                self.openai_model = env::parse_model("openai.model", &model)?;
            }
            if let Some(url) = openai.url {
                self.openai_realtime_url = url;
            }
            if let Some(temperature) = openai.temperature {
                self.temperature = temperature;
            }
        }

        if let Some(relay) = yaml.relay {
            if let Some(default_agent) = relay.default_agent {
                self.default_agent = default_agent;
            }
            if relay.fallback_message.is_some() {
                self.fallback_message = relay.fallback_message;
            }
            if let Some(log_timing_math) = relay.log_timing_math {
                self.log_timing_math = log_timing_math;
            }
        }

        if let Some(twilio) = yaml.twilio {
            if twilio.account_sid.is_some() {
                self.twilio_account_sid = twilio.account_sid;
            }
            if twilio.auth_token.is_some() {
                self.twilio_auth_token = twilio.auth_token;
            }
            if twilio.phone_number.is_some() {
                self.twilio_phone_number = twilio.phone_number;
            }
            if let Some(api_base_url) = twilio.api_base_url {
                self.twilio_api_base_url = api_base_url;
            }
            if twilio.webhook_base_url.is_some() {
                self.webhook_base_url = twilio.webhook_base_url;
            }
        }

        self.agents.extend(yaml.agents);
        Ok(())
    }

    /// Check values that must hold for any command.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }

        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature {} must be within {}..={}",
                self.temperature,
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }

        self.agent_registry()?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Agent table with YAML agents merged over the built-in ones.
    pub fn agent_registry(&self) -> ConfigResult<AgentRegistry> {
        AgentRegistry::new(&self.default_agent, &self.agents)
    }

    /// The speech-AI key, required for serving.
    pub fn require_openai_api_key(&self) -> ConfigResult<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("OPENAI_API_KEY".to_string()))
    }

    /// Session negotiator for the configured service.
    pub fn realtime_connector(&self) -> ConfigResult<OpenAIRealtimeConnector> {
        let api_key = self.require_openai_api_key()?;
        OpenAIRealtimeConnector::new(
            api_key,
            self.openai_model,
            self.openai_realtime_url.clone(),
            self.temperature,
        )
        .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Telephony REST credentials, required for call placement.
    pub fn twilio_credentials(&self) -> ConfigResult<TwilioCredentials> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| ConfigError::Missing(name.to_string()))
        };

        Ok(TwilioCredentials {
            account_sid: required(&self.twilio_account_sid, "TWILIO_ACCOUNT_SID")?,
            auth_token: required(&self.twilio_auth_token, "TWILIO_AUTH_TOKEN")?,
            from_number: required(&self.twilio_phone_number, "TWILIO_PHONE_NUMBER")?,
            api_base_url: self.twilio_api_base_url.clone(),
            webhook_base_url: required(&self.webhook_base_url, "WEBHOOK_BASE_URL")?,
        })
    }
}
