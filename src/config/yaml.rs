use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{ConfigError, ConfigResult};
use crate::core::agents::AgentDefinition;

/// Complete YAML configuration structure
///
/// All fields are optional; anything set here overrides the value taken
/// from the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "relay.example.com"
///
/// openai:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview-2024-10-01"
///   url: "wss://api.openai.com/v1/realtime"
///   temperature: 0.8
///
/// relay:
///   default_agent: "michela"
///   fallback_message: "Sorry, the assistant is unavailable."
///   log_timing_math: false
///
/// twilio:
///   account_sid: "AC..."
///   auth_token: "..."
///   phone_number: "+15550000000"
///   api_base_url: "https://api.twilio.com"
///   webhook_base_url: "https://relay.example.com"
///
/// agents:
///   support:
///     voice: "coral"
///     instructions: "You are a helpful support agent."
///     greeting: "Hi"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub relay: Option<RelayYaml>,
    pub twilio: Option<TwilioYaml>,
    pub agents: HashMap<String, AgentDefinition>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
}

/// Speech-AI service configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub url: Option<String>,
    pub temperature: Option<f32>,
}

/// Relay behaviour from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYaml {
    pub default_agent: Option<String>,
    pub fallback_message: Option<String>,
    pub log_timing_math: Option<bool>,
}

/// Telephony REST configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
    pub api_base_url: Option<String>,
    pub webhook_base_url: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed or has unknown top-level sections
    /// - Fields have invalid types (including unknown agent voices)
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from YAML text
    pub fn parse(contents: &str) -> ConfigResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::OpenAIRealtimeVoice;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_host: "relay.example.com"

openai:
  api_key: "sk-yaml"
  model: "gpt-4o-mini-realtime-preview"
  url: "ws://localhost:9000/v1/realtime"
  temperature: 0.7

relay:
  default_agent: "andrea"
  fallback_message: "Sorry"
  log_timing_math: true

twilio:
  account_sid: "AC1"
  auth_token: "tok"
  phone_number: "+15550000000"
  webhook_base_url: "https://relay.example.com"

agents:
  support:
    voice: "coral"
    instructions: "Help"
"#;

        let config = YamlConfig::parse(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.public_host.as_deref(), Some("relay.example.com"));

        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(openai.temperature, Some(0.7));

        let relay = config.relay.unwrap();
        assert_eq!(relay.default_agent.as_deref(), Some("andrea"));
        assert_eq!(relay.log_timing_math, Some(true));

        let twilio = config.twilio.unwrap();
        assert_eq!(twilio.account_sid.as_deref(), Some("AC1"));
        assert_eq!(twilio.api_base_url, None);

        assert_eq!(config.agents["support"].voice, OpenAIRealtimeVoice::Coral);
        assert_eq!(config.agents["support"].greeting, None);
    }

    #[test]
    fn test_yaml_config_empty() {
        let config = YamlConfig::parse("").unwrap();
        assert!(config.server.is_none());
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_yaml_config_partial() {
        let config = YamlConfig::parse("server:\n  port: 9000\n").unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.port, Some(9000));
        assert_eq!(server.host, None);
        assert!(config.openai.is_none());
    }

    #[test]
    fn test_yaml_unknown_section_rejected() {
        let result = YamlConfig::parse("livekit:\n  url: ws://x\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_yaml_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "relay:\n  default_agent: andrea\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(
            config.relay.unwrap().default_agent.as_deref(),
            Some("andrea")
        );
    }

    #[test]
    fn test_yaml_missing_file() {
        let result = YamlConfig::from_file(Path::new("/nonexistent/config.yaml"));
        match result {
            Err(ConfigError::Read { path, .. }) => assert!(path.contains("nonexistent")),
            _ => panic!("Expected Read error"),
        }
    }
}
