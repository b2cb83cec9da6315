//! Environment variable loading.
//!
//! Empty variables are treated as unset so a blank line in `.env` does not
//! override a default.

use std::collections::HashMap;
use std::str::FromStr;

use super::{ConfigError, ConfigResult, ServerConfig};
use crate::core::agents::DEFAULT_AGENT_ID;
use crate::core::realtime::{DEFAULT_TEMPERATURE, OPENAI_REALTIME_URL, OpenAIRealtimeModel};
use crate::core::telephony::client::TWILIO_API_BASE_URL;

pub(super) const DEFAULT_HOST: &str = "0.0.0.0";
pub(super) const DEFAULT_PORT: u16 = 5050;

/// Read a variable, treating empty values as unset.
pub(super) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub(super) fn parse_env<T: FromStr>(name: &str, default: T) -> ConfigResult<T> {
    match env_var(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Parse a boolean flag. Accepts true/false, 1/0, yes/no, on/off.
pub(super) fn parse_bool_env(name: &str, default: bool) -> ConfigResult<bool> {
    match env_var(name) {
        Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

pub(super) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a model name set under `name`. Unknown models are rejected.
pub(super) fn parse_model(name: &str, raw: &str) -> ConfigResult<OpenAIRealtimeModel> {
    OpenAIRealtimeModel::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
    })
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> ConfigResult<ServerConfig> {
    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_env("PORT", DEFAULT_PORT)?,
        public_host: env_var("PUBLIC_HOST"),

        openai_api_key: env_var("OPENAI_API_KEY"),
        openai_model: env_var("OPENAI_REALTIME_MODEL")
            .map(|raw| parse_model("OPENAI_REALTIME_MODEL", &raw))
            .transpose()?
            .unwrap_or_default(),
        openai_realtime_url: env_var("OPENAI_REALTIME_URL")
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        temperature: parse_env("REALTIME_TEMPERATURE", DEFAULT_TEMPERATURE)?,

        default_agent: env_var("DEFAULT_AGENT").unwrap_or_else(|| DEFAULT_AGENT_ID.to_string()),
        agents: HashMap::new(),
        fallback_message: env_var("FALLBACK_MESSAGE"),
        log_timing_math: parse_bool_env("LOG_TIMING_MATH", false)?,

        twilio_account_sid: env_var("TWILIO_ACCOUNT_SID"),
        twilio_auth_token: env_var("TWILIO_AUTH_TOKEN"),
        twilio_phone_number: env_var("TWILIO_PHONE_NUMBER"),
        twilio_api_base_url: env_var("TWILIO_API_BASE_URL")
            .unwrap_or_else(|| TWILIO_API_BASE_URL.to_string()),
        webhook_base_url: env_var("WEBHOOK_BASE_URL"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_model() {
        assert_eq!(
            parse_model("OPENAI_REALTIME_MODEL", "gpt-4o-mini-realtime-preview").unwrap(),
            OpenAIRealtimeModel::Gpt4oMiniRealtimePreview
        );
        match parse_model("OPENAI_REALTIME_MODEL", "gpt-5") {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, "OPENAI_REALTIME_MODEL");
                assert_eq!(value, "gpt-5");
            }
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }
    }
}
