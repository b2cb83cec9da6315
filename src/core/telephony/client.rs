//! Outbound call placement over the Twilio REST API.
//!
//! One POST per call, no retry. The created call fetches its answering
//! markup from this server's `/incoming-call` route with the agent id in the
//! query string, so the outbound call ends up on the same relay path as an
//! inbound one.

use std::time::Duration;

use serde::Deserialize;
use url::Url;
use zeroize::Zeroize;

use super::{TelephonyError, TelephonyResult};

/// Default Twilio REST API base URL.
pub const TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

/// Path of the call-answer route on this server.
pub const INCOMING_CALL_PATH: &str = "/incoming-call";

/// Everything needed to place a call.
#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Caller id the call is placed from
    pub from_number: String,
    /// REST API base URL
    pub api_base_url: String,
    /// Public base URL of this server, used for the answer webhook
    pub webhook_base_url: String,
}

impl std::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .field("api_base_url", &self.api_base_url)
            .field("webhook_base_url", &self.webhook_base_url)
            .finish_non_exhaustive()
    }
}

impl Drop for TwilioCredentials {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

/// Twilio REST client.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    credentials: TwilioCredentials,
}

impl TwilioClient {
    pub fn new(credentials: TwilioCredentials) -> TelephonyResult<Self> {
        for (name, value) in [
            ("TWILIO_ACCOUNT_SID", &credentials.account_sid),
            ("TWILIO_AUTH_TOKEN", &credentials.auth_token),
            ("TWILIO_PHONE_NUMBER", &credentials.from_number),
            ("WEBHOOK_BASE_URL", &credentials.webhook_base_url),
        ] {
            if value.trim().is_empty() {
                return Err(TelephonyError::MissingConfiguration(name.to_string()));
            }
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { http, credentials })
    }

    /// Answer webhook URL for `agent`.
    pub fn webhook_url(&self, agent: &str) -> TelephonyResult<String> {
        let base = self.credentials.webhook_base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, INCOMING_CALL_PATH))
            .map_err(|e| TelephonyError::InvalidUrl(format!("{}: {}", base, e)))?;
        url.query_pairs_mut().append_pair("agent", agent);
        Ok(url.to_string())
    }

    fn calls_endpoint(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.credentials.api_base_url.trim_end_matches('/'),
            self.credentials.account_sid
        )
    }

    /// Place a call to `to` answered by `agent`. Returns the call SID.
    pub async fn place_call(&self, to: &str, agent: &str) -> TelephonyResult<String> {
        let webhook = self.webhook_url(agent)?;

        tracing::info!(to = %to, agent = %agent, "Placing outbound call");

        let response = self
            .http
            .post(self.calls_endpoint())
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&[
                ("To", to),
                ("From", self.credentials.from_number.as_str()),
                ("Url", webhook.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(ApiErrorBody {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{} (code {})", message, code),
                Ok(ApiErrorBody {
                    message: Some(message),
                    ..
                }) => message,
                _ => body,
            };
            tracing::error!(status = %status, "Call placement rejected: {}", message);
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let call: CallResource = response.json().await?;
        tracing::info!(
            call_sid = %call.sid,
            status = call.status.as_deref().unwrap_or("unknown"),
            "Outbound call created"
        );
        Ok(call.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> TwilioCredentials {
        TwilioCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550000000".to_string(),
            api_base_url: TWILIO_API_BASE_URL.to_string(),
            webhook_base_url: "https://relay.example.com/".to_string(),
        }
    }

    #[test]
    fn test_missing_configuration() {
        let mut creds = credentials();
        creds.from_number = String::new();
        match TwilioClient::new(creds) {
            Err(TelephonyError::MissingConfiguration(name)) => {
                assert_eq!(name, "TWILIO_PHONE_NUMBER")
            }
            _ => panic!("Expected MissingConfiguration error"),
        }
    }

    #[test]
    fn test_webhook_url() {
        let client = TwilioClient::new(credentials()).unwrap();
        assert_eq!(
            client.webhook_url("andrea").unwrap(),
            "https://relay.example.com/incoming-call?agent=andrea"
        );
    }

    #[test]
    fn test_calls_endpoint() {
        let client = TwilioClient::new(credentials()).unwrap();
        assert_eq!(
            client.calls_endpoint(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("token\""));
        assert!(rendered.contains("AC123"));
    }
}
