use super::dispatcher::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Messaging API credentials taken from the environment
#[derive(Clone)]
pub struct MessagingCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender phone number, also used as the WhatsApp sender
    pub from_number: String,
}

impl std::fmt::Debug for MessagingCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .finish()
    }
}

impl MessagingCredentials {
    pub const SID_VAR: &'static str = "TWILIO_SID";
    pub const TOKEN_VAR: &'static str = "TWILIO_TOKEN";
    pub const PHONE_VAR: &'static str = "TWILIO_PHONE";

    /// Read `TWILIO_SID`, `TWILIO_TOKEN` and `TWILIO_PHONE`; `None` if any is unset or blank
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Some(Self {
            account_sid: read(Self::SID_VAR)?,
            auth_token: read(Self::TOKEN_VAR)?,
            from_number: read(Self::PHONE_VAR)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

/// Twilio Programmable Messaging REST client
pub struct TwilioNotifier {
    client: Client,
    credentials: MessagingCredentials,
    messages_url: String,
}

impl TwilioNotifier {
    pub fn new(
        credentials: MessagingCredentials,
        api_base_url: &str,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Client {
                details: format!("Failed to create HTTP client: {}", e),
            })?;

        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            api_base_url.trim_end_matches('/'),
            credentials.account_sid
        );

        info!("Messaging client ready (sender {})", credentials.from_number);

        Ok(Self {
            client,
            credentials,
            messages_url,
        })
    }

    pub fn sender(&self) -> &str {
        &self.credentials.from_number
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send_message(&self, from: &str, to: &str, body: &str) -> Result<(), NotifyError> {
        debug!("Sending message from {} to {}", from, to);

        let params = [("From", from), ("To", to), ("Body", body)];
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<TwilioErrorBody>(&text) {
            Ok(TwilioErrorBody {
                message: Some(message),
                code: Some(code),
            }) => format!("{} (code {})", message, code),
            Ok(TwilioErrorBody {
                message: Some(message),
                ..
            }) => message,
            _ => text,
        };

        Err(NotifyError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn credentials_require_all_three_variables() {
        let full = lookup(&[
            ("TWILIO_SID", "AC123"),
            ("TWILIO_TOKEN", "secret"),
            ("TWILIO_PHONE", "+15559990000"),
        ]);
        let creds = MessagingCredentials::from_lookup(full).unwrap();
        assert_eq!(creds.account_sid, "AC123");
        assert_eq!(creds.from_number, "+15559990000");

        let partial = lookup(&[("TWILIO_SID", "AC123"), ("TWILIO_TOKEN", "secret")]);
        assert!(MessagingCredentials::from_lookup(partial).is_none());

        let blank = lookup(&[
            ("TWILIO_SID", "AC123"),
            ("TWILIO_TOKEN", "  "),
            ("TWILIO_PHONE", "+15559990000"),
        ]);
        assert!(MessagingCredentials::from_lookup(blank).is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let creds = MessagingCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+1555".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn messages_url_targets_account() {
        let creds = MessagingCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+1555".to_string(),
        };
        let notifier =
            TwilioNotifier::new(creds, "https://api.twilio.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            notifier.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
        assert_eq!(notifier.sender(), "+1555");
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_error_not_panic() {
        let creds = MessagingCredentials {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+1555".to_string(),
        };
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let notifier =
            TwilioNotifier::new(creds, "http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = notifier.send_message("+1555", "+1666", "hello").await;
        assert!(result.is_err());
    }
}
