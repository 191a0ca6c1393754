use crate::config::SiteConfig;
use crate::error::NotifyError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Status text reported when no messaging credentials are available
pub const NOT_CONFIGURED_REASON: &str = "Twilio not configured";

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Outbound messaging seam
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, from: &str, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Result of one alert attempt; never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Failed(String),
    NotConfigured,
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered)
    }

    /// Reason text for anything but a delivery
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Delivered => None,
            DispatchOutcome::Failed(reason) => Some(reason),
            DispatchOutcome::NotConfigured => Some(NOT_CONFIGURED_REASON),
        }
    }
}

/// Formats alert messages and submits them on the SMS and WhatsApp channels
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
    sender: String,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, sender: impl Into<String>) -> Self {
        Self {
            notifier: Some(notifier),
            sender: sender.into(),
        }
    }

    /// Dispatcher that reports every attempt as not configured
    pub fn unconfigured() -> Self {
        Self {
            notifier: None,
            sender: String::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.notifier.is_some()
    }

    pub fn message_body(site: &SiteConfig, missing: &[String]) -> String {
        format!(
            "{} - 🚨PPE Alert! Missing: {}",
            site.display_name(),
            missing.join(", ")
        )
    }

    /// Send one alert over both channels, SMS first
    pub async fn dispatch(&self, site: &SiteConfig, missing: &[String]) -> DispatchOutcome {
        let Some(notifier) = &self.notifier else {
            debug!("Skipping alert for {}: messaging not configured", site.key);
            return DispatchOutcome::NotConfigured;
        };

        let body = Self::message_body(site, missing);
        let contacts = &site.admin_contacts;

        if let Err(e) = notifier
            .send_message(&self.sender, &contacts.sms, &body)
            .await
        {
            warn!("SMS alert for {} failed: {}", site.key, e);
            return DispatchOutcome::Failed(e.to_string());
        }

        let from = format!("{}{}", WHATSAPP_PREFIX, self.sender);
        let to = format!("{}{}", WHATSAPP_PREFIX, contacts.whatsapp);
        if let Err(e) = notifier.send_message(&from, &to, &body).await {
            warn!("WhatsApp alert for {} failed: {}", site.key, e);
            return DispatchOutcome::Failed(e.to_string());
        }

        info!("Alert delivered for {}: {}", site.key, body);
        DispatchOutcome::Delivered
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::AdminContacts;
    use parking_lot::Mutex;

    /// Records every message and optionally fails from the n-th call on
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, String)>>,
        pub fail_from_call: Option<usize>,
        pub failure: Option<String>,
    }

    impl RecordingNotifier {
        pub fn failing_at(call: usize, message: &str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_from_call: Some(call),
                failure: Some(message.to_string()),
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_message(&self, from: &str, to: &str, body: &str) -> Result<(), NotifyError> {
            let mut sent = self.sent.lock();
            if let Some(n) = self.fail_from_call {
                if sent.len() >= n {
                    return Err(NotifyError::Client {
                        details: self.failure.clone().unwrap_or_default(),
                    });
                }
            }
            sent.push((from.to_string(), to.to_string(), body.to_string()));
            Ok(())
        }
    }

    pub(crate) fn construction_site() -> SiteConfig {
        SiteConfig {
            key: "construction_site".to_string(),
            name: None,
            mode: None,
            required_ppe: vec!["helmet".to_string(), "vest".to_string()],
            admin_contacts: AdminContacts {
                sms: "+15550001111".to_string(),
                whatsapp: "+15550002222".to_string(),
            },
        }
    }

    fn missing() -> Vec<String> {
        vec!["helmet".to_string(), "vest".to_string()]
    }

    #[test]
    fn message_uses_title_cased_site_key() {
        assert_eq!(
            AlertDispatcher::message_body(&construction_site(), &missing()),
            "Construction_Site - 🚨PPE Alert! Missing: helmet, vest"
        );
    }

    #[tokio::test]
    async fn delivers_sms_then_whatsapp() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone(), "+15559990000");

        let outcome = dispatcher.dispatch(&construction_site(), &missing()).await;
        assert_eq!(outcome, DispatchOutcome::Delivered);

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "+15559990000");
        assert_eq!(sent[0].1, "+15550001111");
        assert_eq!(sent[1].0, "whatsapp:+15559990000");
        assert_eq!(sent[1].1, "whatsapp:+15550002222");
        assert_eq!(sent[0].2, sent[1].2);
    }

    #[tokio::test]
    async fn sms_failure_is_reported_with_error_text() {
        let notifier = Arc::new(RecordingNotifier::failing_at(0, "invalid 'To' number"));
        let dispatcher = AlertDispatcher::new(notifier.clone(), "+15559990000");

        let outcome = dispatcher.dispatch(&construction_site(), &missing()).await;
        assert_eq!(outcome.failure_reason(), Some("Messaging client error: invalid 'To' number"));
        assert!(notifier.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn whatsapp_failure_after_sms_still_fails() {
        let notifier = Arc::new(RecordingNotifier::failing_at(1, "channel not enabled"));
        let dispatcher = AlertDispatcher::new(notifier.clone(), "+15559990000");

        let outcome = dispatcher.dispatch(&construction_site(), &missing()).await;
        assert!(matches!(outcome, DispatchOutcome::Failed(ref r) if r.contains("channel not enabled")));
        assert_eq!(notifier.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_dispatcher_never_sends() {
        let dispatcher = AlertDispatcher::unconfigured();
        assert!(!dispatcher.is_configured());

        let outcome = dispatcher.dispatch(&construction_site(), &missing()).await;
        assert_eq!(outcome, DispatchOutcome::NotConfigured);
        assert_eq!(outcome.failure_reason(), Some(NOT_CONFIGURED_REASON));
    }
}
