use crate::alert::{AlertGate, AlertHistory, AlertRecord, AlertStatus, DispatchOutcome};
use crate::alert::resolve_timezone;
use crate::config::AlertConfig;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tracing::{debug, info};

/// Per-run monitoring context, owned by the monitor loop
#[derive(Debug, Clone)]
pub struct Session {
    selected_site: String,
    gate: AlertGate,
    history: AlertHistory,
    timezone: Tz,
    cooldown_on_failure: bool,
    camera_active: bool,
    camera_error: Option<String>,
}

impl Session {
    pub fn new(initial_site: impl Into<String>, config: &AlertConfig) -> Self {
        Self {
            selected_site: initial_site.into(),
            gate: AlertGate::new(Duration::from_secs(config.cooldown_seconds)),
            history: AlertHistory::new(),
            timezone: resolve_timezone(&config.timezone),
            cooldown_on_failure: config.cooldown_on_failure,
            camera_active: true,
            camera_error: None,
        }
    }

    pub fn selected_site(&self) -> &str {
        &self.selected_site
    }

    /// Switch the active site. The cooldown is cleared only when the site
    /// actually changes; returns the previous key in that case.
    pub fn select_site(&mut self, key: &str) -> Option<String> {
        if self.selected_site == key {
            return None;
        }
        let previous = std::mem::replace(&mut self.selected_site, key.to_string());
        self.gate.reset();
        info!("Selected site {} (cooldown cleared)", key);
        Some(previous)
    }

    pub fn may_alert(&self, now: DateTime<Utc>) -> bool {
        self.gate.may_alert(now)
    }

    /// Log an alert attempt and arm the cooldown
    pub fn record_attempt(
        &mut self,
        now: DateTime<Utc>,
        outcome: &DispatchOutcome,
        missing: &[String],
    ) -> AlertRecord {
        let record = match outcome.failure_reason() {
            None => AlertRecord::new(
                now,
                &self.timezone,
                AlertStatus::Success,
                format!("Alert sent! Missing: {}", missing.join(", ")),
            ),
            Some(reason) => AlertRecord::new(
                now,
                &self.timezone,
                AlertStatus::Failure,
                format!("Failed: {}", reason),
            ),
        };

        if outcome.is_delivered() || self.cooldown_on_failure {
            self.gate.record(now);
        } else {
            debug!("Alert attempt failed; cooldown left unarmed");
        }

        self.history.push(record.clone());
        record
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn camera_error(&self) -> Option<&str> {
        self.camera_error.as_deref()
    }

    /// Manual stop from the operator; not an error
    pub fn stop_camera(&mut self) {
        self.camera_active = false;
    }

    pub fn camera_failed(&mut self, message: impl Into<String>) {
        self.camera_active = false;
        self.camera_error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alert_config(cooldown_on_failure: bool) -> AlertConfig {
        let mut config = crate::config::PpeConfig::default().alert;
        config.cooldown_seconds = 30;
        config.cooldown_on_failure = cooldown_on_failure;
        config
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn missing() -> Vec<String> {
        vec!["helmet".to_string(), "vest".to_string()]
    }

    #[test]
    fn switching_site_clears_cooldown() {
        let mut session = Session::new("construction_site", &alert_config(true));
        session.record_attempt(t0(), &DispatchOutcome::Delivered, &missing());
        assert!(!session.may_alert(t0() + chrono::Duration::seconds(5)));

        assert_eq!(session.select_site("warehouse"), Some("construction_site".to_string()));
        assert!(session.may_alert(t0() + chrono::Duration::seconds(5)));
        assert_eq!(session.selected_site(), "warehouse");
    }

    #[test]
    fn reselecting_same_site_keeps_cooldown() {
        let mut session = Session::new("construction_site", &alert_config(true));
        session.record_attempt(t0(), &DispatchOutcome::Delivered, &missing());

        assert_eq!(session.select_site("construction_site"), None);
        assert!(!session.may_alert(t0() + chrono::Duration::seconds(5)));
    }

    #[test]
    fn history_text_reflects_outcome() {
        let mut session = Session::new("construction_site", &alert_config(true));

        let ok = session.record_attempt(t0(), &DispatchOutcome::Delivered, &missing());
        assert_eq!(ok.message, "Alert sent! Missing: helmet, vest");
        assert_eq!(ok.status, AlertStatus::Success);

        let failed = session.record_attempt(
            t0(),
            &DispatchOutcome::Failed("Unable to create record".to_string()),
            &missing(),
        );
        assert_eq!(failed.message, "Failed: Unable to create record");

        let unconfigured = session.record_attempt(t0(), &DispatchOutcome::NotConfigured, &missing());
        assert_eq!(unconfigured.message, "Failed: Twilio not configured");
        assert_eq!(session.history().latest().unwrap().id, unconfigured.id);
    }

    #[test]
    fn failed_attempts_arm_cooldown_by_default() {
        let mut session = Session::new("construction_site", &alert_config(true));
        session.record_attempt(t0(), &DispatchOutcome::NotConfigured, &missing());
        assert!(!session.may_alert(t0() + chrono::Duration::seconds(10)));
    }

    #[test]
    fn failed_attempts_can_leave_cooldown_unarmed() {
        let mut session = Session::new("construction_site", &alert_config(false));
        session.record_attempt(t0(), &DispatchOutcome::Failed("x".to_string()), &missing());
        assert!(session.may_alert(t0() + chrono::Duration::seconds(1)));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn history_keeps_five_most_recent_attempts() {
        let mut session = Session::new("construction_site", &alert_config(false));
        for n in 0..10 {
            session.record_attempt(
                t0() + chrono::Duration::seconds(n),
                &DispatchOutcome::Failed(format!("attempt {}", n)),
                &missing(),
            );
        }

        assert_eq!(session.history().len(), 5);
        assert_eq!(session.history().latest().unwrap().message, "Failed: attempt 9");
        assert_eq!(
            session.history().iter().last().unwrap().message,
            "Failed: attempt 5"
        );
    }

    #[test]
    fn camera_failure_is_visible() {
        let mut session = Session::new("regular_site", &alert_config(true));
        assert!(session.camera_active());

        session.camera_failed("Camera feed lost: device unplugged");
        assert!(!session.camera_active());
        assert_eq!(session.camera_error(), Some("Camera feed lost: device unplugged"));
    }
}
