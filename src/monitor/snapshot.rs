use crate::alert::AlertRecord;
use crate::config::{SiteConfig, SiteMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;

/// Everything the dashboard renders, rebuilt on every tick
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub site: String,
    pub site_name: String,
    pub mode: SiteMode,
    pub mode_label: String,
    pub required_ppe: Vec<String>,
    /// Distinct labels shown in the sidebar. In enforce mode only required
    /// items are listed.
    pub detected: Vec<String>,
    pub missing: Vec<String>,
    pub alert_status: String,
    pub cooldown_remaining_secs: u64,
    pub cooldown_fraction: f64,
    pub history: Vec<AlertRecord>,
    pub camera_active: bool,
    pub camera_error: Option<String>,
    pub alerting_configured: bool,
    pub frame_id: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// Snapshot shown before the first frame arrives
    pub fn initial(site: &SiteConfig, alerting_configured: bool) -> Self {
        Self {
            site: site.key.clone(),
            site_name: site.display_name(),
            mode: site.mode(),
            mode_label: mode_label(site.mode()).to_string(),
            required_ppe: site.required_ppe.clone(),
            detected: Vec::new(),
            missing: Vec::new(),
            alert_status: "Alert system ready".to_string(),
            cooldown_remaining_secs: 0,
            cooldown_fraction: 0.0,
            history: Vec::new(),
            camera_active: true,
            camera_error: None,
            alerting_configured,
            frame_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty()
    }
}

pub(crate) fn mode_label(mode: SiteMode) -> &'static str {
    match mode {
        SiteMode::Monitor => "Regular Monitoring Mode",
        SiteMode::Enforce => "PPE Enforcement Mode",
    }
}

/// Latest annotated JPEG published for the live stream
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub id: u64,
    pub timestamp: SystemTime,
    pub jpeg: Arc<Vec<u8>>,
}
