use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Site key that runs in show-all mode when no explicit mode is configured
pub const REGULAR_SITE_KEY: &str = "regular_site";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PpeConfig {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub alert: AlertConfig,
    pub monitor: MonitorConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// V4L2 device through a GStreamer pipeline
    Gstreamer,
    /// Synthetic frames, no hardware required
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Frame source backend
    #[serde(default = "default_camera_source")]
    pub source: CameraSource,

    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second requested from the device
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Video format (MJPG, YUYV, etc.)
    #[serde(default = "default_camera_format")]
    pub format: String,

    /// How long a single frame read may block before it counts as a failure
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Remote inference endpoint receiving JPEG frames
    Http,
    /// Fixed label list, used for demos and dry runs
    Static,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_kind")]
    pub kind: DetectorKind,

    /// Inference endpoint URL
    #[serde(default = "default_detector_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_detector_timeout_ms")]
    pub timeout_ms: u64,

    /// Detections below this confidence are discarded
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Labels reported on every frame by the static detector
    #[serde(default)]
    pub static_labels: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlertConfig {
    /// Minimum seconds between two alert dispatches
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Whether a failed delivery still arms the cooldown
    #[serde(default = "default_cooldown_on_failure")]
    pub cooldown_on_failure: bool,

    /// Timezone used to render alert timestamps
    #[serde(default = "default_alert_timezone")]
    pub timezone: String,

    /// Messaging API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    /// Path to the per-site requirements file (YAML or TOML)
    #[serde(default = "default_sites_file")]
    pub sites_file: String,

    /// Site selected when the monitor starts
    #[serde(default = "default_site")]
    pub default_site: String,

    /// Sleep between two polling iterations
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Draw detection boxes on published frames
    #[serde(default = "default_annotate")]
    pub annotate: bool,

    /// TrueType font used for box labels
    #[serde(default = "default_font_path")]
    pub font_path: String,

    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_enabled")]
    pub enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_dashboard_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_dashboard_port")]
    pub port: u16,

    /// Frame rate of the annotated MJPEG stream
    #[serde(default = "default_stream_fps")]
    pub stream_fps: u32,
}

impl PpeConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("ppewatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.source", "gstreamer")?
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.format", default_camera_format())?
            .set_default("camera.read_timeout_ms", default_read_timeout_ms() as i64)?
            .set_default("detector.kind", "http")?
            .set_default("detector.endpoint", default_detector_endpoint())?
            .set_default("detector.timeout_ms", default_detector_timeout_ms() as i64)?
            .set_default(
                "detector.confidence_threshold",
                default_confidence_threshold() as f64,
            )?
            .set_default("detector.static_labels", Vec::<String>::new())?
            .set_default("alert.cooldown_seconds", default_cooldown_seconds() as i64)?
            .set_default("alert.cooldown_on_failure", default_cooldown_on_failure())?
            .set_default("alert.timezone", default_alert_timezone())?
            .set_default("alert.api_base_url", default_api_base_url())?
            .set_default(
                "alert.request_timeout_ms",
                default_request_timeout_ms() as i64,
            )?
            .set_default("monitor.sites_file", default_sites_file())?
            .set_default("monitor.default_site", default_site())?
            .set_default("monitor.poll_interval_ms", default_poll_interval_ms() as i64)?
            .set_default("monitor.annotate", default_annotate())?
            .set_default("monitor.font_path", default_font_path())?
            .set_default("monitor.font_size", default_font_size() as f64)?
            .set_default(
                "monitor.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("dashboard.enabled", default_dashboard_enabled())?
            .set_default("dashboard.ip", default_dashboard_ip())?
            .set_default("dashboard.port", default_dashboard_port())?
            .set_default("dashboard.stream_fps", default_stream_fps())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // PPEWATCH_ALERT__COOLDOWN_SECONDS=300
            .add_source(
                Environment::with_prefix("PPEWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: PpeConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.detector.kind == DetectorKind::Http && self.detector.endpoint.is_empty() {
            return Err(ConfigError::Message(
                "Detector endpoint is required for the http detector".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(ConfigError::Message(
                "Detector confidence_threshold must be within 0.0..=1.0".to_string(),
            ));
        }

        if self.alert.cooldown_seconds == 0 {
            return Err(ConfigError::Message(
                "Alert cooldown_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Monitor poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.monitor.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.dashboard.stream_fps == 0 {
            return Err(ConfigError::Message(
                "Dashboard stream_fps must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PpeConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: default_camera_source(),
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                format: default_camera_format(),
                read_timeout_ms: default_read_timeout_ms(),
            },
            detector: DetectorConfig {
                kind: default_detector_kind(),
                endpoint: default_detector_endpoint(),
                timeout_ms: default_detector_timeout_ms(),
                confidence_threshold: default_confidence_threshold(),
                static_labels: Vec::new(),
            },
            alert: AlertConfig {
                cooldown_seconds: default_cooldown_seconds(),
                cooldown_on_failure: default_cooldown_on_failure(),
                timezone: default_alert_timezone(),
                api_base_url: default_api_base_url(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            monitor: MonitorConfig {
                sites_file: default_sites_file(),
                default_site: default_site(),
                poll_interval_ms: default_poll_interval_ms(),
                annotate: default_annotate(),
                font_path: default_font_path(),
                font_size: default_font_size(),
                event_bus_capacity: default_event_bus_capacity(),
            },
            dashboard: DashboardConfig {
                enabled: default_dashboard_enabled(),
                ip: default_dashboard_ip(),
                port: default_dashboard_port(),
                stream_fps: default_stream_fps(),
            },
        }
    }
}

/// Whether a site checks required items or only lists detections
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SiteMode {
    /// Required items are checked and alerts are dispatched
    Enforce,
    /// All detections are shown, no alerts
    Monitor,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct AdminContacts {
    /// Phone number receiving SMS alerts
    #[serde(default)]
    pub sms: String,

    /// WhatsApp number receiving chat alerts (without the `whatsapp:` prefix)
    #[serde(default)]
    pub whatsapp: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    /// Site key, filled from the mapping key after loading
    #[serde(skip)]
    pub key: String,

    /// Display name; the title-cased key is used when absent
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub mode: Option<SiteMode>,

    #[serde(default)]
    pub required_ppe: Vec<String>,

    #[serde(default)]
    pub admin_contacts: AdminContacts,
}

impl SiteConfig {
    pub fn mode(&self) -> SiteMode {
        match self.mode {
            Some(mode) => mode,
            None if self.key == REGULAR_SITE_KEY => SiteMode::Monitor,
            None => SiteMode::Enforce,
        }
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| title_case(&self.key))
    }
}

/// Immutable set of sites loaded at startup
#[derive(Debug, Clone, Default)]
pub struct SitesConfig {
    sites: BTreeMap<String, SiteConfig>,
}

impl SitesConfig {
    pub fn new(sites: BTreeMap<String, SiteConfig>) -> Self {
        let sites = sites
            .into_iter()
            .map(|(key, mut site)| {
                site.key = key.clone();
                (key, site)
            })
            .collect();
        Self { sites }
    }

    /// Load the site mapping from a YAML or TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading sites from: {}", path.display());

        let settings = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?;

        let sites: BTreeMap<String, SiteConfig> = settings.try_deserialize()?;
        let sites = Self::new(sites);

        info!("Loaded {} site(s) from {}", sites.len(), path.display());
        Ok(sites)
    }

    pub fn get(&self, key: &str) -> Option<&SiteConfig> {
        self.sites.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sites.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.sites.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.values()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Validate the site set against the monitor settings
    pub fn validate(&self, monitor: &MonitorConfig) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Message(
                "At least one site must be configured".to_string(),
            ));
        }

        if !self.contains(&monitor.default_site) {
            return Err(ConfigError::Message(format!(
                "Default site '{}' is not defined in the sites file",
                monitor.default_site
            )));
        }

        for site in self.sites.values() {
            if site.mode() == SiteMode::Enforce {
                if site.required_ppe.is_empty() {
                    return Err(ConfigError::Message(format!(
                        "Site '{}' enforces PPE but lists no required items",
                        site.key
                    )));
                }
                if site.admin_contacts.sms.is_empty() || site.admin_contacts.whatsapp.is_empty() {
                    return Err(ConfigError::Message(format!(
                        "Site '{}' enforces PPE but has incomplete admin contacts",
                        site.key
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

// Default value functions
fn default_camera_source() -> CameraSource {
    CameraSource::Gstreamer
}
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_format() -> String {
    "MJPG".to_string()
}
fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_detector_kind() -> DetectorKind {
    DetectorKind::Http
}
fn default_detector_endpoint() -> String {
    "http://127.0.0.1:8500/detect".to_string()
}
fn default_detector_timeout_ms() -> u64 {
    2000
}
fn default_confidence_threshold() -> f32 {
    0.25
}

fn default_cooldown_seconds() -> u64 {
    30
}
fn default_cooldown_on_failure() -> bool {
    true
}
fn default_alert_timezone() -> String {
    "UTC".to_string()
}
fn default_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_sites_file() -> String {
    "sites.yaml".to_string()
}
fn default_site() -> String {
    REGULAR_SITE_KEY.to_string()
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_annotate() -> bool {
    true
}
fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    18.0
}
fn default_event_bus_capacity() -> usize {
    100
}

fn default_dashboard_enabled() -> bool {
    true
}
fn default_dashboard_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_dashboard_port() -> u16 {
    8501
}
fn default_stream_fps() -> u32 {
    10
}
