use thiserror::Error;

#[derive(Error, Debug)]
pub enum PpeError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] DashboardError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Unknown site: {site}")]
    UnknownSite { site: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl PpeError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by frame sources
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera device {device}: {details}")]
    DeviceOpen { device: u32, details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Capture stream error: {details}")]
    CaptureStream { details: String },

    #[error("No frame received within {timeout_ms}ms")]
    FrameTimeout { timeout_ms: u64 },

    #[error("Camera source has been released")]
    Released,
}

/// Errors raised by object detectors
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detector request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Detector endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid detector response: {details}")]
    InvalidResponse { details: String },

    #[error("Detector configuration error: {details}")]
    Configuration { details: String },
}

/// Errors raised while delivering alert messages
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("Messaging API rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Messaging client error: {details}")]
    Client { details: String },
}

/// Errors raised by the dashboard server
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to bind dashboard to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dashboard server failed: {details}")]
    ServeFailed { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

pub type Result<T> = std::result::Result<T, PpeError>;
