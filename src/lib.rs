pub mod alert;
pub mod app;
pub mod camera;
pub mod compliance;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod frame;
pub mod monitor;
pub mod overlay;
pub mod session;

#[cfg(feature = "dashboard")]
pub mod dashboard;

pub use alert::{
    AlertDispatcher, AlertGate, AlertHistory, AlertRecord, AlertStatus, HISTORY_LIMIT, DispatchOutcome,
    MessagingCredentials, Notifier, TwilioNotifier,
};
pub use app::{ComponentState, PpeOrchestrator, ShutdownReason};
pub use camera::{open_frame_source, FrameSource, MockCamera};
pub use compliance::{filter_required, missing_items, unique_labels};
pub use config::{PpeConfig, SiteConfig, SiteMode, SitesConfig};
pub use detector::{create_detector, Detection, DetectionResult, Detector};
pub use error::{PpeError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, PpeEvent};
pub use frame::FrameData;
pub use monitor::{DashboardSnapshot, Monitor, MonitorCommand, MonitorExit, MonitorHandle};
pub use session::Session;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::GstCamera;

#[cfg(feature = "dashboard")]
pub use dashboard::{DashboardServer, DashboardState};
