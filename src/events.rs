use crate::alert::AlertRecord;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the monitoring system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PpeEvent {
    /// Required items were missing from a frame of an enforcing site
    ComplianceViolation {
        site: String,
        missing: Vec<String>,
        timestamp: SystemTime,
    },
    /// An alert attempt completed (delivered or failed)
    AlertDispatched { site: String, record: AlertRecord },
    /// The operator switched the active site
    SiteChanged {
        from: String,
        to: String,
        timestamp: SystemTime,
    },
    /// Camera connection status changed
    CameraStatusChanged {
        connected: bool,
        timestamp: SystemTime,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl PpeEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            PpeEvent::ComplianceViolation { timestamp, .. } => *timestamp,
            PpeEvent::AlertDispatched { record, .. } => record.created_at.into(),
            PpeEvent::SiteChanged { timestamp, .. } => *timestamp,
            PpeEvent::CameraStatusChanged { timestamp, .. } => *timestamp,
            PpeEvent::SystemError { .. } => SystemTime::now(),
            PpeEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            PpeEvent::ComplianceViolation { site, missing, .. } => {
                format!("Site {} missing: {}", site, missing.join(", "))
            }
            PpeEvent::AlertDispatched { site, record } => {
                format!("Alert for {} ({}): {}", site, record.status, record.message)
            }
            PpeEvent::SiteChanged { from, to, .. } => {
                format!("Site changed from {} to {}", from, to)
            }
            PpeEvent::CameraStatusChanged { connected, .. } => {
                format!(
                    "Camera {}",
                    if *connected {
                        "connected"
                    } else {
                        "disconnected"
                    }
                )
            }
            PpeEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            PpeEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            PpeEvent::ComplianceViolation { .. } => "compliance_violation",
            PpeEvent::AlertDispatched { .. } => "alert_dispatched",
            PpeEvent::SiteChanged { .. } => "site_changed",
            PpeEvent::CameraStatusChanged { .. } => "camera_status_changed",
            PpeEvent::SystemError { .. } => "system_error",
            PpeEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<PpeEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<PpeEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: PpeEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            PpeEvent::AlertDispatched { site, record } => {
                info!(site = %site, status = %record.status, "{}", record.message);
            }
            PpeEvent::SiteChanged { from, to, .. } => {
                info!("Active site changed: {} -> {}", from, to);
            }
            PpeEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            PpeEvent::CameraStatusChanged { connected, .. } => {
                if *connected {
                    info!("Camera connected");
                } else {
                    warn!("Camera disconnected");
                }
            }
            PpeEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            PpeEvent::ComplianceViolation { .. } => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<String>),
    /// Accept events from specific components (for SystemError events)
    Components(Vec<String>),
}

impl EventFilter {
    /// Build a filter from a comma separated list of event types; empty means all
    pub fn from_type_list(types: &str) -> Self {
        let types: Vec<String> = types
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if types.is_empty() {
            EventFilter::All
        } else {
            EventFilter::EventTypes(types)
        }
    }

    /// Check if an event passes this filter
    pub fn matches(&self, event: &PpeEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.iter().any(|t| t == event.event_type()),
            EventFilter::Components(components) => {
                if let PpeEvent::SystemError { component, .. } = event {
                    components.contains(component)
                } else {
                    false
                }
            }
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<PpeEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(receiver: broadcast::Receiver<PpeEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next event passing the filter.
    ///
    /// Lagging is not an error for display consumers: skipped events are
    /// logged and reception continues with the oldest retained event.
    pub async fn recv(&mut self) -> Option<PpeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return None;
                }
            }
        }
    }
}
