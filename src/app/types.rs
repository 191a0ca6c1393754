use std::fmt;

/// Lifecycle of the camera, monitor and dashboard components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Why the process is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM, by name
    Signal(&'static str),
    /// The cancellation token was fired from inside the process
    UserRequest,
    /// The monitor loop ended and nothing else keeps the process useful
    MonitorFinished,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::UserRequest => f.write_str("requested"),
            ShutdownReason::MonitorFinished => f.write_str("monitor loop finished"),
        }
    }
}
