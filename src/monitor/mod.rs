//! Polling loop tying camera, detector, compliance and alerting together.
//!
//! The loop task owns the [`Session`](crate::session::Session). Other tasks
//! talk to it through a [`MonitorHandle`]: commands go in over an mpsc
//! channel, snapshots and annotated frames come out over `watch` channels.

mod runner;
mod snapshot;

pub use runner::{Monitor, MonitorExit};
pub use snapshot::{AnnotatedFrame, DashboardSnapshot};

use crate::error::{PpeError, Result};
use tokio::sync::{mpsc, watch};

/// Operator requests handled at the start of the next tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCommand {
    SelectSite(String),
    StopCamera,
}

/// Cloneable access to a running monitor
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    frames: watch::Receiver<Option<AnnotatedFrame>>,
}

impl MonitorHandle {
    pub async fn send(&self, command: MonitorCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PpeError::component("monitor", "Monitor loop is not running"))
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn latest_frame(&self) -> Option<AnnotatedFrame> {
        self.frames.borrow().clone()
    }

    pub fn subscribe_frames(&self) -> watch::Receiver<Option<AnnotatedFrame>> {
        self.frames.clone()
    }
}
