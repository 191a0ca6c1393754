use super::orchestrator::set_state;
use super::{ComponentState, PpeOrchestrator};
use crate::camera::{open_frame_source, FrameSource};
use crate::error::{PpeError, Result};
use crate::monitor::MonitorExit;
use std::sync::Arc;
use tracing::{error, info, warn};

impl PpeOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing ppewatch components");

        let mut states = self.component_states.lock().await;
        states.insert("camera".to_string(), ComponentState::Stopped);
        states.insert("monitor".to_string(), ComponentState::Stopped);
        if self.config.dashboard.enabled {
            states.insert("dashboard".to_string(), ComponentState::Stopped);
        }
        drop(states);

        info!(
            "{} site(s) configured, starting on {}",
            self.sites.len(),
            self.config.monitor.default_site
        );
        Ok(())
    }

    /// Open the configured camera and start all components
    pub async fn start(&mut self) -> Result<()> {
        self.set_component_state("camera", ComponentState::Starting)
            .await;

        let source = match open_frame_source(&self.config.camera).await {
            Ok(source) => source,
            Err(e) => {
                self.set_component_state("camera", ComponentState::Failed)
                    .await;
                error!("Failed to open camera: {}", e);
                return Err(e);
            }
        };

        self.start_with_source(source).await
    }

    /// Start all components reading from an already opened frame source
    pub async fn start_with_source(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        info!("Starting ppewatch");

        let monitor = self
            .monitor
            .take()
            .ok_or_else(|| PpeError::system("Monitor already started"))?;

        // Set before the spawn; the task owns every later transition
        self.set_component_state("camera", ComponentState::Running)
            .await;
        self.set_component_state("monitor", ComponentState::Running)
            .await;

        let states = Arc::clone(&self.component_states);
        let token = self.cancellation_token.child_token();
        let finished = self.monitor_finished.clone();
        self.monitor_task = Some(tokio::spawn(async move {
            let result = monitor.run(source, token).await;

            let (monitor_state, camera_state) = match &result {
                Ok(MonitorExit::CameraFailed(_)) => (ComponentState::Failed, ComponentState::Failed),
                Ok(_) => (ComponentState::Stopped, ComponentState::Stopped),
                Err(e) => {
                    error!("Monitor loop error: {}", e);
                    (ComponentState::Failed, ComponentState::Stopped)
                }
            };
            set_state(&states, "monitor", monitor_state).await;
            set_state(&states, "camera", camera_state).await;
            finished.cancel();
            result
        }));
        info!("Monitor loop started");

        if self.config.dashboard.enabled {
            self.start_dashboard().await?;
        } else {
            warn!("Dashboard disabled; the process exits when the monitor stops");
        }

        info!("ppewatch started successfully");
        Ok(())
    }

    #[cfg(feature = "dashboard")]
    async fn start_dashboard(&mut self) -> Result<()> {
        use crate::dashboard::{DashboardServer, DashboardState};

        self.set_component_state("dashboard", ComponentState::Starting)
            .await;

        let state = DashboardState::new(
            self.monitor_handle.clone(),
            Arc::clone(&self.sites),
            Arc::clone(&self.event_bus),
            self.config.dashboard.stream_fps,
        );
        let server = DashboardServer::new(self.config.dashboard.clone(), state);
        let address = server.address();

        self.set_component_state("dashboard", ComponentState::Running)
            .await;
        let states = Arc::clone(&self.component_states);
        let token = self.cancellation_token.child_token();
        self.dashboard_task = Some(tokio::spawn(async move {
            let result = server.serve(token).await;
            if let Err(e) = &result {
                error!("Dashboard server error: {}", e);
                set_state(&states, "dashboard", ComponentState::Failed).await;
            }
            result
        }));
        info!("Dashboard started on http://{}", address);
        Ok(())
    }

    #[cfg(not(feature = "dashboard"))]
    async fn start_dashboard(&mut self) -> Result<()> {
        warn!("Dashboard requested but this build has no dashboard feature");
        self.set_component_state("dashboard", ComponentState::Failed)
            .await;
        Ok(())
    }
}
