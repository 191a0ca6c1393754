use super::{ComponentState, PpeOrchestrator, ShutdownReason};
use crate::error::{PpeError, Result};
use crate::events::PpeEvent;
use crate::monitor::MonitorExit;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(10);
const DASHBOARD_STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl PpeOrchestrator {
    /// Stop the dashboard, then the monitor loop (which releases the camera)
    pub async fn shutdown(&mut self, reason: &ShutdownReason) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let _ = self
            .event_bus
            .publish(PpeEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: reason.to_string(),
            })
            .await;

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        if let Some(task) = self.dashboard_task.take() {
            if let Err(e) = self
                .stop_component("dashboard", task, DASHBOARD_STOP_TIMEOUT)
                .await
            {
                error!("Error stopping dashboard: {}", e);
                exit_code = 1;
            }
        }

        if let Some(task) = self.monitor_task.take() {
            match self
                .stop_component("monitor", task, MONITOR_STOP_TIMEOUT)
                .await
            {
                Ok(MonitorExit::CameraFailed(message)) => {
                    warn!("Monitor had stopped on camera failure: {}", message);
                    self.set_component_state("camera", ComponentState::Failed)
                        .await;
                    exit_code = 1;
                }
                Ok(_) => {
                    self.set_component_state("camera", ComponentState::Stopped)
                        .await;
                }
                Err(e) => {
                    error!("Error stopping monitor: {}", e);
                    exit_code = 1;
                }
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_component<T>(
        &self,
        component: &str,
        mut task: JoinHandle<Result<T>>,
        limit: Duration,
    ) -> Result<T> {
        info!("Stopping {} component", component);
        if self.get_component_state(component).await == Some(ComponentState::Running) {
            self.set_component_state(component, ComponentState::Stopping)
                .await;
        }

        match timeout(limit, &mut task).await {
            Ok(Ok(Ok(value))) => {
                if self.get_component_state(component).await != Some(ComponentState::Failed) {
                    self.set_component_state(component, ComponentState::Stopped)
                        .await;
                }
                info!("{} component stopped", component);
                Ok(value)
            }
            Ok(Ok(Err(e))) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(e)
            }
            Ok(Err(join_error)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(PpeError::component(
                    component.to_string(),
                    format!("task panicked or was aborted: {}", join_error),
                ))
            }
            Err(_) => {
                task.abort();
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout, task aborted", component);
                Err(PpeError::component(
                    component.to_string(),
                    format!("{} component stop timeout", component),
                ))
            }
        }
    }
}
