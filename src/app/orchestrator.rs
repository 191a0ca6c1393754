use super::types::{ComponentState, ShutdownReason};
use crate::alert::AlertDispatcher;
use crate::config::{PpeConfig, SitesConfig};
use crate::detector::Detector;
use crate::error::Result;
use crate::events::EventBus;
use crate::monitor::{Monitor, MonitorExit, MonitorHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Main application coordinator wiring camera, monitor loop and dashboard
pub struct PpeOrchestrator {
    pub(super) config: PpeConfig,
    pub(super) sites: Arc<SitesConfig>,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) monitor: Option<Monitor>,
    pub(super) monitor_handle: MonitorHandle,
    pub(super) monitor_task: Option<JoinHandle<Result<MonitorExit>>>,
    pub(super) dashboard_task: Option<JoinHandle<Result<()>>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) monitor_finished: CancellationToken,
}

impl PpeOrchestrator {
    /// Create a new orchestrator with the given configuration and collaborators
    pub fn new(
        config: PpeConfig,
        sites: SitesConfig,
        detector: Arc<dyn Detector>,
        dispatcher: AlertDispatcher,
    ) -> Result<Self> {
        let capacity = config.monitor.event_bus_capacity;
        let event_bus = Arc::new(if tracing::enabled!(tracing::Level::DEBUG) {
            EventBus::with_debug_logging(capacity)
        } else {
            EventBus::new(capacity)
        });
        let sites = Arc::new(sites);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let (monitor, monitor_handle) = Monitor::new(
            &config,
            Arc::clone(&sites),
            detector,
            dispatcher,
            Arc::clone(&event_bus),
        )?;

        Ok(Self {
            config,
            sites,
            event_bus,
            monitor: Some(monitor),
            monitor_handle,
            monitor_task: None,
            dashboard_task: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
            monitor_finished: CancellationToken::new(),
        })
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn monitor_handle(&self) -> MonitorHandle {
        self.monitor_handle.clone()
    }

    /// Token that stops the whole system when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}

impl PpeOrchestrator {
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        set_state(&self.component_states, component, state).await;
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().await.get(component).copied()
    }

    /// Component states sorted by name
    pub async fn component_summary(&self) -> Vec<(String, ComponentState)> {
        let states = self.component_states.lock().await;
        let mut summary: Vec<_> = states
            .iter()
            .map(|(name, state)| (name.clone(), *state))
            .collect();
        summary.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }
}

/// Shared by the orchestrator and the tasks it spawns
pub(super) async fn set_state(
    states: &Mutex<HashMap<String, ComponentState>>,
    component: &str,
    state: ComponentState,
) {
    tracing::debug!("Component '{}' state changed to: {:?}", component, state);
    states.lock().await.insert(component.to_string(), state);
}
