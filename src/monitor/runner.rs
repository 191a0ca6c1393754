use super::snapshot::{mode_label, AnnotatedFrame, DashboardSnapshot};
use super::{MonitorCommand, MonitorHandle};
use crate::alert::AlertDispatcher;
use crate::camera::FrameSource;
use crate::compliance::{filter_required, missing_items, unique_labels};
use crate::config::{PpeConfig, SiteConfig, SiteMode, SitesConfig};
use crate::detector::{DetectionResult, Detector};
use crate::error::{PpeError, Result};
use crate::events::{EventBus, PpeEvent};
use crate::frame::FrameData;
use crate::overlay::Annotator;
use crate::session::Session;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

const COMMAND_CAPACITY: usize = 16;

/// Why the polling loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// Shutdown requested by the application
    Cancelled,
    /// Operator pressed stop
    Stopped,
    /// The frame source failed; carries the user-visible error
    CameraFailed(String),
}

/// Outcome of one frame as far as the sidebar is concerned
#[derive(Debug, Default)]
struct FrameView {
    detected: Vec<String>,
    missing: Vec<String>,
    frame_id: Option<u64>,
}

/// The polling loop and the state it owns
pub struct Monitor {
    sites: Arc<SitesConfig>,
    detector: Arc<dyn Detector>,
    dispatcher: AlertDispatcher,
    event_bus: Arc<EventBus>,
    annotator: Option<Arc<Annotator>>,
    poll_interval: Duration,
    session: Session,
    view: FrameView,
    commands: mpsc::Receiver<MonitorCommand>,
    snapshots: watch::Sender<DashboardSnapshot>,
    frames: watch::Sender<Option<AnnotatedFrame>>,
}

impl Monitor {
    /// Create the monitor and the handle used by the dashboard
    pub fn new(
        config: &PpeConfig,
        sites: Arc<SitesConfig>,
        detector: Arc<dyn Detector>,
        dispatcher: AlertDispatcher,
        event_bus: Arc<EventBus>,
    ) -> Result<(Self, MonitorHandle)> {
        let initial_site = sites.get(&config.monitor.default_site).ok_or_else(|| {
            PpeError::UnknownSite {
                site: config.monitor.default_site.clone(),
            }
        })?;

        let annotator = config.monitor.annotate.then(|| {
            Arc::new(Annotator::new(
                &config.monitor.font_path,
                config.monitor.font_size,
            ))
        });

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(DashboardSnapshot::initial(
            initial_site,
            dispatcher.is_configured(),
        ));
        let (frame_tx, frame_rx) = watch::channel(None);

        let monitor = Self {
            session: Session::new(initial_site.key.clone(), &config.alert),
            sites,
            detector,
            dispatcher,
            event_bus,
            annotator,
            poll_interval: Duration::from_millis(config.monitor.poll_interval_ms),
            view: FrameView::default(),
            commands: command_rx,
            snapshots: snapshot_tx,
            frames: frame_tx,
        };

        let handle = MonitorHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            frames: frame_rx,
        };

        Ok((monitor, handle))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the loop until stop, cancellation or camera failure. The source is
    /// released on every exit path.
    pub async fn run(
        mut self,
        mut source: Box<dyn FrameSource>,
        cancel: CancellationToken,
    ) -> Result<MonitorExit> {
        info!(
            "Monitor started on site {} using {}",
            self.session.selected_site(),
            source.describe()
        );
        let _ = self
            .event_bus
            .publish(PpeEvent::CameraStatusChanged {
                connected: true,
                timestamp: SystemTime::now(),
            })
            .await;

        let exit = self.poll_loop(source.as_mut(), &cancel).await;

        if let Err(e) = source.release().await {
            warn!("Failed to release {}: {}", source.describe(), e);
        }

        match &exit {
            MonitorExit::CameraFailed(message) => {
                error!("Monitor stopped: {}", message);
                let _ = self
                    .event_bus
                    .publish(PpeEvent::SystemError {
                        component: "camera".to_string(),
                        error: message.clone(),
                    })
                    .await;
            }
            MonitorExit::Stopped => info!("Monitor stopped by operator"),
            MonitorExit::Cancelled => {
                info!("Monitor cancelled");
                self.session.stop_camera();
            }
        }

        let _ = self
            .event_bus
            .publish(PpeEvent::CameraStatusChanged {
                connected: false,
                timestamp: SystemTime::now(),
            })
            .await;
        self.publish_snapshot();

        Ok(exit)
    }

    async fn poll_loop(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancellationToken,
    ) -> MonitorExit {
        loop {
            self.drain_commands().await;

            if cancel.is_cancelled() {
                return MonitorExit::Cancelled;
            }
            if !self.session.camera_active() {
                return MonitorExit::Stopped;
            }

            let frame = tokio::select! {
                _ = cancel.cancelled() => return MonitorExit::Cancelled,
                frame = source.read_frame() => frame,
            };

            match frame {
                Ok(frame) => self.process_frame(frame).await,
                Err(e) => {
                    let message = format!("Camera feed lost: {}", e);
                    self.session.camera_failed(message.clone());
                    return MonitorExit::CameraFailed(message);
                }
            }

            self.publish_snapshot();

            tokio::select! {
                _ = cancel.cancelled() => return MonitorExit::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command).await;
        }
    }

    async fn handle_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::SelectSite(key) => {
                if !self.sites.contains(&key) {
                    warn!("Ignoring selection of unknown site {}", key);
                    return;
                }
                if let Some(previous) = self.session.select_site(&key) {
                    self.view = FrameView::default();
                    let _ = self
                        .event_bus
                        .publish(PpeEvent::SiteChanged {
                            from: previous,
                            to: key,
                            timestamp: SystemTime::now(),
                        })
                        .await;
                    self.publish_snapshot();
                }
            }
            MonitorCommand::StopCamera => {
                info!("Camera stop requested");
                self.session.stop_camera();
            }
        }
    }

    async fn process_frame(&mut self, frame: FrameData) {
        if !frame.is_jpeg() {
            warn!("Skipping malformed frame {} ({} bytes)", frame.id, frame.data.len());
            return;
        }

        let Some(site) = self.sites.get(self.session.selected_site()).cloned() else {
            warn!("Selected site {} vanished", self.session.selected_site());
            return;
        };

        let mut detections = match self.detector.detect(&frame).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Detection failed for frame {}: {}", frame.id, e);
                let _ = self
                    .event_bus
                    .publish(PpeEvent::SystemError {
                        component: self.detector.name().to_string(),
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        let labels = detections.labels();
        trace!(
            "Frame {}: {} detection(s), {}ms old",
            frame.id,
            labels.len(),
            frame.age_ms()
        );

        let view = match site.mode() {
            SiteMode::Monitor => FrameView {
                detected: unique_labels(&labels),
                missing: Vec::new(),
                frame_id: Some(frame.id),
            },
            SiteMode::Enforce => FrameView {
                detected: unique_labels(&filter_required(&labels, &site.required_ppe)),
                missing: missing_items(&labels, &site.required_ppe),
                frame_id: Some(frame.id),
            },
        };

        if !view.missing.is_empty() {
            self.handle_violation(&site, &view.missing).await;
        }

        if site.mode() == SiteMode::Enforce {
            detections
                .detections
                .retain(|d| site.required_ppe.contains(&d.label));
        }
        self.publish_frame(frame, detections, site.required_ppe.clone())
            .await;

        self.view = view;
    }

    async fn handle_violation(&mut self, site: &SiteConfig, missing: &[String]) {
        let _ = self
            .event_bus
            .publish(PpeEvent::ComplianceViolation {
                site: site.key.clone(),
                missing: missing.to_vec(),
                timestamp: SystemTime::now(),
            })
            .await;

        let now = Utc::now();
        if !self.session.may_alert(now) {
            trace!("Alert for {} suppressed by cooldown", site.key);
            return;
        }

        let outcome = self.dispatcher.dispatch(site, missing).await;
        let record = self.session.record_attempt(now, &outcome, missing);
        let _ = self
            .event_bus
            .publish(PpeEvent::AlertDispatched {
                site: site.key.clone(),
                record,
            })
            .await;
    }

    async fn publish_frame(
        &self,
        frame: FrameData,
        detections: DetectionResult,
        required: Vec<String>,
    ) {
        let id = frame.id;
        let timestamp = frame.timestamp;

        let jpeg = match &self.annotator {
            Some(annotator) => {
                let annotator = Arc::clone(annotator);
                match tokio::task::spawn_blocking(move || {
                    annotator.annotate_or_raw(&frame, &detections, &required)
                })
                .await
                {
                    Ok(jpeg) => jpeg,
                    Err(e) => {
                        warn!("Annotation task for frame {} failed: {}", id, e);
                        return;
                    }
                }
            }
            None => frame.jpeg(),
        };

        self.frames
            .send_replace(Some(AnnotatedFrame { id, timestamp, jpeg }));
    }

    fn publish_snapshot(&self) {
        let Some(site) = self.sites.get(self.session.selected_site()) else {
            return;
        };
        let now = Utc::now();
        let gate = self.session.gate();

        let snapshot = DashboardSnapshot {
            site: site.key.clone(),
            site_name: site.display_name(),
            mode: site.mode(),
            mode_label: mode_label(site.mode()).to_string(),
            required_ppe: site.required_ppe.clone(),
            detected: self.view.detected.clone(),
            missing: self.view.missing.clone(),
            alert_status: gate.status_text(now),
            cooldown_remaining_secs: gate.remaining(now).as_secs(),
            cooldown_fraction: gate.remaining_fraction(now),
            history: self.session.history().to_vec(),
            camera_active: self.session.camera_active(),
            camera_error: self.session.camera_error().map(str::to_string),
            alerting_configured: self.dispatcher.is_configured(),
            frame_id: self.view.frame_id,
            updated_at: now,
        };

        debug!(
            "Snapshot: site={} detected={:?} missing={:?}",
            snapshot.site, snapshot.detected, snapshot.missing
        );
        self.snapshots.send_replace(snapshot);
    }
}
