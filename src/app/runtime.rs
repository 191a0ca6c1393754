use super::{PpeOrchestrator, ShutdownReason};
use crate::error::{PpeError, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

impl PpeOrchestrator {
    /// Run until a signal, a cancellation or (without dashboard) the end of
    /// the monitor loop, then shut down. Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("ppewatch is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| PpeError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| PpeError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        let wait_for_monitor = !self.config.dashboard.enabled;
        let shutdown_reason = tokio::select! {
            reason = shutdown_receiver => reason.map_err(|_| {
                PpeError::system("Shutdown channel closed unexpectedly")
            })?,
            _ = self.cancellation_token.cancelled() => ShutdownReason::UserRequest,
            _ = self.monitor_finished.cancelled(), if wait_for_monitor => {
                ShutdownReason::MonitorFinished
            }
        };

        info!("Shutdown initiated: {}", shutdown_reason);

        let exit_code = self.shutdown(&shutdown_reason).await?;

        info!("ppewatch shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM"));
                    }
                }
            });
        }

        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT"));
                }
            }
        });
    }
}
