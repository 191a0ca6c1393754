use super::*;
use crate::alert::test_support::construction_site;
use crate::alert::AlertDispatcher;
use crate::camera::MockCamera;
use crate::config::{CameraSource, DetectorKind, PpeConfig, SitesConfig};
use crate::detector::create_detector;
use std::collections::BTreeMap;
use std::time::Duration;

fn create_test_config() -> PpeConfig {
    let mut config = PpeConfig::default();
    config.camera.source = CameraSource::Mock;
    config.camera.resolution = (32, 24);
    config.detector.kind = DetectorKind::Static;
    config.detector.static_labels = vec!["helmet".to_string(), "vest".to_string()];
    config.monitor.default_site = "construction_site".to_string();
    config.monitor.poll_interval_ms = 5;
    config.monitor.annotate = false;
    config.dashboard.enabled = false;
    config.dashboard.ip = "127.0.0.1".to_string();
    config.dashboard.port = 0;
    config
}

fn create_test_sites() -> SitesConfig {
    let mut sites = BTreeMap::new();
    sites.insert("construction_site".to_string(), construction_site());
    SitesConfig::new(sites)
}

fn create_orchestrator(config: PpeConfig) -> PpeOrchestrator {
    let detector = create_detector(&config.detector).unwrap();
    PpeOrchestrator::new(
        config,
        create_test_sites(),
        detector,
        AlertDispatcher::unconfigured(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_orchestrator_creation() {
    let orchestrator = create_orchestrator(create_test_config());

    assert!(orchestrator.component_summary().await.is_empty());
    assert_eq!(orchestrator.monitor_handle().snapshot().site, "construction_site");
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let mut orchestrator = create_orchestrator(create_test_config());
    orchestrator.initialize().await.unwrap();

    let summary = orchestrator.component_summary().await;
    let names: Vec<_> = summary.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["camera", "monitor"]);
    assert!(summary.iter().all(|(_, s)| *s == ComponentState::Stopped));
}

#[tokio::test]
async fn test_start_and_user_shutdown() {
    let mut orchestrator = create_orchestrator(create_test_config());
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    assert_eq!(
        orchestrator.get_component_state("monitor").await,
        Some(ComponentState::Running)
    );

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.get_component_state("monitor").await,
        Some(ComponentState::Stopped)
    );
    assert_eq!(
        orchestrator.get_component_state("camera").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_camera_failure_ends_run_without_dashboard() {
    let mut orchestrator = create_orchestrator(create_test_config());
    orchestrator.initialize().await.unwrap();

    let source = Box::new(MockCamera::new(create_test_config().camera).with_failure_after(2));
    orchestrator.start_with_source(source).await.unwrap();

    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 1);
    assert_eq!(
        orchestrator.get_component_state("monitor").await,
        Some(ComponentState::Failed)
    );

    let snapshot = orchestrator.monitor_handle().snapshot();
    assert!(!snapshot.camera_active);
    assert!(snapshot.camera_error.unwrap().starts_with("Camera feed lost:"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_immediate_camera_failure_is_not_masked_by_startup() {
    let mut orchestrator = create_orchestrator(create_test_config());
    orchestrator.initialize().await.unwrap();

    let source = Box::new(MockCamera::new(create_test_config().camera).with_failure_after(0));
    orchestrator.start_with_source(source).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), orchestrator.monitor_finished.cancelled())
        .await
        .unwrap();
    assert_eq!(
        orchestrator.get_component_state("monitor").await,
        Some(ComponentState::Failed)
    );
    assert_eq!(
        orchestrator.get_component_state("camera").await,
        Some(ComponentState::Failed)
    );
}

#[tokio::test]
async fn test_monitor_cannot_start_twice() {
    let mut orchestrator = create_orchestrator(create_test_config());
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    assert!(orchestrator.start().await.is_err());
    orchestrator.cancellation_token().cancel();
}

#[cfg(feature = "dashboard")]
#[tokio::test]
async fn test_dashboard_lifecycle() {
    let mut config = create_test_config();
    config.dashboard.enabled = true;

    let mut orchestrator = create_orchestrator(config);
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    assert_eq!(
        orchestrator.get_component_state("dashboard").await,
        Some(ComponentState::Running)
    );

    let exit_code = orchestrator
        .shutdown(&ShutdownReason::UserRequest)
        .await
        .unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.get_component_state("dashboard").await,
        Some(ComponentState::Stopped)
    );
}

#[cfg(feature = "dashboard")]
#[tokio::test]
async fn test_shutdown_with_open_stream_client_exits_cleanly() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut config = create_test_config();
    config.dashboard.enabled = true;
    config.dashboard.port = port;

    let mut orchestrator = create_orchestrator(config);
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let mut client = None;
    for _ in 0..50 {
        match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => {
                client = Some(stream);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    let mut client = client.expect("dashboard did not start listening");
    client
        .write_all(b"GET /stream.mjpg HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = [0u8; 256];
    let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));

    let exit_code = tokio::time::timeout(
        Duration::from_secs(4),
        orchestrator.shutdown(&ShutdownReason::Signal("SIGINT")),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.get_component_state("dashboard").await,
        Some(ComponentState::Stopped)
    );
}

#[test]
fn test_shutdown_reason_display() {
    assert_eq!(ShutdownReason::Signal("SIGTERM").to_string(), "received SIGTERM");
    assert_eq!(ShutdownReason::MonitorFinished.to_string(), "monitor loop finished");
}
