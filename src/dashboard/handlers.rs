use crate::config::SiteMode;
use crate::events::{EventFilter, EventReceiver};
use crate::monitor::MonitorCommand;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::page::INDEX_HTML;
use super::server::DashboardState;

#[derive(Debug, Serialize)]
pub struct SiteSummary {
    pub key: String,
    pub name: String,
    pub mode: SiteMode,
    pub required_ppe: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SiteRequest {
    pub site: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Comma separated event types; all events when absent
    #[serde(default)]
    pub types: Option<String>,
}

pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

pub async fn status_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.monitor.snapshot())
}

pub async fn sites_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let sites: Vec<SiteSummary> = state
        .sites
        .iter()
        .map(|site| SiteSummary {
            key: site.key.clone(),
            name: site.display_name(),
            mode: site.mode(),
            required_ppe: site.required_ppe.clone(),
        })
        .collect();
    Json(sites)
}

pub async fn select_site_handler(
    State(state): State<DashboardState>,
    Json(request): Json<SiteRequest>,
) -> Response {
    if !state.sites.contains(&request.site) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown site: {}", request.site) })),
        )
            .into_response();
    }

    match state
        .monitor
        .send(MonitorCommand::SelectSite(request.site.clone()))
        .await
    {
        Ok(()) => {
            info!("Site selection requested: {}", request.site);
            (StatusCode::ACCEPTED, Json(json!({ "site": request.site }))).into_response()
        }
        Err(e) => (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

pub async fn stop_camera_handler(State(state): State<DashboardState>) -> Response {
    match state.monitor.send(MonitorCommand::StopCamera).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "stopping": true }))).into_response(),
        Err(e) => (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

/// Server-sent events relaying the event bus
pub async fn events_handler(
    State(state): State<DashboardState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let filter = query
        .types
        .as_deref()
        .map(EventFilter::from_type_list)
        .unwrap_or(EventFilter::All);
    let mut receiver = EventReceiver::new(state.event_bus.subscribe(), filter, "dashboard_sse".to_string());

    debug!("New event stream client connected");

    let shutdown = state.shutdown.clone();
    let stream = async_stream::stream! {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = receiver.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            match Event::default().event(event.event_type()).json_data(&event) {
                Ok(sse_event) => yield Ok::<_, Infallible>(sse_event),
                Err(e) => warn!("Failed to serialize event for stream: {}", e),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Multipart MJPEG stream of annotated frames
pub async fn mjpeg_stream_handler(State(state): State<DashboardState>) -> Response {
    info!("New MJPEG stream client connected");

    let frames = state.monitor.subscribe_frames();
    let shutdown = state.shutdown.clone();
    let stream = async_stream::stream! {
        let mut frame_interval = interval(state.frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frames_streamed = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = frame_interval.tick() => {}
            }

            let latest = frames.borrow().clone();
            let Some(frame) = latest else {
                continue;
            };
            if frame.jpeg.is_empty() {
                continue;
            }

            let boundary = format!(
                "--FRAME\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nX-Frame-ID: {}\r\nX-Timestamp: {}\r\n\r\n",
                frame.jpeg.len(),
                frame.id,
                frame.timestamp.duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis()
            );

            yield Ok::<_, Infallible>(Bytes::from(boundary));
            yield Ok(Bytes::from(frame.jpeg.as_ref().clone()));
            yield Ok(Bytes::from_static(b"\r\n"));

            frames_streamed += 1;
            if frames_streamed % 500 == 0 {
                debug!("MJPEG client received {} frames", frames_streamed);
            }
        }

        debug!("MJPEG stream closed after {} frames", frames_streamed);
    };

    (
        [
            (header::CONTENT_TYPE, "multipart/x-mixed-replace; boundary=FRAME"),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
        ],
        axum::body::Body::from_stream(stream),
    )
        .into_response()
}

pub async fn health_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let snapshot = state.monitor.snapshot();

    let health_info = json!({
        "status": "healthy",
        "monitor_running": state.monitor.is_running(),
        "camera_active": snapshot.camera_active,
        "camera_error": snapshot.camera_error,
        "latest_frame_id": state.monitor.latest_frame().map(|f| f.id),
        "site": snapshot.site,
        "event_subscribers": state.event_bus.subscriber_count(),
    });

    (StatusCode::OK, Json(health_info))
}
