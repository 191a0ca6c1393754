use super::{DetectionResult, Detector};
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::frame::FrameData;
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use std::time::Duration;
use tracing::trace;

/// Sends JPEG frames to a remote inference service.
///
/// The service answers with
/// `{"detections": [{"label": "helmet", "confidence": 0.9, "bbox": [x1, y1, x2, y2]}]}`.
pub struct HttpDetector {
    client: Client,
    endpoint: Url,
    confidence_threshold: f32,
}

impl HttpDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| DetectorError::Configuration {
            details: format!("Invalid detector endpoint '{}': {}", config.endpoint, e),
        })?;

        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(DetectorError::Configuration {
                details: "Detector endpoint must use http or https".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            confidence_threshold: config.confidence_threshold,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, frame: &FrameData) -> Result<DetectionResult, DetectorError> {
        let jpeg = frame.jpeg();

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "image/jpeg")
            .header("X-Frame-ID", frame.id.to_string())
            .body(jpeg.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut result: DetectionResult =
            response
                .json()
                .await
                .map_err(|e| DetectorError::InvalidResponse {
                    details: e.to_string(),
                })?;
        result.retain_confident(self.confidence_threshold);

        trace!("Frame {}: {} detection(s)", frame.id, result.len());
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}
