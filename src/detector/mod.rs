mod http;
mod static_labels;

pub use http::HttpDetector;
pub use static_labels::StaticDetector;

use crate::config::{DetectorConfig, DetectorKind};
use crate::error::{DetectorError, Result};
use crate::frame::FrameData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One labelled box reported by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    /// `[x_min, y_min, x_max, y_max]` in frame pixels
    #[serde(default)]
    pub bbox: Option<[f32; 4]>,
}

fn full_confidence() -> f32 {
    1.0
}

impl Detection {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: 1.0,
            bbox: None,
        }
    }
}

/// Everything the model reported for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    /// Labels in detection order, duplicates kept
    pub fn labels(&self) -> Vec<&str> {
        self.detections.iter().map(|d| d.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Drop detections below `threshold`
    pub fn retain_confident(&mut self, threshold: f32) {
        self.detections.retain(|d| d.confidence >= threshold);
    }
}

/// Object detection model: frame in, labelled boxes out
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &FrameData) -> std::result::Result<DetectionResult, DetectorError>;

    fn name(&self) -> &str;
}

/// Build the detector selected in the configuration
pub fn create_detector(config: &DetectorConfig) -> Result<Arc<dyn Detector>> {
    let detector: Arc<dyn Detector> = match config.kind {
        DetectorKind::Http => Arc::new(HttpDetector::new(config)?),
        DetectorKind::Static => Arc::new(StaticDetector::new(config.static_labels.clone())),
    };
    info!("Using {} detector", detector.name());
    Ok(detector)
}
