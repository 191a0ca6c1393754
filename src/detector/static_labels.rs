use super::{Detection, DetectionResult, Detector};
use crate::error::DetectorError;
use crate::frame::FrameData;
use async_trait::async_trait;

/// Reports the same labels for every frame
pub struct StaticDetector {
    labels: Vec<String>,
}

impl StaticDetector {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }
}

#[async_trait]
impl Detector for StaticDetector {
    async fn detect(&self, _frame: &FrameData) -> Result<DetectionResult, DetectorError> {
        Ok(DetectionResult {
            detections: self.labels.iter().map(Detection::labelled).collect(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}
