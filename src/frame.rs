use std::sync::Arc;
use std::time::SystemTime;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// One captured camera frame, JPEG encoded
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Monotonic frame identifier within one capture session
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Encoded frame (shared ownership so the frame can be published cheaply)
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl FrameData {
    pub fn new(id: u64, timestamp: SystemTime, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
        }
    }

    /// True when the payload starts with a JPEG start-of-image marker
    pub fn is_jpeg(&self) -> bool {
        self.data.starts_with(&JPEG_SOI)
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Shared handle to the encoded payload
    pub fn jpeg(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.data)
    }
}
