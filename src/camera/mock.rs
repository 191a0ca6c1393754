use super::FrameSource;
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::FrameData;
use async_trait::async_trait;
use image::{ImageOutputFormat, Rgb, RgbImage};
use std::time::SystemTime;
use tracing::{debug, trace};

/// Synthetic camera producing small JPEG frames with a moving bar
pub struct MockCamera {
    config: CameraConfig,
    frame_counter: u64,
    fail_after: Option<u64>,
    released: bool,
}

impl MockCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_counter: 0,
            fail_after: None,
            released: false,
        }
    }

    /// Simulate a lost feed once `frames` frames have been produced
    pub fn with_failure_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    fn render(&self, frame_id: u64) -> Result<Vec<u8>> {
        let (width, height) = self.config.resolution;
        let bar_x = (frame_id * 8 % width.max(1) as u64) as u32;
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x >= bar_x && x < bar_x + 16 {
                Rgb([230, 160, 40])
            } else {
                Rgb([48, 52, 60])
            }
        });

        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), ImageOutputFormat::Jpeg(75))
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to encode mock frame: {}", e),
            })?;
        Ok(out)
    }
}

#[async_trait]
impl FrameSource for MockCamera {
    async fn read_frame(&mut self) -> Result<FrameData> {
        if self.released {
            return Err(CameraError::Released.into());
        }

        if let Some(limit) = self.fail_after {
            if self.frame_counter >= limit {
                return Err(CameraError::CaptureStream {
                    details: "Mock camera disconnected".to_string(),
                }
                .into());
            }
        }

        let frame_id = self.frame_counter;
        self.frame_counter += 1;
        let data = self.render(frame_id)?;

        trace!("Generated mock frame {} ({} bytes)", frame_id, data.len());

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            data,
            self.config.resolution.0,
            self.config.resolution.1
        ))
    }

    async fn release(&mut self) -> Result<()> {
        if !self.released {
            debug!("Mock camera released after {} frame(s)", self.frame_counter);
        }
        self.released = true;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "mock:{}x{}",
            self.config.resolution.0, self.config.resolution.1
        )
    }
}
