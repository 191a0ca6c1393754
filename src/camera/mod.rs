#[cfg(all(feature = "camera", target_os = "linux"))]
mod gstreamer_source;
mod mock;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gstreamer_source::GstCamera;
pub use mock::MockCamera;

use crate::config::{CameraConfig, CameraSource};
use crate::error::Result;
use crate::frame::FrameData;
use async_trait::async_trait;
use tracing::info;

/// A camera-like producer of frames, held exclusively by the monitor loop
#[async_trait]
pub trait FrameSource: Send {
    /// Read the next frame; an error means the feed is lost
    async fn read_frame(&mut self) -> Result<FrameData>;

    /// Release the underlying device. Safe to call more than once.
    async fn release(&mut self) -> Result<()>;

    fn describe(&self) -> String;
}

/// Open the frame source selected in the configuration
pub async fn open_frame_source(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match config.source {
        CameraSource::Mock => Box::new(MockCamera::new(config.clone())),
        CameraSource::Gstreamer => open_gstreamer(config).await?,
    };
    info!("Opened frame source: {}", source.describe());
    Ok(source)
}

#[cfg(all(feature = "camera", target_os = "linux"))]
async fn open_gstreamer(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(GstCamera::open(config.clone()).await?))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
async fn open_gstreamer(config: &CameraConfig) -> Result<Box<dyn FrameSource>> {
    tracing::warn!("GStreamer capture is only available on Linux with the camera feature; using mock frames");
    Ok(Box::new(MockCamera::new(config.clone())))
}
