use super::FrameSource;
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::FrameData;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// V4L2 camera captured through a GStreamer MJPEG pipeline
pub struct GstCamera {
    config: CameraConfig,
    pipeline: Pipeline,
    appsink: AppSink,
    frame_counter: u64,
    released: bool,
}

impl GstCamera {
    /// Build the pipeline and start it playing
    pub async fn open(config: CameraConfig) -> Result<Self> {
        info!(
            "Opening GStreamer camera for device {} ({}x{} @ {}fps)",
            config.index, config.resolution.0, config.resolution.1, config.fps
        );

        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = Self::build_pipeline_string(&config);
        debug!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Pipeline has no appsink named 'sink'".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Element 'sink' is not an AppSink".to_string(),
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::DeviceOpen {
                device: config.index,
                details: e.to_string(),
            })?;

        info!("GStreamer pipeline started");

        Ok(Self {
            config,
            pipeline,
            appsink,
            frame_counter: 0,
            released: false,
        })
    }

    fn build_pipeline_string(config: &CameraConfig) -> String {
        let (width, height) = config.resolution;
        format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=2 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=1 drop=true emit-signals=false",
            config.index, width, height, config.fps
        )
    }

    fn sample_to_frame(&mut self, sample: gstreamer::Sample) -> Result<FrameData> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::CaptureStream {
            details: "No caps in sample".to_string(),
        })?;

        // MJPEG caps carry no raw video layout; fall back to the requested size
        let (width, height) = match VideoInfo::from_caps(caps) {
            Ok(info) => (info.width(), info.height()),
            Err(_) => self.config.resolution,
        };

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to map buffer: {}", e),
            })?;

        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        trace!(
            "Captured MJPEG frame {} ({}x{}, {} bytes)",
            frame_id,
            width,
            height,
            map.len()
        );

        Ok(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width,
            height
        ))
    }
}

#[async_trait]
impl FrameSource for GstCamera {
    async fn read_frame(&mut self) -> Result<FrameData> {
        if self.released {
            return Err(CameraError::Released.into());
        }

        let appsink = self.appsink.clone();
        let timeout_ms = self.config.read_timeout_ms;
        let sample = tokio::task::spawn_blocking(move || {
            appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout_ms))
        })
        .await
        .map_err(|e| CameraError::CaptureStream {
            details: format!("Capture task failed: {}", e),
        })?;

        match sample {
            Some(sample) => self.sample_to_frame(sample),
            None if self.appsink.is_eos() => Err(CameraError::CaptureStream {
                details: "End of stream".to_string(),
            }
            .into()),
            None => Err(CameraError::FrameTimeout { timeout_ms }.into()),
        }
    }

    async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to stop pipeline: {}", e),
            })?;
        info!("GStreamer camera released after {} frame(s)", self.frame_counter);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("gstreamer:/dev/video{}", self.config.index)
    }
}

impl Drop for GstCamera {
    fn drop(&mut self) {
        if !self.released {
            warn!("GStreamer camera dropped without release; stopping pipeline");
            let _ = self.pipeline.set_state(gstreamer::State::Null);
        }
    }
}
