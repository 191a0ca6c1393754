//! Detection box annotation for published frames.

use crate::detector::{Detection, DetectionResult};
use crate::error::{PpeError, Result};
use crate::frame::FrameData;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use std::sync::Arc;
use tracing::{debug, warn};

const REQUIRED_COLOR: Rgba<u8> = Rgba([40, 200, 80, 255]);
const OTHER_COLOR: Rgba<u8> = Rgba([240, 180, 40, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Draws detection boxes and labels onto JPEG frames
pub struct Annotator {
    font: Option<Font<'static>>,
    font_size: f32,
}

impl Annotator {
    /// Load the label font; boxes are still drawn when it is unavailable
    pub fn new(font_path: &str, font_size: f32) -> Self {
        let font = match std::fs::read(font_path) {
            Ok(data) => match Font::try_from_vec(data) {
                Some(font) => Some(font),
                None => {
                    warn!("Failed to parse font file '{}'; labels disabled", font_path);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read font file '{}': {}; labels disabled", font_path, e);
                None
            }
        };

        Self { font, font_size }
    }

    /// Annotator that draws boxes only
    pub fn without_labels() -> Self {
        Self {
            font: None,
            font_size: 0.0,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Annotate a frame, falling back to the raw frame when drawing fails
    pub fn annotate_or_raw(
        &self,
        frame: &FrameData,
        detections: &DetectionResult,
        required: &[String],
    ) -> Arc<Vec<u8>> {
        if detections.detections.iter().all(|d| d.bbox.is_none()) {
            return self.raw(frame);
        }

        match self.annotate(frame, detections, required) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("Frame {} annotation failed: {}", frame.id, e);
                self.raw(frame)
            }
        }
    }

    fn raw(&self, frame: &FrameData) -> Arc<Vec<u8>> {
        frame.jpeg()
    }

    /// Decode, draw every boxed detection and re-encode as JPEG
    pub fn annotate(
        &self,
        frame: &FrameData,
        detections: &DetectionResult,
        required: &[String],
    ) -> Result<Arc<Vec<u8>>> {
        let jpeg = frame.jpeg();

        let mut img = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .map_err(|e| annotation_error(format!("Failed to decode JPEG for overlay: {}", e)))?
            .to_rgba8();

        let mut drawn = 0;
        for detection in &detections.detections {
            let color = if required.iter().any(|r| r == &detection.label) {
                REQUIRED_COLOR
            } else {
                OTHER_COLOR
            };
            if self.draw_detection(&mut img, detection, color) {
                drawn += 1;
            }
        }

        let mut output = Vec::new();
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8())
            .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Jpeg)
            .map_err(|e| annotation_error(format!("Failed to encode annotated JPEG: {}", e)))?;

        debug!("Annotated frame {} with {} box(es)", frame.id, drawn);
        Ok(Arc::new(output))
    }

    fn draw_detection(&self, img: &mut RgbaImage, detection: &Detection, color: Rgba<u8>) -> bool {
        let Some(rect) = detection.bbox.and_then(|b| clamp_box(b, img.width(), img.height())) else {
            return false;
        };

        // Two nested outlines for a 2px border
        draw_hollow_rect_mut(img, rect, color);
        if rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                .of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(img, inner, color);
        }

        if let Some(font) = &self.font {
            let scale = Scale::uniform(self.font_size);
            let text = format!("{} {:.2}", detection.label, detection.confidence);
            let (text_width, text_height) = text_size(scale, font, &text);
            let label_top = (rect.top() - text_height - 4).max(0);
            if text_width > 0 && text_height > 0 {
                let background = Rect::at(rect.left(), label_top)
                    .of_size(text_width as u32 + 4, text_height as u32 + 4);
                draw_filled_rect_mut(img, background, color);
            }
            draw_text_mut(img, TEXT_COLOR, rect.left() + 2, label_top + 2, scale, font, &text);
        }

        true
    }
}

/// Clip `[x1, y1, x2, y2]` to the image; `None` for empty boxes
fn clamp_box(bbox: [f32; 4], width: u32, height: u32) -> Option<Rect> {
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    let x1 = bbox[0].min(bbox[2]).clamp(0.0, max_x) as i32;
    let y1 = bbox[1].min(bbox[3]).clamp(0.0, max_y) as i32;
    let x2 = bbox[0].max(bbox[2]).clamp(0.0, max_x) as i32;
    let y2 = bbox[1].max(bbox[3]).clamp(0.0, max_y) as i32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    // Corners are inclusive pixel coordinates
    Some(Rect::at(x1, y1).of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32))
}

fn annotation_error(message: String) -> PpeError {
    PpeError::component("overlay".to_string(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn gray_frame(width: u32, height: u32) -> FrameData {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        FrameData::new(7, SystemTime::now(), jpeg, width, height)
    }

    fn boxed(label: &str, bbox: [f32; 4]) -> Detection {
        Detection {
            label: label.to_string(),
            confidence: 0.9,
            bbox: Some(bbox),
        }
    }

    #[test]
    fn clamp_box_clips_to_frame() {
        let rect = clamp_box([-10.0, 5.0, 500.0, 40.0], 100, 50).unwrap();
        assert_eq!(rect.left(), 0);
        assert_eq!(rect.top(), 5);
        assert_eq!(rect.right(), 99);
        assert_eq!(rect.bottom(), 40);

        let inner = clamp_box([8.0, 8.0, 40.0, 40.0], 64, 48).unwrap();
        assert_eq!((inner.left(), inner.right()), (8, 40));
        assert_eq!((inner.top(), inner.bottom()), (8, 40));
        assert_eq!(inner.width(), 33);

        assert!(clamp_box([10.0, 10.0, 10.0, 30.0], 100, 50).is_none());
    }

    #[test]
    fn required_items_are_drawn_in_green() {
        let annotator = Annotator::without_labels();
        let frame = gray_frame(64, 48);
        let detections = DetectionResult {
            detections: vec![boxed("helmet", [8.0, 8.0, 40.0, 40.0])],
        };

        let jpeg = annotator
            .annotate(&frame, &detections, &["helmet".to_string()])
            .unwrap();
        let img = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let edge = img.get_pixel(8, 20);
        assert!(edge[1] > edge[0] && edge[1] > edge[2], "pixel {:?}", edge);
    }

    #[test]
    fn frames_without_boxes_are_passed_through() {
        let annotator = Annotator::without_labels();
        let frame = gray_frame(32, 24);
        let detections = DetectionResult {
            detections: vec![Detection::labelled("vest")],
        };

        let out = annotator.annotate_or_raw(&frame, &detections, &[]);
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn undecodable_frame_falls_back_to_raw() {
        let annotator = Annotator::without_labels();
        let frame = FrameData::new(1, SystemTime::now(), vec![1, 2, 3], 10, 10);
        let detections = DetectionResult {
            detections: vec![boxed("vest", [1.0, 1.0, 5.0, 5.0])],
        };

        let out = annotator.annotate_or_raw(&frame, &detections, &[]);
        assert_eq!(out.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn missing_font_disables_labels() {
        let annotator = Annotator::new("/nonexistent/font.ttf", 16.0);
        assert!(!annotator.has_font());
    }
}
