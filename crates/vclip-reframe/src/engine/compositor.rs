//! Renders output frames from a source frame and a crop plan.
//!
//! Single-region plans are cropped and scaled to the full canvas. Split
//! plans scale each crop into its half and stack them with no gap: the top
//! half gets `height / 2` rows and the bottom half the rest.

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

use super::crop_planner::{CropPlan, OutputRegion};
use super::models::CropRect;
use crate::error::{ReframeError, ReframeResult};
use crate::frame::Frame;

/// Bilinear resampling for scaled crops.
const SCALE_FILTER: FilterType = FilterType::Triangle;

/// Composes output frames at a fixed resolution.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    output_width: u32,
    output_height: u32,
    frame_width: u32,
    frame_height: u32,
    /// Last rectangle rendered into each region, reused when a plan entry
    /// is unusable
    last_valid: [Option<CropRect>; 3],
}

impl FrameCompositor {
    pub fn new(frame_width: u32, frame_height: u32, output_width: u32, output_height: u32) -> Self {
        Self {
            output_width,
            output_height,
            frame_width,
            frame_height,
            last_valid: [None; 3],
        }
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    pub fn compose(&mut self, frame: &Frame, plan: &CropPlan) -> ReframeResult<RgbImage> {
        if (frame.width(), frame.height()) != (self.frame_width, self.frame_height) {
            return Err(ReframeError::input(format!(
                "frame {} is {}x{}, expected {}x{}",
                frame.index,
                frame.width(),
                frame.height(),
                self.frame_width,
                self.frame_height
            )));
        }
        if plan.entries.is_empty() || plan.entries.len() > 2 {
            return Err(ReframeError::processing(format!(
                "crop plan for frame {} has {} entries",
                frame.index,
                plan.entries.len()
            )));
        }

        let mut canvas = RgbImage::new(self.output_width, self.output_height);
        for entry in &plan.entries {
            let rect = self.resolve(entry.region, entry.source, frame.index)?;
            let (y_offset, rows) = entry.region.rows(self.output_height);

            let crop = imageops::crop_imm(&frame.image, rect.x, rect.y, rect.width, rect.height)
                .to_image();
            let scaled = if crop.dimensions() == (self.output_width, rows) {
                crop
            } else {
                imageops::resize(&crop, self.output_width, rows, SCALE_FILTER)
            };
            imageops::replace(&mut canvas, &scaled, 0, y_offset as i64);
        }

        Ok(canvas)
    }

    /// The plan's rectangle if usable, otherwise the last one rendered into
    /// the same region.
    fn resolve(
        &mut self,
        region: OutputRegion,
        rect: CropRect,
        frame_index: u64,
    ) -> ReframeResult<CropRect> {
        let slot = region.slot();
        if rect.fits_within(self.frame_width, self.frame_height) {
            self.last_valid[slot] = Some(rect);
            return Ok(rect);
        }

        match self.last_valid[slot] {
            Some(previous) => {
                debug!(
                    frame = frame_index,
                    region = ?region,
                    "Reusing last valid crop rectangle"
                );
                Ok(previous)
            }
            None => Err(ReframeError::processing(format!(
                "no valid crop rectangle for {:?} region on frame {}",
                region, frame_index
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::crop_planner::CropEntry;
    use crate::engine::models::{Point, TrackId};
    use image::Rgb;
    use vclip_models::ReframeMode;

    /// Left half red, right half blue.
    fn two_tone_frame(width: u32, height: u32) -> Frame {
        let image = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        Frame::new(0, image)
    }

    fn entry(rect: CropRect, region: OutputRegion) -> CropEntry {
        CropEntry {
            track_id: Some(TrackId(1)),
            focus: rect.center(),
            source: rect,
            region,
        }
    }

    #[test]
    fn test_single_region_fills_canvas() {
        let mut compositor = FrameCompositor::new(160, 90, 27, 48);
        let plan = CropPlan {
            mode: ReframeMode::Solo,
            entries: vec![entry(CropRect::new(0, 0, 50, 90), OutputRegion::Full)],
        };
        let out = compositor.compose(&two_tone_frame(160, 90), &plan).unwrap();
        assert_eq!(out.dimensions(), (27, 48));
        assert_eq!(out.get_pixel(13, 24), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_split_stacks_halves_without_gap() {
        let mut compositor = FrameCompositor::new(160, 90, 20, 41);
        let plan = CropPlan {
            mode: ReframeMode::DuoSplit,
            entries: vec![
                entry(CropRect::new(0, 0, 40, 90), OutputRegion::Top),
                entry(CropRect::new(120, 0, 40, 90), OutputRegion::Bottom),
            ],
        };
        let out = compositor.compose(&two_tone_frame(160, 90), &plan).unwrap();
        assert_eq!(out.dimensions(), (20, 41));
        // Top gets 20 rows, bottom gets 21.
        assert_eq!(out.get_pixel(10, 0), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(10, 19), &Rgb([255, 0, 0]));
        assert_eq!(out.get_pixel(10, 20), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(10, 40), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_invalid_rect_reuses_last_valid() {
        let mut compositor = FrameCompositor::new(160, 90, 27, 48);
        let frame = two_tone_frame(160, 90);
        let good = CropPlan {
            mode: ReframeMode::Solo,
            entries: vec![entry(CropRect::new(110, 0, 50, 90), OutputRegion::Full)],
        };
        compositor.compose(&frame, &good).unwrap();

        let bad = CropPlan {
            mode: ReframeMode::Solo,
            entries: vec![CropEntry {
                track_id: None,
                focus: Point::new(0.0, 0.0),
                source: CropRect::new(150, 0, 50, 90),
                region: OutputRegion::Full,
            }],
        };
        let out = compositor.compose(&frame, &bad).unwrap();
        assert_eq!(out.get_pixel(13, 24), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_invalid_rect_without_history_is_error() {
        let mut compositor = FrameCompositor::new(160, 90, 27, 48);
        let plan = CropPlan {
            mode: ReframeMode::Solo,
            entries: vec![entry(CropRect::new(0, 0, 0, 90), OutputRegion::Full)],
        };
        assert!(matches!(
            compositor.compose(&two_tone_frame(160, 90), &plan),
            Err(ReframeError::Processing(_))
        ));
    }

    #[test]
    fn test_frame_size_mismatch_is_input_error() {
        let mut compositor = FrameCompositor::new(160, 90, 27, 48);
        let plan = CropPlan {
            mode: ReframeMode::Solo,
            entries: vec![entry(CropRect::new(0, 0, 50, 90), OutputRegion::Full)],
        };
        assert!(matches!(
            compositor.compose(&two_tone_frame(100, 90), &plan),
            Err(ReframeError::Input(_))
        ));
    }
}
