//! Static preview framing.
//!
//! Thumbnails and quick previews use one fixed crop per clip instead of the
//! full per-frame engine. The focus is the average position of the largest
//! face over a handful of evenly spaced frames.

use tracing::{debug, warn};
use vclip_models::{AspectRatio, FrameRange, NormalizedPoint, NormalizedRect};

use crate::detection::FaceDetector;
use crate::engine::models::{CropRect, Point};
use crate::error::{ReframeError, ReframeResult};
use crate::frame::FrameSource;

/// Average normalised position of the most prominent face over `samples`
/// evenly spaced frames of `range`.
///
/// Frames where detection fails or finds nothing are skipped. Returns the
/// frame center when no face is found at all.
pub fn estimate_preview_focus<S, D>(
    source: &mut S,
    detector: &mut D,
    range: FrameRange,
    samples: usize,
) -> ReframeResult<NormalizedPoint>
where
    S: FrameSource + ?Sized,
    D: FaceDetector + ?Sized,
{
    if range.is_empty() {
        return Err(ReframeError::input("preview range is empty"));
    }
    if range.end_frame() > source.frame_count() {
        return Err(ReframeError::input(format!(
            "preview range ends at {} but source has {} frames",
            range.end_frame(),
            source.frame_count()
        )));
    }

    let (width, height) = source.dimensions();
    let mut sum = (0.0, 0.0);
    let mut hits = 0usize;

    for index in sample_indices(range, samples.max(1)) {
        let frame = source.read_frame(index)?;
        let detections = match detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(frame = index, error = %e, "Preview detection failed");
                continue;
            }
        };

        let largest = detections.iter().filter(|d| d.bbox.is_valid()).max_by(|a, b| {
            a.bbox
                .area()
                .partial_cmp(&b.bbox.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(face) = largest {
            let center = NormalizedPoint::from_pixels(
                face.bbox.center().x,
                face.bbox.center().y,
                width,
                height,
            );
            sum.0 += center.x;
            sum.1 += center.y;
            hits += 1;
        }
    }

    if hits == 0 {
        debug!("No faces in preview samples, using frame center");
        return Ok(NormalizedPoint::CENTER);
    }

    Ok(NormalizedPoint::new(sum.0 / hits as f64, sum.1 / hits as f64))
}

/// Largest `aspect` crop centred on `focus`, translated inside the frame.
pub fn preview_crop_rect(
    focus: NormalizedPoint,
    frame_width: u32,
    frame_height: u32,
    aspect: AspectRatio,
) -> CropRect {
    let (width, height) = aspect.fit_within(frame_width, frame_height);
    CropRect::centered_within(
        Point::new(
            focus.x * frame_width as f64,
            focus.y * frame_height as f64,
        ),
        width,
        height,
        frame_width,
        frame_height,
    )
}

/// [`preview_crop_rect`] as a normalised rectangle.
pub fn preview_crop_normalized(
    focus: NormalizedPoint,
    frame_width: u32,
    frame_height: u32,
    aspect: AspectRatio,
) -> NormalizedRect {
    let rect = preview_crop_rect(focus, frame_width, frame_height, aspect);
    let fw = frame_width.max(1) as f64;
    let fh = frame_height.max(1) as f64;
    NormalizedRect::new(
        rect.x as f64 / fw,
        rect.y as f64 / fh,
        rect.width as f64 / fw,
        rect.height as f64 / fh,
    )
}

fn sample_indices(range: FrameRange, samples: usize) -> Vec<u64> {
    let count = range.frame_count;
    let samples = (samples as u64).min(count);
    (0..samples)
        .map(|i| range.start_frame + i * count / samples)
        .collect()
}
