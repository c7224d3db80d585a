//! Face detection seam.
//!
//! The detector model itself lives outside the engine. The orchestrator
//! calls a [`FaceDetector`] on sampled frames and treats any error from it
//! as "no faces this frame".

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::models::{BoundingBox, Point};
use crate::error::{ReframeError, ReframeResult};
use crate::frame::Frame;

/// Upper and lower lip landmarks in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthLandmarks {
    pub upper_lip: Point,
    pub lower_lip: Point,
}

impl MouthLandmarks {
    pub fn new(upper_lip: Point, lower_lip: Point) -> Self {
        Self {
            upper_lip,
            lower_lip,
        }
    }

    /// Lip gap as a percentage of `face_height`.
    ///
    /// Returns `None` when the face height is not positive or a landmark is
    /// not finite.
    pub fn openness(&self, face_height: f64) -> Option<f64> {
        if !(face_height.is_finite() && face_height > 0.0) {
            return None;
        }
        let gap = self.upper_lip.distance(&self.lower_lip);
        gap.is_finite().then(|| gap / face_height * 100.0)
    }
}

/// One raw face observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    #[serde(default)]
    pub mouth: Option<MouthLandmarks>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            bbox,
            confidence,
            mouth: None,
        }
    }

    pub fn with_mouth(mut self, mouth: MouthLandmarks) -> Self {
        self.mouth = Some(mouth);
        self
    }

    /// Mouth openness for this detection, if landmarks are present.
    pub fn mouth_openness(&self) -> Option<f64> {
        self.mouth.and_then(|m| m.openness(self.bbox.height))
    }
}

/// Per-frame face detector.
pub trait FaceDetector {
    /// Detect faces in `frame`. An error means detection is unavailable for
    /// this frame only.
    fn detect(&mut self, frame: &Frame) -> ReframeResult<Vec<Detection>>;
}

impl<F> FaceDetector for F
where
    F: FnMut(&Frame) -> ReframeResult<Vec<Detection>>,
{
    fn detect(&mut self, frame: &Frame) -> ReframeResult<Vec<Detection>> {
        self(frame)
    }
}

/// Detector that never finds a face. Renders fall back to static framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn detect(&mut self, _frame: &Frame) -> ReframeResult<Vec<Detection>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RecordedFrame {
    frame: u64,
    #[serde(default)]
    detections: Vec<Detection>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Recording {
    frames: Vec<RecordedFrame>,
}

/// Replays detections recorded by an offline detector run.
///
/// The file is JSON of the form
/// `{"frames": [{"frame": 0, "detections": [{"bbox": {...}, "confidence": 0.9}]}]}`.
/// A frame listed with no detections means "no faces"; a frame that is not
/// listed at all is reported as detection unavailable.
#[derive(Debug, Default)]
pub struct RecordedDetector {
    frames: HashMap<u64, Vec<Detection>>,
}

impl RecordedDetector {
    pub fn new(frames: HashMap<u64, Vec<Detection>>) -> Self {
        Self { frames }
    }

    pub fn from_json(json: &str) -> ReframeResult<Self> {
        let recording: Recording = serde_json::from_str(json)?;
        let frames = recording
            .frames
            .into_iter()
            .map(|f| (f.frame, f.detections))
            .collect();
        Ok(Self { frames })
    }

    pub fn load(path: impl AsRef<Path>) -> ReframeResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReframeError::input(format!("detections file {}: {}", path.display(), e))
        })?;
        let detector = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            frames = detector.frames.len(),
            "Loaded recorded detections"
        );
        Ok(detector)
    }

    pub fn recorded_frames(&self) -> usize {
        self.frames.len()
    }
}

impl FaceDetector for RecordedDetector {
    fn detect(&mut self, frame: &Frame) -> ReframeResult<Vec<Detection>> {
        self.frames.get(&frame.index).cloned().ok_or_else(|| {
            ReframeError::detection_unavailable(format!("no recording for frame {}", frame.index))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame(index: u64) -> Frame {
        Frame::new(index, RgbImage::new(4, 4))
    }

    #[test]
    fn test_mouth_openness_is_percent_of_face_height() {
        let mouth = MouthLandmarks::new(Point::new(50.0, 60.0), Point::new(50.0, 70.0));
        assert_eq!(mouth.openness(200.0), Some(5.0));
        assert_eq!(mouth.openness(0.0), None);

        let det = Detection::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9).with_mouth(mouth);
        assert_eq!(det.mouth_openness(), Some(10.0));
        assert_eq!(Detection::new(det.bbox, 0.9).mouth_openness(), None);
    }

    #[test]
    fn test_recorded_detector_replays_frames() {
        let json = r#"{
            "frames": [
                {"frame": 0, "detections": [
                    {"bbox": {"x": 100.0, "y": 100.0, "width": 200.0, "height": 200.0},
                     "confidence": 0.95,
                     "mouth": {"upper_lip": {"x": 200.0, "y": 250.0},
                               "lower_lip": {"x": 200.0, "y": 262.0}}}
                ]},
                {"frame": 2}
            ]
        }"#;
        let mut detector = RecordedDetector::from_json(json).unwrap();
        assert_eq!(detector.recorded_frames(), 2);

        let dets = detector.detect(&frame(0)).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].mouth_openness(), Some(6.0));

        assert!(detector.detect(&frame(2)).unwrap().is_empty());
        assert!(matches!(
            detector.detect(&frame(1)),
            Err(ReframeError::DetectionUnavailable(_))
        ));
    }

    #[test]
    fn test_recorded_detector_bad_json() {
        assert!(matches!(
            RecordedDetector::from_json("{\"frames\": 3}"),
            Err(ReframeError::JsonParse(_))
        ));
    }

    #[test]
    fn test_closure_detector() {
        let mut calls = 0;
        let mut detector = |_: &Frame| -> ReframeResult<Vec<Detection>> {
            calls += 1;
            Ok(Vec::new())
        };
        assert!(detector.detect(&frame(0)).unwrap().is_empty());
        assert!(NoFaceDetector.detect(&frame(0)).unwrap().is_empty());
        drop(detector);
        assert_eq!(calls, 1);
    }
}
