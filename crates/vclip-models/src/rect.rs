use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point in normalized frame coordinates (0.0 to 1.0 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedPoint {
    /// 0.0 = left edge, 1.0 = right edge
    pub x: f64,
    /// 0.0 = top edge, 1.0 = bottom edge
    pub y: f64,
}

impl NormalizedPoint {
    /// Frame center.
    pub const CENTER: NormalizedPoint = NormalizedPoint { x: 0.5, y: 0.5 };

    /// Create a new point, clamped into the unit square.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Convert a pixel position into normalized coordinates.
    pub fn from_pixels(x: f64, y: f64, frame_width: u32, frame_height: u32) -> Self {
        if frame_width == 0 || frame_height == 0 {
            return Self::CENTER;
        }
        Self::new(x / frame_width as f64, y / frame_height as f64)
    }
}

impl Default for NormalizedPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// A normalized rectangle (0.0 to 1.0) representing a relative region of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRect {
    /// X coordinate of the top-left corner
    pub x: f64,
    /// Y coordinate of the top-left corner
    pub y: f64,
    /// Width of the rectangle
    pub width: f64,
    /// Height of the rectangle
    pub height: f64,
}

impl NormalizedRect {
    /// Create a new normalized rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the rectangle lies inside the unit square.
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.001 // float slack
            && self.y + self.height <= 1.001
    }

    /// Center of the rectangle.
    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Convert to integer pixel coordinates `(x, y, width, height)`.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> (u32, u32, u32, u32) {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let x = (self.x * fw).round().max(0.0) as u32;
        let y = (self.y * fh).round().max(0.0) as u32;
        let width = ((self.width * fw).round() as u32).min(frame_width.saturating_sub(x));
        let height = ((self.height * fh).round() as u32).min(frame_height.saturating_sub(y));
        (x, y, width, height)
    }
}
