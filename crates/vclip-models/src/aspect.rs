//! Output aspect ratios for reframed clips.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aspect ratio as an integer width:height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Vertical 9:16 (Shorts, Reels, TikTok).
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Aspect ratio of a pixel canvas, reduced by the greatest common divisor.
    ///
    /// Returns `None` for a zero-sized canvas.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let divisor = gcd(width, height);
        Some(Self::new(width / divisor, height / divisor))
    }

    /// Returns width / height as a float.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Largest `(width, height)` with this ratio that fits inside a
    /// `frame_width` x `frame_height` frame.
    ///
    /// Wide frames keep their full height; narrow frames keep their full width.
    pub fn fit_within(&self, frame_width: u32, frame_height: u32) -> (u32, u32) {
        let ratio = self.as_f64();
        let full_height_width = (frame_height as f64 * ratio).round() as u32;
        if full_height_width <= frame_width {
            (full_height_width.max(1), frame_height)
        } else {
            let height = (frame_width as f64 / ratio).round() as u32;
            (frame_width, height.clamp(1, frame_height.max(1)))
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AspectRatioParseError::InvalidFormat(s.to_string()))?;

        let width: u32 = width
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(width.to_string()))?;
        let height: u32 = height
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(height.to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aspect_ratio() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::PORTRAIT);
        assert!(matches!(
            "916".parse::<AspectRatio>(),
            Err(AspectRatioParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "0:16".parse::<AspectRatio>(),
            Err(AspectRatioParseError::ZeroValue)
        ));
    }

    #[test]
    fn test_from_dimensions_reduces() {
        assert_eq!(
            AspectRatio::from_dimensions(1080, 1920),
            Some(AspectRatio::PORTRAIT)
        );
        assert_eq!(AspectRatio::from_dimensions(0, 1920), None);
    }

    #[test]
    fn test_fit_within_wide_frame_keeps_height() {
        let (w, h) = AspectRatio::PORTRAIT.fit_within(1920, 1080);
        assert_eq!(h, 1080);
        assert_eq!(w, 608);
    }

    #[test]
    fn test_fit_within_narrow_frame_keeps_width() {
        // 9:16 crop from a 400x1080 frame: full height would need 608px width
        let (w, h) = AspectRatio::PORTRAIT.fit_within(400, 1080);
        assert_eq!(w, 400);
        assert_eq!(h, 711);
    }
}
