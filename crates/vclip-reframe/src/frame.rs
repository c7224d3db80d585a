//! Decoded frames and the source/sink seams the engine renders through.
//!
//! Decoding and encoding are the caller's business. The engine reads
//! frames by absolute index from a [`FrameSource`] and hands composited
//! output to a [`FrameSink`] in order.
//!
//! # Provided implementations
//! - [`VecFrameSource`] / [`VecFrameSink`]: in-memory, for tests and callers
//!   that already hold decoded frames
//! - [`ImageSequenceSource`] / [`ImageSequenceSink`]: directories of numbered
//!   PNG/JPEG images, as produced by `ffmpeg -i in.mp4 frames/%06d.png`

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, warn};

use crate::error::{ReframeError, ReframeResult};

/// One decoded source frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Absolute frame index within the source video.
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A finite, seekable sequence of decoded frames of constant size.
pub trait FrameSource {
    /// `(width, height)` of every frame.
    fn dimensions(&self) -> (u32, u32);

    /// Total number of frames available.
    fn frame_count(&self) -> u64;

    /// Decode the frame at absolute `index`.
    fn read_frame(&mut self, index: u64) -> ReframeResult<Frame>;
}

/// Receiver of composited output frames.
///
/// The orchestrator calls `write_frame` in order, then exactly one of
/// `finish` (every frame written) or `abort` (error or cancellation).
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> ReframeResult<()>;

    fn finish(&mut self) -> ReframeResult<()>;

    /// Release resources and discard partial output. Must not fail.
    fn abort(&mut self);
}

/// In-memory frame source.
#[derive(Debug, Clone)]
pub struct VecFrameSource {
    frames: Vec<RgbImage>,
    width: u32,
    height: u32,
}

impl VecFrameSource {
    /// Build a source from frames that must all share one size.
    pub fn new(frames: Vec<RgbImage>) -> ReframeResult<Self> {
        let (width, height) = frames
            .first()
            .map(|f| f.dimensions())
            .ok_or_else(|| ReframeError::input("frame source is empty"))?;

        if let Some(pos) = frames.iter().position(|f| f.dimensions() != (width, height)) {
            return Err(ReframeError::input(format!(
                "frame {} is {:?}, expected {}x{}",
                pos,
                frames[pos].dimensions(),
                width,
                height
            )));
        }

        Ok(Self {
            frames,
            width,
            height,
        })
    }

    /// `count` identical solid-colour frames.
    pub fn solid(width: u32, height: u32, count: usize, rgb: [u8; 3]) -> ReframeResult<Self> {
        let frame = RgbImage::from_pixel(width, height, image::Rgb(rgb));
        Self::new(vec![frame; count])
    }
}

impl FrameSource for VecFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn read_frame(&mut self, index: u64) -> ReframeResult<Frame> {
        let image = self
            .frames
            .get(index as usize)
            .cloned()
            .ok_or_else(|| {
                ReframeError::input(format!(
                    "frame {} out of range (source has {})",
                    index,
                    self.frames.len()
                ))
            })?;
        Ok(Frame::new(index, image))
    }
}

/// In-memory frame sink.
#[derive(Debug, Default)]
pub struct VecFrameSink {
    pub frames: Vec<RgbImage>,
    pub finished: bool,
    pub aborted: bool,
    /// Reject writes once this many frames are held. Used to exercise
    /// output failures.
    pub capacity: Option<usize>,
}

impl VecFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }
}

impl FrameSink for VecFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> ReframeResult<()> {
        if let Some(capacity) = self.capacity {
            if self.frames.len() >= capacity {
                return Err(ReframeError::output(format!(
                    "sink full after {} frames",
                    capacity
                )));
            }
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> ReframeResult<()> {
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.aborted = true;
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

/// Directory of decoded frames, ordered by file name.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    width: u32,
    height: u32,
}

impl ImageSequenceSource {
    /// Scan `dir` for PNG/JPEG frames. Frame size is taken from the first
    /// file; later frames of a different size are rejected when read.
    pub fn open(dir: impl AsRef<Path>) -> ReframeResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ReframeError::input(format!(
                "frames directory not found: {}",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && is_frame_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let first = paths.first().ok_or_else(|| {
            ReframeError::input(format!("no frames found in {}", dir.display()))
        })?;
        let (width, height) = image::image_dimensions(first)?;

        debug!(
            dir = %dir.display(),
            frames = paths.len(),
            width,
            height,
            "Opened image sequence"
        );

        Ok(Self {
            dir,
            paths,
            width,
            height,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_count(&self) -> u64 {
        self.paths.len() as u64
    }

    fn read_frame(&mut self, index: u64) -> ReframeResult<Frame> {
        let path = self.paths.get(index as usize).ok_or_else(|| {
            ReframeError::input(format!(
                "frame {} out of range (sequence has {})",
                index,
                self.paths.len()
            ))
        })?;

        let image = image::open(path)
            .map_err(|e| ReframeError::input(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        if image.dimensions() != (self.width, self.height) {
            return Err(ReframeError::input(format!(
                "{} is {:?}, expected {}x{}",
                path.display(),
                image.dimensions(),
                self.width,
                self.height
            )));
        }

        Ok(Frame::new(index, image))
    }
}

/// Writes output frames as `frame_000000.png`, `frame_000001.png`, ...
///
/// On abort every file this sink wrote is removed again, so a failed
/// render leaves no partial sequence behind.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
    finished: bool,
}

impl ImageSequenceSink {
    pub fn create(dir: impl AsRef<Path>) -> ReframeResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| ReframeError::output(format!("{}: {}", dir.display(), e)))?;
        Ok(Self {
            dir,
            written: Vec::new(),
            finished: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames_written(&self) -> usize {
        self.written.len()
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> ReframeResult<()> {
        let path = self
            .dir
            .join(format!("frame_{:06}.png", self.written.len()));
        if let Err(e) = frame.save(&path) {
            // The encoder may have created the file before failing.
            if let Err(remove_err) = fs::remove_file(&path) {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial output frame");
                }
            }
            return Err(ReframeError::output(format!("{}: {}", path.display(), e)));
        }
        self.written.push(path);
        Ok(())
    }

    fn finish(&mut self) -> ReframeResult<()> {
        self.finished = true;
        debug!(
            dir = %self.dir.display(),
            frames = self.written.len(),
            "Image sequence complete"
        );
        Ok(())
    }

    fn abort(&mut self) {
        if self.finished {
            return;
        }
        for path in self.written.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove partial output frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_vec_source_rejects_mixed_sizes() {
        let frames = vec![RgbImage::new(4, 4), RgbImage::new(4, 2)];
        assert!(matches!(
            VecFrameSource::new(frames),
            Err(ReframeError::Input(_))
        ));
        assert!(VecFrameSource::new(Vec::new()).is_err());
    }

    #[test]
    fn test_vec_source_out_of_range() {
        let mut source = VecFrameSource::solid(4, 4, 2, [0, 0, 0]).unwrap();
        assert_eq!(source.frame_count(), 2);
        assert_eq!(source.read_frame(1).unwrap().index, 1);
        assert!(matches!(source.read_frame(2), Err(ReframeError::Input(_))));
    }

    #[test]
    fn test_vec_sink_capacity() {
        let mut sink = VecFrameSink::with_capacity_limit(1);
        let frame = RgbImage::new(2, 2);
        sink.write_frame(&frame).unwrap();
        assert!(matches!(
            sink.write_frame(&frame),
            Err(ReframeError::Output(_))
        ));
    }

    #[test]
    fn test_image_sequence_source_sorted_and_sized() {
        let dir = tempfile::tempdir().unwrap();
        for (i, shade) in [(2, 200u8), (0, 0), (1, 100)] {
            RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
                .save(dir.path().join(format!("{:04}.png", i)))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.frame_count(), 3);
        assert_eq!(source.dimensions(), (8, 6));
        assert_eq!(source.read_frame(1).unwrap().image.get_pixel(0, 0), &Rgb([100, 100, 100]));
    }

    #[test]
    fn test_image_sequence_source_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            ImageSequenceSource::open(&missing),
            Err(ReframeError::Input(_))
        ));
        assert!(matches!(
            ImageSequenceSource::open(dir.path()),
            Err(ReframeError::Input(_))
        ));
    }

    #[test]
    fn test_image_sequence_sink_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut sink = ImageSequenceSink::create(&out).unwrap();
        sink.write_frame(&RgbImage::new(4, 4)).unwrap();

        // PNG cannot encode a zero-sized image.
        let result = sink.write_frame(&RgbImage::new(0, 0));
        assert!(matches!(result, Err(ReframeError::Output(_))));
        assert!(!out.join("frame_000001.png").exists());
        assert_eq!(sink.frames_written(), 1);

        sink.abort();
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_image_sequence_sink_abort_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut sink = ImageSequenceSink::create(&out).unwrap();
        sink.write_frame(&RgbImage::new(4, 4)).unwrap();
        sink.write_frame(&RgbImage::new(4, 4)).unwrap();
        assert!(out.join("frame_000001.png").exists());

        sink.abort();
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_image_sequence_sink_finish_keeps_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::create(dir.path()).unwrap();
        sink.write_frame(&RgbImage::new(4, 4)).unwrap();
        sink.finish().unwrap();
        sink.abort();
        assert!(dir.path().join("frame_000000.png").exists());
    }
}
