//! Visual speaker classification from mouth movement.
//!
//! A talking mouth opens and closes; a silent one stays still. Each track
//! keeps a short ring buffer of mouth-openness samples and is classified as
//! speaking when their variance reaches a threshold.

use super::config::ReframeConfig;
use super::tracker::Track;

/// Fixed-capacity ring buffer of mouth-openness samples.
///
/// Insertion is O(1); the oldest sample is overwritten once full.
#[derive(Debug, Clone)]
pub struct MouthHistory {
    samples: Vec<f64>,
    /// Next slot to write
    write_index: usize,
    len: usize,
}

impl MouthHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            write_index: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        let capacity = self.samples.len();
        self.samples[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.samples.len();
        let start = (self.write_index + capacity - self.len) % capacity;
        (0..self.len).map(move |i| self.samples[(start + i) % capacity])
    }

    /// Population variance of the buffered samples, 0.0 when empty.
    pub fn variance(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let n = self.len as f64;
        let mean = self.iter().sum::<f64>() / n;
        self.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n
    }

    pub fn clear(&mut self) {
        self.write_index = 0;
        self.len = 0;
    }
}

/// Classifies tracks as speaking from their mouth-openness history.
#[derive(Debug, Clone, Copy)]
pub struct SpeakerClassifier {
    threshold: f64,
    min_samples: usize,
}

impl SpeakerClassifier {
    pub fn new(config: &ReframeConfig) -> Self {
        Self {
            threshold: config.speaking_threshold,
            min_samples: config.min_speaking_samples,
        }
    }

    /// Feed this frame's openness for `track` and return its classification.
    ///
    /// Without a sample the previous classification is kept unchanged.
    pub fn update(&self, track: &mut Track, openness: Option<f64>) -> bool {
        let Some(sample) = openness.filter(|s| s.is_finite()) else {
            return track.speaking;
        };

        track.mouth.push(sample);
        track.speaking = self.classify(&track.mouth);
        track.speaking
    }

    /// Speaking iff the buffer holds enough samples and their variance
    /// reaches the threshold.
    pub fn classify(&self, history: &MouthHistory) -> bool {
        history.len() >= self.min_samples && history.variance() >= self.threshold
    }
}
