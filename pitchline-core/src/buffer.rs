//! # Sample Buffers
//!
//! A [`SampleBuffer`] is one captured frame of time-domain audio. It is
//! validated once at construction so the estimator never sees NaN, infinities
//! or a frame too short to hold a lag.

use crate::error::{Result, TunerError};

/// Smallest frame the estimator can search: two lags, plus a neighbor.
pub const MIN_BUFFER_LEN: usize = 4;

/// One frame of zero-centered samples, nominally in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl SampleBuffer {
    /// Wraps captured samples, rejecting malformed input.
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(TunerError::InvalidSampleRate(sample_rate));
        }
        if samples.len() < MIN_BUFFER_LEN {
            return Err(TunerError::BufferTooShort {
                min: MIN_BUFFER_LEN,
                actual: samples.len(),
            });
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(TunerError::NonFiniteSample { index });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Converts unsigned 8-bit analyser data, where 128 is the zero line.
    pub fn from_bytes(bytes: &[u8], sample_rate: f32) -> Result<Self> {
        let samples = bytes.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Scans the first quarter of the frame.
    ///
    /// Returns the loudest positive excursion clamped to [0, 1] and whether
    /// any sample rises above `threshold`.
    pub fn leading_activity(&self, threshold: f32) -> (f32, bool) {
        let quarter = (self.samples.len() / 4).max(1);
        let mut max_volume = 0.0_f32;
        let mut active = false;
        for &sample in &self.samples[..quarter] {
            max_volume = max_volume.max(sample);
            active |= sample > threshold;
        }
        (max_volume.min(1.0), active)
    }
}
