//! Synthetic sample source.
//!
//! Plays a script of tones and rests frame by frame, with continuous phase
//! across frames. Used by the command line demo and by scenario tests in
//! place of a microphone.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use crate::buffer::{SampleBuffer, MIN_BUFFER_LEN};
use crate::display::SampleSource;
use crate::error::{Result, TunerError};

/// One entry of a [`ToneSource`] script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSegment {
    /// Fundamental in Hz, 0 for a rest
    pub frequency_hz: f32,
    /// Peak amplitude of the fundamental
    pub amplitude: f32,
    /// Relative amplitude of the second harmonic
    pub second_harmonic: f32,
    /// Number of frames the segment lasts
    pub frames: usize,
}

impl ToneSegment {
    pub fn tone(frequency_hz: f32, amplitude: f32, frames: usize) -> Self {
        Self {
            frequency_hz,
            amplitude,
            second_harmonic: 0.0,
            frames,
        }
    }

    pub fn rest(frames: usize) -> Self {
        Self::tone(0.0, 0.0, frames)
    }

    pub fn with_second_harmonic(mut self, ratio: f32) -> Self {
        self.second_harmonic = ratio;
        self
    }
}

/// Generates frames from a script of [`ToneSegment`]s.
#[derive(Debug, Clone)]
pub struct ToneSource {
    sample_rate: f32,
    buffer_size: usize,
    script: VecDeque<ToneSegment>,
    phase: f32,
}

impl ToneSource {
    pub fn new(
        sample_rate: f32,
        buffer_size: usize,
        script: impl IntoIterator<Item = ToneSegment>,
    ) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(TunerError::InvalidSampleRate(sample_rate));
        }
        if buffer_size < MIN_BUFFER_LEN {
            return Err(TunerError::BufferTooShort {
                min: MIN_BUFFER_LEN,
                actual: buffer_size,
            });
        }
        Ok(Self {
            sample_rate,
            buffer_size,
            script: script.into_iter().filter(|s| s.frames > 0).collect(),
            phase: 0.0,
        })
    }

    /// Frames left in the script.
    pub fn remaining_frames(&self) -> usize {
        self.script.iter().map(|s| s.frames).sum()
    }

    fn render(&mut self, segment: ToneSegment) -> Vec<f32> {
        let step = TAU * segment.frequency_hz / self.sample_rate;
        (0..self.buffer_size)
            .map(|_| {
                let sample = segment.amplitude
                    * (self.phase.sin() + segment.second_harmonic * (2.0 * self.phase).sin());
                self.phase = (self.phase + step) % TAU;
                sample
            })
            .collect()
    }
}

impl SampleSource for ToneSource {
    fn next_buffer(&mut self) -> Option<SampleBuffer> {
        let segment = *self.script.front()?;
        let samples = self.render(segment);
        if let Some(front) = self.script.front_mut() {
            front.frames -= 1;
            if front.frames == 0 {
                self.script.pop_front();
            }
        }
        SampleBuffer::new(samples, self.sample_rate).ok()
    }
}
