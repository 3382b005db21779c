//! # Pitch Detection Module
//!
//! This module implements the YIN fundamental frequency estimator used by the
//! tracker. One call maps one [`SampleBuffer`] to one [`PitchEstimate`].
//!
//! ## Steps
//! 1. Difference function d(τ) over the first half of the frame
//! 2. Cumulative mean normalization d'(τ)
//! 3. Absolute threshold: the smallest-lag local minimum under the threshold
//! 4. Parabolic interpolation for sub-sample lag precision
//!
//! "No pitch" is a regular result, [`PitchEstimate::NONE`]. The estimator never
//! returns NaN or infinite values.

use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::fft::FftDifference;

/// How the difference function d(τ) is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceMethod {
    /// Direct double loop, O(N²/4)
    #[default]
    Direct,
    /// Energy prefix sums plus an FFT cross-correlation, O(N log N)
    Fft,
}

/// Result of a single estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Fundamental frequency in Hz, 0 when no pitch was found
    pub frequency_hz: f32,
    /// 1 - d'(τ) at the chosen lag, in [0, 1]
    pub confidence: f32,
}

impl PitchEstimate {
    pub const NONE: PitchEstimate = PitchEstimate {
        frequency_hz: 0.0,
        confidence: 0.0,
    };

    pub fn is_pitched(&self) -> bool {
        self.frequency_hz.is_finite() && self.frequency_hz > 0.0
    }
}

/// Reusable YIN estimator.
///
/// Holds the threshold, the difference backend and the scratch buffer, so the
/// per-frame path does not allocate once warmed up.
pub struct YinEstimator {
    threshold: f32,
    method: DifferenceMethod,
    yin_buffer: Vec<f32>,
    fft: Option<FftDifference>,
}

impl std::fmt::Debug for YinEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YinEstimator")
            .field("threshold", &self.threshold)
            .field("method", &self.method)
            .finish()
    }
}

impl YinEstimator {
    pub fn new(threshold: f32, method: DifferenceMethod) -> Self {
        let fft = match method {
            DifferenceMethod::Direct => None,
            DifferenceMethod::Fft => Some(FftDifference::new()),
        };
        Self {
            threshold,
            method,
            yin_buffer: Vec::new(),
            fft,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn method(&self) -> DifferenceMethod {
        self.method
    }

    /// Estimates the fundamental frequency of one frame.
    ///
    /// # Returns
    /// * A pitched estimate when a dip of d'(τ) falls under the threshold
    /// * [`PitchEstimate::NONE`] for silence, flat input, noise, or a period
    ///   longer than half the frame
    pub fn estimate(&mut self, buffer: &SampleBuffer) -> PitchEstimate {
        let signal = buffer.samples();
        let half = signal.len() / 2;
        self.yin_buffer.clear();
        self.yin_buffer.resize(half, 0.0);

        // --- Step 1: Difference function ---
        match self.fft.as_mut() {
            Some(fft) => fft.difference(signal, &mut self.yin_buffer),
            None => difference(signal, &mut self.yin_buffer),
        }

        // --- Step 2: Cumulative mean normalized difference ---
        cumulative_mean_normalize(&mut self.yin_buffer);

        // --- Step 3: Absolute threshold ---
        let Some((tau, min_value)) = absolute_threshold(&self.yin_buffer, self.threshold) else {
            return PitchEstimate::NONE;
        };

        // --- Step 4: Parabolic interpolation ---
        let period = parabolic_interpolation(&self.yin_buffer, tau);
        let frequency = buffer.sample_rate() / period;

        if !frequency.is_finite() || frequency <= 0.0 {
            return PitchEstimate::NONE;
        }

        tracing::trace!(tau, period, frequency, d = min_value, "yin estimate");

        PitchEstimate {
            frequency_hz: frequency,
            confidence: (1.0 - min_value).clamp(0.0, 1.0),
        }
    }
}

/// Squared difference of the first half of the signal against itself shifted
/// by τ, for τ in 1..half. `yin_buffer[0]` is left for the sentinel.
pub fn difference(signal: &[f32], yin_buffer: &mut [f32]) {
    let half = yin_buffer.len();
    for tau in 1..half {
        let mut diff = 0.0;
        for i in 0..half {
            let delta = signal[i] - signal[i + tau];
            diff += delta * delta;
        }
        yin_buffer[tau] = diff;
    }
}

/// Rewrites d(τ) as d'(τ) = d(τ)·τ / Σ_{j≤τ} d(j), with d'(0) = 1.
///
/// While the running sum is still zero (flat input) d'(τ) is set to 1, which
/// can never pass the threshold.
pub fn cumulative_mean_normalize(yin_buffer: &mut [f32]) {
    let Some(first) = yin_buffer.first_mut() else {
        return;
    };
    *first = 1.0;

    let mut running_sum = 0.0;
    for tau in 1..yin_buffer.len() {
        running_sum += yin_buffer[tau];
        if running_sum > 0.0 {
            yin_buffer[tau] *= tau as f32 / running_sum;
        } else {
            yin_buffer[tau] = 1.0;
        }
    }
}

/// Finds the first dip under `threshold`, starting at τ = 2.
///
/// Inside the dip the running minimum is tracked; the search stops as soon as
/// d' stops decreasing, so the smallest-lag minimum wins over the deeper dips
/// at multiples of the period.
pub fn absolute_threshold(yin_buffer: &[f32], threshold: f32) -> Option<(usize, f32)> {
    let mut candidate: Option<(usize, f32)> = None;
    for (tau, &value) in yin_buffer.iter().enumerate().skip(2) {
        match candidate {
            Some((_, min_value)) if value < min_value => candidate = Some((tau, value)),
            Some(_) => break,
            None if value < threshold => candidate = Some((tau, value)),
            None => {}
        }
    }
    candidate
}

/// Refines `tau` to a fractional lag from its two neighbors.
///
/// Falls back to the integer lag at the end of the buffer or when the
/// parabola is degenerate.
pub fn parabolic_interpolation(yin_buffer: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= yin_buffer.len() {
        return tau as f32;
    }

    let y1 = yin_buffer[tau - 1];
    let y2 = yin_buffer[tau];
    let y3 = yin_buffer[tau + 1];

    let denominator = 2.0 * (2.0 * y2 - y1 - y3);
    if denominator == 0.0 {
        return tau as f32;
    }

    let refined = tau as f32 + (y3 - y1) / denominator;
    if refined.is_finite() && refined > 0.0 {
        refined
    } else {
        tau as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    fn sine(frequency: f32, sample_rate: f32, len: usize) -> SampleBuffer {
        let samples = (0..len)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f32 / sample_rate).sin())
            .collect();
        SampleBuffer::new(samples, sample_rate).unwrap()
    }

    fn assert_within_one_percent(estimate: PitchEstimate, frequency: f32) {
        let error = (estimate.frequency_hz - frequency).abs() / frequency;
        assert!(
            error < 0.01,
            "expected ~{frequency} Hz, got {} Hz",
            estimate.frequency_hz
        );
        assert!(estimate.confidence > 0.9, "confidence {}", estimate.confidence);
    }

    #[test]
    fn detects_pure_sines() {
        let mut yin = YinEstimator::new(0.05, DifferenceMethod::Direct);
        for frequency in [82.41, 110.0, 220.0, 440.0, 1046.5] {
            let estimate = yin.estimate(&sine(frequency, 44100.0, 2048));
            assert_within_one_percent(estimate, frequency);
        }
    }

    #[test]
    fn detects_sine_at_lower_sample_rate() {
        let mut yin = YinEstimator::new(0.05, DifferenceMethod::Direct);
        let estimate = yin.estimate(&sine(200.0, 8000.0, 1024));
        assert_within_one_percent(estimate, 200.0);
    }

    #[test]
    fn fft_backend_matches_direct() {
        let mut direct = YinEstimator::new(0.05, DifferenceMethod::Direct);
        let mut fft = YinEstimator::new(0.05, DifferenceMethod::Fft);
        for frequency in [110.0, 329.63, 440.0] {
            let buffer = sine(frequency, 44100.0, 2048);
            let a = direct.estimate(&buffer);
            let b = fft.estimate(&buffer);
            assert_within_one_percent(b, frequency);
            assert_abs_diff_eq!(a.frequency_hz, b.frequency_hz, epsilon = 0.05);
        }
    }

    #[test]
    fn strong_second_harmonic_keeps_fundamental() {
        let sample_rate = 44100.0;
        let frequency = 220.0;
        let samples = (0..2048)
            .map(|i| {
                let t = i as f32 / sample_rate;
                0.4 * (2.0 * PI * frequency * t).sin() + 0.35 * (4.0 * PI * frequency * t).sin()
            })
            .collect();
        let buffer = SampleBuffer::new(samples, sample_rate).unwrap();
        let estimate = YinEstimator::new(0.05, DifferenceMethod::Direct).estimate(&buffer);
        assert_within_one_percent(estimate, frequency);
    }

    #[test]
    fn silence_and_flat_input_have_no_pitch() {
        for method in [DifferenceMethod::Direct, DifferenceMethod::Fft] {
            let mut yin = YinEstimator::new(0.05, method);
            let zeros = SampleBuffer::new(vec![0.0; 1024], 44100.0).unwrap();
            assert_eq!(yin.estimate(&zeros), PitchEstimate::NONE);

            let constant = SampleBuffer::new(vec![0.25; 1024], 44100.0).unwrap();
            assert_eq!(yin.estimate(&constant), PitchEstimate::NONE);
        }
    }

    #[test]
    fn normalization_handles_zero_running_sum() {
        let mut buffer = vec![0.0, 0.0, 0.0, 2.0, 1.0];
        cumulative_mean_normalize(&mut buffer);
        assert_eq!(&buffer[..3], &[1.0, 1.0, 1.0]);
        // d'(3) = 2 * 3 / 2, d'(4) = 1 * 4 / 3
        assert_abs_diff_eq!(buffer[3], 3.0);
        assert_abs_diff_eq!(buffer[4], 4.0 / 3.0, epsilon = 1e-6);
        assert!(buffer.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn threshold_takes_first_dip_not_deepest() {
        let d = [1.0, 1.0, 0.8, 0.04, 0.02, 0.03, 0.5, 0.001, 0.6];
        assert_eq!(absolute_threshold(&d, 0.05), Some((4, 0.02)));
    }

    #[test]
    fn threshold_never_crossed() {
        let d = [1.0, 1.0, 0.8, 0.6, 0.7, 0.9];
        assert_eq!(absolute_threshold(&d, 0.05), None);
    }

    #[test]
    fn dip_running_to_the_end_skips_interpolation() {
        let d = [1.0, 1.0, 0.5, 0.04, 0.03, 0.01];
        let (tau, _) = absolute_threshold(&d, 0.05).unwrap();
        assert_eq!(tau, 5);
        assert_eq!(parabolic_interpolation(&d, tau), 5.0);
    }

    #[test]
    fn interpolation_moves_toward_lower_neighbor() {
        let d = [1.0, 0.3, 0.1, 0.2];
        let refined = parabolic_interpolation(&d, 2);
        assert!(refined > 2.0 && refined < 2.5, "refined {refined}");

        let d = [1.0, 0.2, 0.1, 0.3];
        let refined = parabolic_interpolation(&d, 2);
        assert!(refined > 1.5 && refined < 2.0, "refined {refined}");

        let flat = [1.0, 0.1, 0.1, 0.1];
        assert_eq!(parabolic_interpolation(&flat, 2), 2.0);
    }
}
