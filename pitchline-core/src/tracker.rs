//! # Pitch Tracker
//!
//! Turns noisy per-frame YIN estimates into a stable note for display.
//!
//! One [`PitchTracker`] is one tracking session. It owns the pitch history,
//! the silence timer and the last displayed note; nothing is global, so
//! trackers can run side by side and tests stay isolated.
//!
//! ## Per tick
//! 1. A due silence timer wins: history is cleared and silence announced
//! 2. Activity gate on the first quarter of the frame
//! 3. YIN estimate
//! 4. Octave correction, rounding to 0.1 Hz, bounded history, median
//! 5. Note matching and scheduling of the next tick
//!
//! The tracker never sleeps or loops; [`StepOutput::next_tick`] tells the
//! caller when to call again.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::buffer::SampleBuffer;
use crate::config::TunerConfig;
use crate::display::PitchDisplay;
use crate::error::{Result, TunerError};
use crate::pitch::{PitchEstimate, YinEstimator};
use crate::timer::CancellableTask;
use crate::tuning::{cents_between, Note, NoteTable};

/// Coarse tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// A pitch has been reported and history is being filled or kept
    Listening,
    /// Nothing to report: fresh session or silence timeout fired
    Silent,
}

/// When the caller should run the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTick {
    /// On the next display refresh
    Immediate,
    /// Not before the given delay
    After(Duration),
}

/// A stable pitch ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchUpdate {
    /// Median of the pitch history, in Hz
    pub frequency_hz: f32,
    /// Index into the note table
    pub note_index: Option<usize>,
    pub note: Option<Note>,
    /// Deviation of `frequency_hz` from `note`
    pub cents: Option<f32>,
    /// Normalized peak amplitude of the frame, in [0, 1]
    pub volume: f32,
    /// Confidence of this tick's raw estimate
    pub confidence: f32,
    /// Label of the note shown by the previous update
    pub previous_note: Option<String>,
}

/// What the display should do for this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Pitch(PitchUpdate),
    Silence,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub event: Option<DisplayEvent>,
    pub next_tick: NextTick,
}

impl StepOutput {
    fn quiet() -> Self {
        Self {
            event: None,
            next_tick: NextTick::Immediate,
        }
    }

    /// Forwards the event, if any, to a display.
    pub fn dispatch<D: PitchDisplay + ?Sized>(&self, display: &mut D) {
        match &self.event {
            Some(DisplayEvent::Pitch(update)) => display.on_update(update),
            Some(DisplayEvent::Silence) => display.on_silence(),
            None => {}
        }
    }
}

/// One pitch tracking session.
#[derive(Debug)]
pub struct PitchTracker {
    estimator: YinEstimator,
    table: Arc<NoteTable>,
    history: VecDeque<f32>,
    history_size: usize,
    octave_tolerance_hz: f32,
    volume_threshold: f32,
    buffer_size: usize,
    silence_delay: Duration,
    min_update_delay: Duration,
    silence: CancellableTask<()>,
    /// Set once silence is announced, cleared by the next pitch
    silence_announced: bool,
    state: TrackerState,
    current_note: Option<String>,
}

impl PitchTracker {
    /// Creates a session with its own note table built from `config`.
    pub fn new(config: &TunerConfig) -> Result<Self> {
        let table = Arc::new(NoteTable::from_config(config)?);
        Self::with_table(config, table)
    }

    /// Creates a session that shares an already built note table.
    pub fn with_table(config: &TunerConfig, table: Arc<NoteTable>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: YinEstimator::new(config.yin_threshold, config.difference_method),
            table,
            history: VecDeque::with_capacity(config.history_size),
            history_size: config.history_size,
            octave_tolerance_hz: config.octave_tolerance_hz,
            volume_threshold: config.volume_threshold,
            buffer_size: config.buffer_size,
            silence_delay: config.silence_delay(),
            min_update_delay: config.min_update_delay(),
            silence: CancellableTask::new(),
            silence_announced: false,
            state: TrackerState::Silent,
            current_note: None,
        })
    }

    pub fn table(&self) -> &Arc<NoteTable> {
        &self.table
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Octave-corrected, rounded estimates, oldest first.
    pub fn history(&self) -> &VecDeque<f32> {
        &self.history
    }

    pub fn silence_pending(&self) -> bool {
        self.silence.is_armed()
    }

    /// Returns the session to its freshly constructed state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.silence.cancel_any();
        self.silence_announced = false;
        self.state = TrackerState::Silent;
        self.current_note = None;
    }

    /// Runs one tick on a captured frame.
    ///
    /// `now` is the monotonic time since the session started.
    ///
    /// # Errors
    /// * [`TunerError::BufferSizeMismatch`] if the frame length differs from
    ///   the configured `buffer_size`
    pub fn step(&mut self, buffer: &SampleBuffer, now: Duration) -> Result<StepOutput> {
        if buffer.len() != self.buffer_size {
            return Err(TunerError::BufferSizeMismatch {
                expected: self.buffer_size,
                actual: buffer.len(),
            });
        }

        if let Some(output) = self.poll_silence(now) {
            return Ok(output);
        }

        let (volume, active) = buffer.leading_activity(self.volume_threshold);
        let estimate = if active {
            self.estimator.estimate(buffer)
        } else {
            PitchEstimate::NONE
        };
        Ok(self.apply(estimate, volume, now))
    }

    /// Runs one tick on an estimate computed elsewhere, e.g. by an estimator
    /// pipelined on another thread. Estimates must arrive in capture order.
    pub fn process_estimate(
        &mut self,
        estimate: PitchEstimate,
        volume: f32,
        now: Duration,
    ) -> StepOutput {
        if let Some(output) = self.poll_silence(now) {
            return output;
        }
        self.apply(estimate, volume, now)
    }

    /// Fires the silence timer if it is due at `now`.
    ///
    /// Callers that wait between frames may poll this directly; `step` and
    /// `process_estimate` already do.
    pub fn poll_silence(&mut self, now: Duration) -> Option<StepOutput> {
        self.silence.poll(now)?;
        self.silence_announced = true;
        self.history.clear();
        self.state = TrackerState::Silent;
        debug!(now_ms = now.as_millis() as u64, "silence timeout fired, history cleared");
        Some(StepOutput {
            event: Some(DisplayEvent::Silence),
            next_tick: NextTick::Immediate,
        })
    }

    fn apply(&mut self, estimate: PitchEstimate, volume: f32, now: Duration) -> StepOutput {
        if !estimate.is_pitched() {
            return self.on_no_pitch(now);
        }

        if let Some(handle) = self.silence.handle() {
            if self.silence.cancel(handle) {
                debug!("pitch resumed, silence timer canceled");
            }
        }
        self.silence_announced = false;

        let frequency = round_to_tenth(self.correct_octave(estimate.frequency_hz));
        if self.history.len() >= self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(frequency);

        let stable = median(&self.history);
        let note_index = self.table.closest_index(stable);
        let note = note_index.and_then(|i| self.table.get(i)).cloned();
        let cents = note.as_ref().map(|n| cents_between(stable, n.frequency));

        let previous_note = self.current_note.take();
        self.current_note = note.as_ref().map(Note::label);
        self.state = TrackerState::Listening;

        trace!(
            raw = estimate.frequency_hz,
            stable,
            note = self.current_note.as_deref().unwrap_or("-"),
            history = self.history.len(),
            "pitch update"
        );

        let next_tick = if self.history.len() < self.history_size {
            NextTick::Immediate
        } else {
            NextTick::After(self.min_update_delay)
        };

        StepOutput {
            event: Some(DisplayEvent::Pitch(PitchUpdate {
                frequency_hz: stable,
                note_index,
                note,
                cents,
                volume: volume.clamp(0.0, 1.0),
                confidence: estimate.confidence,
                previous_note,
            })),
            next_tick,
        }
    }

    /// Halves an estimate that sits an octave above the latest history value.
    fn correct_octave(&self, frequency: f32) -> f32 {
        match self.history.back() {
            Some(&last) if (frequency / 2.0 - last).abs() < self.octave_tolerance_hz => {
                debug!(frequency, last, "octave jump corrected");
                frequency / 2.0
            }
            _ => frequency,
        }
    }

    fn on_no_pitch(&mut self, now: Duration) -> StepOutput {
        // One announcement per silent period; only a pitch re-enables arming
        if !self.silence.is_armed() && !self.silence_announced {
            self.silence.arm(now, self.silence_delay, ());
            debug!(
                delay_ms = self.silence_delay.as_millis() as u64,
                "no pitch, silence timer armed"
            );
        }
        StepOutput::quiet()
    }
}

fn round_to_tenth(frequency: f32) -> f32 {
    (frequency * 10.0).round() / 10.0
}

/// Lower median: middle element of a sorted copy, `(len - 1) / 2`.
fn median(values: &VecDeque<f32>) -> f32 {
    let mut sorted: Vec<f32> = values.iter().copied().collect();
    sorted.sort_by(f32::total_cmp);
    sorted.get(sorted.len().saturating_sub(1) / 2).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_takes_lower_middle() {
        let values: VecDeque<f32> = [5.0, 1.0, 3.0, 2.0].into_iter().collect();
        assert_eq!(median(&values), 2.0);
        let values: VecDeque<f32> = [9.0, 1.0, 4.0].into_iter().collect();
        assert_eq!(median(&values), 4.0);
        assert_eq!(median(&VecDeque::new()), 0.0);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_to_tenth(440.04), 440.0);
        assert_eq!(round_to_tenth(440.06), 440.1);
        assert_eq!(round_to_tenth(219.96), 220.0);
    }

    #[test]
    fn rejects_wrong_frame_length() {
        let mut tracker = PitchTracker::new(&TunerConfig::default()).unwrap();
        let buffer = SampleBuffer::new(vec![0.0; 1024], 44100.0).unwrap();
        assert!(matches!(
            tracker.step(&buffer, Duration::ZERO),
            Err(TunerError::BufferSizeMismatch { expected: 2048, actual: 1024 })
        ));
    }

    #[test]
    fn infinite_estimate_is_treated_as_no_pitch() {
        let mut tracker = PitchTracker::new(&TunerConfig::default()).unwrap();
        let estimate = PitchEstimate {
            frequency_hz: f32::INFINITY,
            confidence: 1.0,
        };
        let output = tracker.process_estimate(estimate, 0.5, Duration::ZERO);
        assert_eq!(output.event, None);
        assert!(tracker.history().is_empty());
    }
}
