// pitchline-core/src/lib.rs

//! The core logic for the pitchline tuner.
//! This crate turns time-domain sample frames into a stable note estimate:
//! YIN pitch estimation, temporal smoothing with octave correction and
//! silence detection, and an equal-tempered note table. It is completely
//! headless and performs no audio I/O.

pub mod buffer;
pub mod config;
pub mod display;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod source;
pub mod timer;
pub mod tracker;
pub mod tuning;

pub use buffer::SampleBuffer;
pub use config::TunerConfig;
pub use display::{PitchDisplay, SampleSource};
pub use error::{Result, TunerError};
pub use pitch::{DifferenceMethod, PitchEstimate, YinEstimator};
pub use tracker::{DisplayEvent, NextTick, PitchTracker, PitchUpdate, StepOutput, TrackerState};
pub use tuning::{Note, NoteTable};
