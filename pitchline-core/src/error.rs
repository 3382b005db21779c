//! Error types for the pitch tracking core.
//!
//! "No pitch" is never an error: it is reported as [`crate::PitchEstimate::NONE`].
//! Everything here is a caller contract violation or a configuration problem.

use std::io;
use thiserror::Error;

/// Result type for pitch tracking operations
pub type Result<T> = std::result::Result<T, TunerError>;

/// Errors that can occur while building or driving a tracker
#[derive(Error, Debug)]
pub enum TunerError {
    /// Buffer is too short to hold a single lag
    #[error("Sample buffer too short: need at least {min} samples, got {actual}")]
    BufferTooShort { min: usize, actual: usize },

    /// NaN or infinite sample
    #[error("Non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    /// Sample rate is zero, negative or not finite
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),

    /// Buffer length does not match the configured frame size
    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// A configuration field is out of range
    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A note label is not part of the chromatic label sequence
    #[error("Unknown note label: {0}")]
    UnknownNote(String),

    /// Failed to read a configuration file
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse a configuration file
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl TunerError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        TunerError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
