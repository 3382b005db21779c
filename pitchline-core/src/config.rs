//! # Tuner Configuration
//!
//! Every tunable of the tracker in one serializable struct. All fields have
//! defaults, so a JSON file only needs to name the values it overrides:
//!
//! ```json
//! { "reference_frequency_hz": 442.0, "history_size": 7 }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TunerError};
use crate::pitch::DifferenceMethod;

/// Chromatic note names starting from A, the order the note table walks in.
pub const DEFAULT_NOTE_LABELS: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Equal-tempered semitone ratio, 2^(1/12).
pub const TWELFTH_ROOT_OF_TWO: f64 = 1.059_463_094_359_295_3;

/// Configuration for the estimator, the tracker and the note table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// YIN absolute threshold on the normalized difference
    pub yin_threshold: f32,
    /// Difference function backend
    pub difference_method: DifferenceMethod,
    /// Number of estimates kept for the median filter (K)
    pub history_size: usize,
    /// Max distance in Hz between half an estimate and the previous value
    /// for the estimate to be treated as an octave error
    pub octave_tolerance_hz: f32,
    /// Time without pitch before history is dropped and silence announced
    pub silence_delay_ms: u64,
    /// Minimum time between updates once the history window is full
    pub min_update_delay_ms: u64,
    /// Positive amplitude a sample must exceed for the frame to count as active
    pub volume_threshold: f32,
    /// Expected number of samples per frame
    pub buffer_size: usize,
    pub reference_frequency_hz: f64,
    pub reference_label: String,
    pub reference_octave: i32,
    /// Chromatic label sequence, exactly 12 names
    pub note_labels: Vec<String>,
    /// Label at which the octave number increments
    pub octave_boundary_label: String,
    pub semitone_ratio: f64,
    pub min_freq_hz: f64,
    pub max_freq_hz: f64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            yin_threshold: 0.05,
            difference_method: DifferenceMethod::Direct,
            history_size: 5,
            octave_tolerance_hz: 5.0,
            silence_delay_ms: 500,
            min_update_delay_ms: 100,
            // 134 on the 0..=255 analyser scale, where 128 is silence
            volume_threshold: 6.0 / 128.0,
            buffer_size: 2048,
            reference_frequency_hz: 440.0,
            reference_label: "A".to_string(),
            reference_octave: 4,
            note_labels: DEFAULT_NOTE_LABELS.iter().map(|s| s.to_string()).collect(),
            octave_boundary_label: "C".to_string(),
            semitone_ratio: TWELFTH_ROOT_OF_TWO,
            min_freq_hz: 28.0,
            max_freq_hz: 4187.0,
        }
    }
}

impl TunerConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json(data: &str) -> Result<Self> {
        let config: TunerConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    pub fn silence_delay(&self) -> Duration {
        Duration::from_millis(self.silence_delay_ms)
    }

    pub fn min_update_delay(&self) -> Duration {
        Duration::from_millis(self.min_update_delay_ms)
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<()> {
        if !(self.yin_threshold > 0.0 && self.yin_threshold < 1.0) {
            return Err(TunerError::config("yin_threshold", "must be in (0, 1)"));
        }
        if self.history_size == 0 {
            return Err(TunerError::config("history_size", "must be at least 1"));
        }
        if !self.octave_tolerance_hz.is_finite() || self.octave_tolerance_hz < 0.0 {
            return Err(TunerError::config(
                "octave_tolerance_hz",
                "must be finite and non-negative",
            ));
        }
        if !self.volume_threshold.is_finite() || self.volume_threshold < 0.0 {
            return Err(TunerError::config(
                "volume_threshold",
                "must be finite and non-negative",
            ));
        }
        if self.buffer_size < crate::buffer::MIN_BUFFER_LEN {
            return Err(TunerError::config(
                "buffer_size",
                format!("must be at least {}", crate::buffer::MIN_BUFFER_LEN),
            ));
        }
        self.validate_scale()
    }

    pub(crate) fn validate_scale(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.reference_frequency_hz) {
            return Err(TunerError::config(
                "reference_frequency_hz",
                "must be finite and positive",
            ));
        }
        if !positive(self.min_freq_hz) || !positive(self.max_freq_hz) {
            return Err(TunerError::config(
                "min_freq_hz",
                "frequency bounds must be finite and positive",
            ));
        }
        if self.min_freq_hz >= self.max_freq_hz {
            return Err(TunerError::config(
                "min_freq_hz",
                "must be below max_freq_hz",
            ));
        }
        if !self.semitone_ratio.is_finite() || self.semitone_ratio <= 1.0 {
            return Err(TunerError::config("semitone_ratio", "must be greater than 1"));
        }
        let reference = self.reference_frequency_hz as f32;
        if (self.reference_frequency_hz * self.semitone_ratio) as f32 <= reference {
            return Err(TunerError::config(
                "semitone_ratio",
                "one step does not change the reference frequency",
            ));
        }
        if self.note_labels.len() != 12 {
            return Err(TunerError::config(
                "note_labels",
                format!("expected 12 labels, got {}", self.note_labels.len()),
            ));
        }
        for label in [&self.reference_label, &self.octave_boundary_label] {
            if !self.note_labels.contains(label) {
                return Err(TunerError::UnknownNote(label.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.silence_delay(), Duration::from_millis(500));
        assert_eq!(config.min_update_delay(), Duration::from_millis(100));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            TunerConfig::from_json(r#"{ "history_size": 7, "difference_method": "fft" }"#)
                .unwrap();
        assert_eq!(config.history_size, 7);
        assert_eq!(config.difference_method, DifferenceMethod::Fft);
        assert_eq!(config.reference_label, "A");
        assert_eq!(config.buffer_size, 2048);
    }

    #[test]
    fn rejects_zero_history() {
        let err = TunerConfig::from_json(r#"{ "history_size": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            TunerError::InvalidConfig { field: "history_size", .. }
        ));
    }

    #[test]
    fn rejects_unknown_reference_label() {
        let config = TunerConfig {
            reference_label: "H".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TunerError::UnknownNote(l)) if l == "H"));
    }

    #[test]
    fn rejects_indistinguishable_semitone_ratio() {
        let config = TunerConfig {
            semitone_ratio: 1.000_000_01,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TunerError::InvalidConfig { field: "semitone_ratio", .. })
        ));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            TunerConfig::from_json("{ not json"),
            Err(TunerError::Json(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "pitchline-config-{}.json",
            std::process::id()
        ));
        let config = TunerConfig {
            reference_frequency_hz: 442.0,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = TunerConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
