//! # Musical Tuning Module
//!
//! Equal-tempered note table and nearest-note matching.
//!
//! The table is built once from a reference pitch (A4 = 440 Hz by default) by
//! walking semitones up to `max_freq_hz` and down to `min_freq_hz`, and is
//! read-only afterwards. With the default configuration it spans A#0
//! (29.14 Hz) to C8 (4186.01 Hz).

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::TunerConfig;
use crate::error::{Result, TunerError};

/// Upper bound on table size; the default scale has 87 notes.
pub const MAX_TABLE_LEN: usize = 1024;

/// Represents a single musical note with its name and frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Chromatic name without octave (e.g., "A", "C#")
    pub name: String,
    /// Octave number, incrementing at the octave boundary label
    pub octave: i32,
    /// Frequency in Hz
    pub frequency: f32,
}

impl Note {
    /// Name with octave, e.g. "A4".
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Equal-tempered notes, strictly increasing by frequency.
#[derive(Debug, Clone)]
pub struct NoteTable {
    notes: Vec<Note>,
    by_label: BTreeMap<String, usize>,
}

/// Default table (A4 = 440 Hz, 28 Hz .. 4187 Hz), built on first use.
static STANDARD: Lazy<NoteTable> = Lazy::new(|| {
    // The default configuration is constant and always yields a non-empty table.
    NoteTable::from_config(&TunerConfig::default()).expect("default note table builds")
});

impl NoteTable {
    /// Shared table for the default configuration.
    pub fn standard() -> &'static NoteTable {
        &STANDARD
    }

    /// Builds the table described by the scale fields of `config`.
    ///
    /// Semitone offsets are walked upward from the reference until the
    /// frequency passes `max_freq_hz`, then downward until it drops under
    /// `min_freq_hz`. The octave counter moves at the boundary label going up
    /// and at the label just below it going down.
    pub fn from_config(config: &TunerConfig) -> Result<Self> {
        config.validate_scale()?;

        let labels = &config.note_labels;
        let position = |label: &str| {
            labels
                .iter()
                .position(|l| l == label)
                .ok_or_else(|| TunerError::UnknownNote(label.to_string()))
        };
        let reference = position(&config.reference_label)? as i32;
        let boundary = position(&config.octave_boundary_label)?;
        let below_boundary = (boundary + labels.len() - 1) % labels.len();
        let label_at = |offset: i32| (reference + offset).rem_euclid(labels.len() as i32) as usize;
        let frequency_at =
            |offset: i32| config.reference_frequency_hz * config.semitone_ratio.powi(offset);

        let mut upper = Vec::new();
        let mut octave = config.reference_octave;
        for offset in 0_i32.. {
            let index = label_at(offset);
            if offset > 0 && index == boundary {
                octave += 1;
            }
            let frequency = frequency_at(offset);
            if frequency > config.max_freq_hz {
                break;
            }
            if upper.len() >= MAX_TABLE_LEN {
                return Err(too_many_notes());
            }
            upper.push(Note {
                name: labels[index].clone(),
                octave,
                frequency: frequency as f32,
            });
        }

        let mut lower = Vec::new();
        let mut octave = config.reference_octave;
        for offset in (1_i32..).map(|k| -k) {
            let index = label_at(offset);
            if index == below_boundary {
                octave -= 1;
            }
            let frequency = frequency_at(offset);
            if frequency < config.min_freq_hz {
                break;
            }
            if upper.len() + lower.len() >= MAX_TABLE_LEN {
                return Err(too_many_notes());
            }
            lower.push(Note {
                name: labels[index].clone(),
                octave,
                frequency: frequency as f32,
            });
        }

        lower.reverse();
        lower.extend(upper);
        if lower.is_empty() {
            return Err(TunerError::config(
                "max_freq_hz",
                "frequency range contains no notes",
            ));
        }
        if lower.windows(2).any(|pair| pair[0].frequency >= pair[1].frequency) {
            return Err(TunerError::config(
                "semitone_ratio",
                "adjacent notes round to the same frequency",
            ));
        }

        let by_label = lower
            .iter()
            .enumerate()
            .map(|(i, note)| (note.label(), i))
            .collect();

        Ok(Self {
            notes: lower,
            by_label,
        })
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Looks up a note by its full label, e.g. "C#3".
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    /// Finds the index of the note closest to `freq`.
    ///
    /// # Returns
    /// * `None` for 0 Hz ("no pitch"), negative or non-finite input
    /// * The previous note unless the next one is strictly closer, so an exact
    ///   midpoint resolves to the lower note
    /// * Index 0 below the table and the last index above it
    pub fn closest_index(&self, freq: f32) -> Option<usize> {
        if !freq.is_finite() || freq <= 0.0 || self.notes.is_empty() {
            return None;
        }

        let next = self.notes.partition_point(|note| note.frequency <= freq);
        if next == 0 {
            return Some(0);
        }
        if next == self.notes.len() {
            return Some(self.notes.len() - 1);
        }

        let distance_up = self.notes[next].frequency - freq;
        let distance_down = freq - self.notes[next - 1].frequency;
        if distance_up < distance_down {
            Some(next)
        } else {
            Some(next - 1)
        }
    }

    /// Convenience wrapper around [`NoteTable::closest_index`].
    pub fn closest(&self, freq: f32) -> Option<&Note> {
        self.closest_index(freq).map(|i| &self.notes[i])
    }
}

fn too_many_notes() -> TunerError {
    TunerError::config(
        "semitone_ratio",
        format!("scale has more than {MAX_TABLE_LEN} notes in range"),
    )
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents = 1 semitone, positive values are sharp.
pub fn cents_between(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// Distance between two frequencies in equal-tempered semitones.
pub fn semitones_between(freq: f32, target_freq: f32) -> f32 {
    12.0 * (freq / target_freq).log2()
}
