//! Terminal readout for the tracker.

use std::io::{self, Write};

use pitchline_core::{Note, PitchDisplay, PitchUpdate};

/// Width of the cents needle, covering -50..=+50 cents.
const METER_WIDTH: usize = 21;

/// Prints one line per update to stdout.
pub struct TerminalDisplay<W: Write = io::Stdout> {
    out: W,
}

impl TerminalDisplay {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_line(
        &mut self,
        frequency_hz: f32,
        note: Option<&Note>,
        cents: Option<f32>,
        volume: f32,
        previous: Option<&str>,
    ) {
        let label = note.map_or_else(|| "-".to_string(), Note::label);
        let (cents, meter) = match cents {
            Some(cents) => (format!("{:+6.1}c", cents), cent_meter(cents)),
            None => (" ".repeat(7), " ".repeat(METER_WIDTH)),
        };
        let _ = writeln!(
            self.out,
            "{:<4} {:>8.1} Hz {} [{}] vol {:.2}  last {}",
            label,
            frequency_hz,
            cents,
            meter,
            volume,
            previous.unwrap_or("-")
        );
    }
}

impl<W: Write> PitchDisplay for TerminalDisplay<W> {
    fn on_pitch_update(&mut self, frequency_hz: f32, note: Option<&Note>, volume: f32) {
        self.write_line(frequency_hz, note, None, volume, None);
    }

    fn on_update(&mut self, update: &PitchUpdate) {
        self.write_line(
            update.frequency_hz,
            update.note.as_ref(),
            update.cents,
            update.volume,
            update.previous_note.as_deref(),
        );
    }

    fn on_silence(&mut self) {
        let _ = writeln!(self.out, "--   (silence)");
    }
}

/// Renders a needle at `cents` on a -50..=+50 scale with a center mark.
fn cent_meter(cents: f32) -> String {
    let half = (METER_WIDTH / 2) as f32;
    let position = (half + cents.clamp(-50.0, 50.0) / 50.0 * half).round() as usize;
    (0..METER_WIDTH)
        .map(|i| match i {
            _ if i == position => '|',
            _ if i == METER_WIDTH / 2 => '.',
            _ => ' ',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4() -> Note {
        Note {
            name: "A".to_string(),
            octave: 4,
            frequency: 440.0,
        }
    }

    fn output(display: TerminalDisplay<Vec<u8>>) -> String {
        String::from_utf8(display.out).unwrap()
    }

    #[test]
    fn meter_needle_positions() {
        assert_eq!(cent_meter(0.0), format!("{}|{}", " ".repeat(10), " ".repeat(10)));
        assert!(cent_meter(-50.0).starts_with('|'));
        assert!(cent_meter(80.0).ends_with('|'));
    }

    #[test]
    fn update_shows_tracker_cents_and_previous_note() {
        let update = PitchUpdate {
            frequency_hz: 443.0,
            note_index: Some(48),
            note: Some(a4()),
            cents: Some(11.8),
            volume: 0.5,
            confidence: 0.97,
            previous_note: Some("E4".to_string()),
        };
        let mut display = TerminalDisplay::new(Vec::new());
        display.on_update(&update);
        display.on_silence();

        let text = output(display);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("A4"));
        assert!(lines[0].contains("443.0 Hz"));
        assert!(lines[0].contains("+11.8c"));
        assert!(lines[0].contains("vol 0.50"));
        assert!(lines[0].ends_with("last E4"));
        assert!(lines[1].contains("silence"));
    }

    #[test]
    fn plain_update_has_no_cents_or_history() {
        let mut display = TerminalDisplay::new(Vec::new());
        display.on_pitch_update(440.0, Some(&a4()), 0.25);

        let text = output(display);
        assert!(text.starts_with("A4"));
        assert!(!text.contains('c'));
        assert!(text.trim_end().ends_with("last -"));
    }
}
