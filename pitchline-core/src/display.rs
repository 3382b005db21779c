//! Collaborator traits at the edges of the tracker: where frames come from and
//! where results go.

use crate::buffer::SampleBuffer;
use crate::tracker::PitchUpdate;
use crate::tuning::Note;

/// Receives tracker output. Each tick calls at most one method.
pub trait PitchDisplay {
    /// A stable pitch is available.
    ///
    /// `note` is the closest table entry, `volume` the normalized peak
    /// amplitude of the frame in [0, 1].
    fn on_pitch_update(&mut self, frequency_hz: f32, note: Option<&Note>, volume: f32);

    /// Full update with cents and the previously shown note.
    ///
    /// Forwards to [`PitchDisplay::on_pitch_update`] unless overridden.
    fn on_update(&mut self, update: &PitchUpdate) {
        self.on_pitch_update(update.frequency_hz, update.note.as_ref(), update.volume);
    }

    /// Pitch has been absent for the silence delay and history was cleared.
    fn on_silence(&mut self);
}

/// Produces one frame per tick.
pub trait SampleSource {
    /// Returns the most recent frame, or `None` once the source is closed.
    fn next_buffer(&mut self) -> Option<SampleBuffer>;
}
