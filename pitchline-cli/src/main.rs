//! # Pitchline - Terminal Tuner
//!
//! Runs the pitch tracker against a sample source and prints the stable note.
//!
//! ## Architecture
//! - **Source thread**: synthetic tone script, or the microphone with the
//!   `capture` feature
//! - **Main thread**: tick loop driving the tracker and the terminal display
//! - **Communication**: bounded crossbeam channel carrying whole frames
//!
//! ## Usage
//! ```text
//! pitchline [CONFIG.json] [--demo]
//! ```

#[cfg(feature = "capture")]
mod audio;
mod display;
mod logging;

use anyhow::{Context, Result};
use crossbeam_channel::{after, Receiver, Sender, TryRecvError};
use pitchline_core::source::{ToneSegment, ToneSource};
use pitchline_core::{NextTick, PitchTracker, SampleBuffer, SampleSource, TunerConfig};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use display::TerminalDisplay;

/// Nominal display refresh interval (~60 Hz).
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Frames buffered between the source and the tick loop.
const FRAME_QUEUE: usize = 8;

/// Sample rate of the synthetic source.
const DEMO_SAMPLE_RATE: f32 = 44100.0;

struct Args {
    config_path: Option<String>,
    demo: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        config_path: None,
        demo: !cfg!(feature = "capture"),
    };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--demo" => args.demo = true,
            _ => args.config_path = Some(arg),
        }
    }
    args
}

fn main() -> Result<()> {
    logging::init_logging();
    let args = parse_args();

    let config = match &args.config_path {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => TunerConfig::default(),
    };
    info!(
        reference_hz = config.reference_frequency_hz,
        buffer_size = config.buffer_size,
        method = ?config.difference_method,
        "starting pitchline"
    );

    let mut tracker = PitchTracker::new(&config).context("building pitch tracker")?;
    info!(notes = tracker.table().len(), "note table ready");

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<SampleBuffer>(FRAME_QUEUE);

    if args.demo {
        let source = ToneSource::new(DEMO_SAMPLE_RATE, config.buffer_size, demo_script())?;
        let frame_period = Duration::from_secs_f32(config.buffer_size as f32 / DEMO_SAMPLE_RATE);
        let handle = spawn_source(source, frame_period, frame_tx);
        run_tick_loop(&mut tracker, &frame_rx, &mut TerminalDisplay::stdout());
        if handle.join().is_err() {
            warn!("source thread panicked");
        }
    } else {
        run_capture(&mut tracker, &config, frame_tx, &frame_rx)?;
    }

    info!("pitchline finished");
    Ok(())
}

#[cfg(feature = "capture")]
fn run_capture(
    tracker: &mut PitchTracker,
    config: &TunerConfig,
    frame_tx: Sender<SampleBuffer>,
    frame_rx: &Receiver<SampleBuffer>,
) -> Result<()> {
    use cpal::traits::StreamTrait;

    let (stream, sample_rate) = audio::start_audio_capture(config.buffer_size, frame_tx)
        .context("starting audio capture")?;
    info!(sample_rate, "capturing from microphone");
    run_tick_loop(tracker, frame_rx, &mut TerminalDisplay::stdout());
    if let Err(e) = stream.pause() {
        warn!("error pausing stream: {}", e);
    }
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn run_capture(
    _tracker: &mut PitchTracker,
    _config: &TunerConfig,
    _frame_tx: Sender<SampleBuffer>,
    _frame_rx: &Receiver<SampleBuffer>,
) -> Result<()> {
    anyhow::bail!("built without the `capture` feature; run with --demo")
}

/// A short performance: a clean A4, a harmonic-rich low E, a quiet passage
/// that stays under the volume gate, and rests in between.
fn demo_script() -> Vec<ToneSegment> {
    vec![
        ToneSegment::tone(440.0, 0.5, 40),
        ToneSegment::rest(20),
        ToneSegment::tone(82.41, 0.4, 40).with_second_harmonic(0.7),
        ToneSegment::rest(20),
        ToneSegment::tone(523.25, 0.3, 30),
        ToneSegment::tone(523.25, 0.02, 10),
        ToneSegment::rest(20),
    ]
}

/// Plays a source in real time on its own thread.
///
/// Dropping the sender at the end of the script closes the channel, which
/// ends the tick loop.
fn spawn_source(
    mut source: ToneSource,
    frame_period: Duration,
    sender: Sender<SampleBuffer>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!(frames = source.remaining_frames(), "source thread started");
        while let Some(buffer) = source.next_buffer() {
            if sender.send(buffer).is_err() {
                break;
            }
            thread::sleep(frame_period);
        }
        debug!("source thread finished");
    })
}

/// Drives the tracker until the frame channel closes.
///
/// Each tick uses the most recent frame, like an analyser node that always
/// exposes the latest window. The tracker decides when the next tick runs.
fn run_tick_loop(
    tracker: &mut PitchTracker,
    frames: &Receiver<SampleBuffer>,
    display: &mut TerminalDisplay,
) {
    let start = Instant::now();
    let mut latest: Option<SampleBuffer> = None;
    let mut next_tick_at = start;

    loop {
        let wait = next_tick_at.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            let _ = after(wait).recv();
        }

        let mut closed = false;
        let mut fresh = false;
        loop {
            match frames.try_recv() {
                Ok(frame) => {
                    latest = Some(frame);
                    fresh = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }
        if closed && !fresh {
            break;
        }

        let now = start.elapsed();
        let output = match latest.as_ref().map(|buffer| tracker.step(buffer, now)) {
            Some(Ok(output)) => output,
            Some(Err(e)) => {
                warn!("skipping frame: {}", e);
                latest = None;
                next_tick_at = Instant::now() + TICK_INTERVAL;
                continue;
            }
            // Nothing captured yet; keep the silence timer running.
            None => {
                if let Some(output) = tracker.poll_silence(now) {
                    output.dispatch(display);
                }
                next_tick_at = Instant::now() + TICK_INTERVAL;
                continue;
            }
        };

        output.dispatch(display);
        next_tick_at = Instant::now()
            + match output.next_tick {
                NextTick::Immediate => TICK_INTERVAL,
                NextTick::After(delay) => delay.max(TICK_INTERVAL),
            };
    }
}
