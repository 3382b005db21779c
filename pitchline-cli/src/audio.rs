//! # Audio Capture Module
//!
//! Microphone input through CPAL (Cross-Platform Audio Library), enabled with
//! the `capture` feature. Incoming samples are cut into frames of the
//! configured size and handed to the tick loop over a channel.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use pitchline_core::SampleBuffer;
use tracing::{error, info, warn};

/// Preferred capture rate in Hz.
const TARGET_SAMPLE_RATE: u32 = 44100;

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `frame_size` - Samples per frame sent to the tracker
/// * `sender` - Channel to the tick loop. Frames are dropped when it is full
///
/// # Returns
/// * `Ok((stream, sample_rate))` - The stream must be kept alive while capturing
/// * `Err(e)` - No device or no mono f32 configuration
pub fn start_audio_capture(
    frame_size: usize,
    sender: Sender<SampleBuffer>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!(device = %device.name()?, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable mono f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    info!(sample_rate, frame_size, "selected capture format");

    let err_fn = |err| error!("audio stream error: {}", err);

    // Accumulates callback data until a full frame is available.
    let mut pending = Vec::with_capacity(frame_size * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);

            while pending.len() >= frame_size {
                let frame = pending[..frame_size].to_vec();
                pending.drain(..frame_size);

                match SampleBuffer::new(frame, sample_rate as f32) {
                    // A full channel means the tick loop is behind; newer frames follow.
                    Ok(buffer) => {
                        let _ = sender.try_send(buffer);
                    }
                    Err(e) => warn!("dropping captured frame: {}", e),
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks a mono f32 configuration whose rate range is closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            if (min..=max).contains(&target_rate) {
                0
            } else {
                (min as i64 - target_rate as i64)
                    .abs()
                    .min((max as i64 - target_rate as i64).abs())
            }
        })
}
