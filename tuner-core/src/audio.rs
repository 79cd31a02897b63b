//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform
//! Audio Library). It selects an input device, conditions the microphone
//! signal with a low-pass filter, and streams fixed-size frames to the
//! analysis pipeline over a channel.
//!
//! ## Features
//! - Automatic input device selection (mono f32, nearest 44.1 kHz)
//! - 1 kHz low-pass conditioning ahead of pitch analysis
//! - Fixed-size frame accumulation in the stream callback
//! - Device failures surface as errors before any frame is delivered

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Number of samples per analysis frame.
///
/// Larger frames improve period resolution but increase latency;
/// 2048 samples is ~46ms at 44.1 kHz, comfortably more than two
/// periods of the lowest ukulele string (C4, 261.63 Hz).
pub const FRAME_SIZE: usize = 2048;

/// Cutoff of the capture low-pass filter in Hz.
///
/// Ukulele fundamentals sit below 450 Hz; rolling off above 1 kHz
/// knocks down hiss and high partials before autocorrelation.
const LOWPASS_CUTOFF_HZ: f32 = 1000.0;

/// A direct-form-I biquad low-pass (RBJ cookbook coefficients).
///
/// Applied per-sample in the capture callback to condition the
/// microphone signal before frame accumulation.
#[derive(Debug)]
pub struct LowPassFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl LowPassFilter {
    /// Builds a low-pass filter for the given cutoff and sample rate.
    ///
    /// # Arguments
    /// * `cutoff` - Cutoff frequency in Hz
    /// * `sample_rate` - Sample rate in Hz
    /// * `q` - Filter quality factor (0.707 for a Butterworth response)
    pub fn new(cutoff: f32, sample_rate: f32, q: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let cos_omega = omega.cos();

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_omega) / 2.0) / a0,
            b1: (1.0 - cos_omega) / a0,
            b2: ((1.0 - cos_omega) / 2.0) / a0,
            a1: (-2.0 * cos_omega) / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Filters one sample.
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks a mono f32 configuration closest to 44.1 kHz
/// 3. Sets up a callback that low-passes the signal, accumulates
///    [`FRAME_SIZE`] frames and forwards them to the analysis thread
///
/// Frames are sent with `try_send`: if the analysis side falls behind,
/// frames are dropped rather than queued, since stale pitch data is
/// worse than a skipped update.
///
/// # Arguments
/// * `sender` - Channel sender for streaming frames to the analysis thread
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if device or stream setup fails
pub fn start_audio_capture(sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    println!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, 44100)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let config = supported_config.with_sample_rate(cpal::SampleRate(44100));
    let sample_rate_val = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    println!("Selected sample rate: {} Hz", sample_rate_val);

    let err_fn = |err| eprintln!("An error occurred on the audio stream: {}", err);

    let mut lowpass = LowPassFilter::new(LOWPASS_CUTOFF_HZ, sample_rate_val as f32, 0.707);
    // This buffer accumulates conditioned audio data from the callback.
    let mut audio_buffer = Vec::with_capacity(FRAME_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Condition and append the new data to our buffer.
            audio_buffer.extend(data.iter().map(|&sample| lowpass.process(sample)));

            // While we have enough data for a full frame, forward it.
            while audio_buffer.len() >= FRAME_SIZE {
                let frame_to_send = audio_buffer[..FRAME_SIZE].to_vec();

                // Send the frame, ignoring errors if the channel is full.
                let _ = sender.try_send(frame_to_send);

                audio_buffer.drain(..FRAME_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate_val))
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Searches through available configurations for a mono f32 format and
/// picks the one whose supported rate range sits closest to the target.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = LowPassFilter::new(1000.0, 44100.0, 0.707);
        // Run to steady state on a constant input.
        let mut y = 0.0;
        for _ in 0..2000 {
            y = filter.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let sample_rate = 44100.0;
        let mut filter = LowPassFilter::new(1000.0, sample_rate, 0.707);
        let count = 4096;
        let mut peak = 0.0f32;
        for i in 0..count {
            let x = (2.0 * std::f32::consts::PI * 8000.0 * i as f32 / sample_rate).sin();
            let y = filter.process(x);
            // Skip the transient before measuring.
            if i > count / 2 {
                peak = peak.max(y.abs());
            }
        }
        // 8 kHz is three octaves above cutoff: expect heavy attenuation.
        assert!(peak < 0.1, "peak after filtering was {}", peak);
    }
}
