//! # Pitch Detection Module
//!
//! This module implements time-domain pitch detection for the tuner.
//! It provides a silence gate based on frame energy and a fundamental
//! frequency estimator based on normalized autocorrelation with edge
//! trimming.
//!
//! ## Features
//! - RMS-based silence gating to skip unvoiced frames
//! - Edge trimming to exclude onset/offset transients
//! - Autocorrelation period estimation (O(M²), fine at M ≈ 2048)
//! - Degenerate inputs resolve to `None`, never to an error

/// Computes the root-mean-square energy of a frame.
///
/// # Arguments
/// * `frame` - Input audio samples in [-1.0, 1.0]
///
/// # Returns
/// * RMS energy of the frame (0.0 for an empty frame)
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Decides whether a frame carries enough signal energy to analyze.
///
/// Autocorrelation on the noise floor produces spurious periods, so
/// frames below the gate are skipped entirely rather than analyzed.
///
/// # Arguments
/// * `frame` - Input audio samples
/// * `rms_gate_threshold` - Minimum RMS energy for a voiced frame
///
/// # Returns
/// * `true` if the frame is voiced (RMS >= threshold)
pub fn is_voiced(frame: &[f32], rms_gate_threshold: f32) -> bool {
    rms(frame) >= rms_gate_threshold
}

/// Estimates the fundamental frequency of a voiced frame via autocorrelation.
///
/// The caller is expected to have gated the frame with [`is_voiced`];
/// this function only handles the numeric edge cases of the estimate
/// itself. The algorithm:
///
/// 1. Trim the leading and trailing transient regions: walk inward from
///    each end over at most half the frame until a sample drops below
///    the edge threshold, keeping the steady-state middle.
/// 2. Compute the unnormalized autocorrelation of the trimmed sub-frame.
/// 3. Walk forward past the zero-lag peak to the first local minimum,
///    then take the position of the maximum beyond it as the period.
///
/// # Arguments
/// * `signal` - Input audio frame (already gated as voiced)
/// * `sample_rate` - Sample rate in Hz
/// * `edge_trim_threshold` - Amplitude below which a sample ends the transient run
///
/// # Returns
/// * `Some(frequency)` - Estimated fundamental frequency in Hz
/// * `None` - Degenerate input (empty trimmed range, no minimum, zero period)
pub fn detect_pitch_autocorrelation(
    signal: &[f32],
    sample_rate: u32,
    edge_trim_threshold: f32,
) -> Option<f32> {
    let size = signal.len();
    if size < 2 {
        return None;
    }

    // --- Step 1: Edge trimming ---
    // Only the first/last half is searched; if no sample drops below the
    // threshold there, the trim point defaults to the frame boundary.
    let mut r1 = 0;
    let mut r2 = size - 1;
    for i in 0..size / 2 {
        if signal[i].abs() < edge_trim_threshold {
            r1 = i;
            break;
        }
    }
    for i in 1..size / 2 {
        if signal[size - i].abs() < edge_trim_threshold {
            r2 = size - i;
            break;
        }
    }

    let trimmed = &signal[r1..r2];
    let new_size = trimmed.len();
    if new_size < 2 {
        return None;
    }

    // --- Step 2: Unnormalized autocorrelation c[i] = Σ x[j]·x[j+i] ---
    let mut c = vec![0.0f32; new_size];
    for i in 0..new_size {
        for j in 0..(new_size - i) {
            c[i] += trimmed[j] * trimmed[j + i];
        }
    }

    // --- Step 3: Skip the zero-lag peak and its decaying shoulder ---
    // Walk forward to the first local minimum. If the walk reaches the
    // end of the array the signal is degenerate (no repeating period).
    let mut d = 0;
    while c[d] > c[d + 1] {
        d += 1;
        if d + 1 >= new_size {
            return None;
        }
    }

    // --- Step 4: The maximum beyond the minimum is the period T0 ---
    let mut max_val = f32::MIN;
    let mut max_pos = 0;
    for i in d..new_size {
        if c[i] > max_val {
            max_val = c[i];
            max_pos = i;
        }
    }

    if max_pos == 0 {
        return None;
    }

    Some(sample_rate as f32 / max_pos as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_sine(sample_rate: f32, frequency: f32, amplitude: f32, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin()
            })
            .collect()
    }

    #[test]
    fn silence_gate_rejects_zeros() {
        let frame = vec![0.0f32; 2048];
        assert!(!is_voiced(&frame, 0.01));
    }

    #[test]
    fn silence_gate_rejects_low_energy() {
        // Amplitude 0.005 sine -> RMS ~0.0035, below the 0.01 gate.
        let frame = generate_sine(44100.0, 440.0, 0.005, 2048);
        assert!(!is_voiced(&frame, 0.01));
    }

    #[test]
    fn silence_gate_passes_voiced_frame() {
        let frame = generate_sine(44100.0, 440.0, 0.5, 2048);
        assert!(is_voiced(&frame, 0.01));
    }

    #[test]
    fn detects_sine_within_two_percent() {
        let sample_rate = 44100u32;
        for &frequency in &[392.0f32, 261.63, 329.63, 440.0] {
            let frame = generate_sine(sample_rate as f32, frequency, 0.5, 2048);
            let detected = detect_pitch_autocorrelation(&frame, sample_rate, 0.2)
                .expect("sine frame should yield an estimate");
            let relative_error = (detected - frequency).abs() / frequency;
            assert!(
                relative_error < 0.02,
                "expected ~{} Hz, got {} Hz",
                frequency,
                detected
            );
        }
    }

    #[test]
    fn estimate_stays_within_bounds() {
        let sample_rate = 48000u32;
        let frame = generate_sine(sample_rate as f32, 220.0, 0.8, 2048);
        let detected = detect_pitch_autocorrelation(&frame, sample_rate, 0.2).unwrap();
        assert!(detected > 0.0);
        assert!(detected <= sample_rate as f32);
    }

    #[test]
    fn degenerate_frames_return_none() {
        // Too short to correlate.
        assert_eq!(detect_pitch_autocorrelation(&[0.5], 44100, 0.2), None);
        // All zeros: c is flat, the minimum walk stops at d = 0 and the
        // maximum stays at the zero lag, so no period is reported.
        let zeros = vec![0.0f32; 256];
        assert_eq!(detect_pitch_autocorrelation(&zeros, 44100, 0.2), None);
    }

    #[test]
    fn monotonic_decay_returns_none() {
        // A decaying exponential has a strictly decreasing autocorrelation,
        // so the minimum walk runs off the end of the array.
        let frame: Vec<f32> = (0..64).map(|i| 0.1 * 0.9f32.powi(i)).collect();
        assert_eq!(detect_pitch_autocorrelation(&frame, 44100, 0.2), None);
    }
}
