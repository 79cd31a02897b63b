// tuner-core/src/lib.rs

//! The core logic for the ukulele tuner.
//! This crate is responsible for audio capture, pitch detection,
//! smoothing, note matching and tuning classification. It is
//! completely headless and contains no UI code.

pub mod audio;
pub mod config;
pub mod pitch;
pub mod session;
pub mod tuning;

use session::TuningStatus;
use tuning::MatchResult;

/// Represents the result of a single analyzed audio frame.
// This derive is necessary for the struct to cross the worker channel.
#[derive(Debug, Clone)]
pub struct TuningUpdate {
    /// The smoothed detected frequency in Hz (mean of the pitch history).
    pub smoothed_frequency: f32,
    /// The nearest note in the reference tuning and the signed Hz deviation.
    pub matched: MatchResult,
    /// The discrete tuning status derived from the match and the selected target.
    pub status: TuningStatus,
    /// True when the audible confirmation should fire. Already rate-limited
    /// by the session's cooldown window, so the caller can act on it directly.
    pub play_confirmation: bool,
}
