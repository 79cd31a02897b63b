//! # Tuning Session Module
//!
//! This module ties the per-frame pipeline together: silence gate →
//! autocorrelation → smoothing → note matching → tuning classification.
//! All mutable per-session state (pitch history, selected target note,
//! confirmation cooldown) lives in an explicit [`TuningSession`] context
//! instead of globals, with mutation confined to [`TuningSession::select_target`]
//! and [`TuningSession::process_frame`].
//!
//! ## Features
//! - Bounded pitch history with O(1) push/evict
//! - Stateless classification of sharp/flat/in-tune/off-target
//! - Cooldown-gated audible confirmation signal
//! - Injectable time source so tests can simulate elapsed time

use crate::config::TunerConfig;
use crate::pitch;
use crate::tuning::{MatchResult, ReferenceTuning};
use crate::TuningUpdate;
use std::collections::VecDeque;
use std::time::Instant;

/// The discrete tuning status reported for every analyzed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TuningStatus {
    /// A target note is selected and a different note was detected.
    OffTarget { detected: String, selected: String },
    /// The matched note is within tolerance of its target frequency.
    InTune(String),
    /// The matched note is above its target frequency by at least the tolerance.
    Sharp(String),
    /// The matched note is below its target frequency by at least the tolerance.
    Flat(String),
}

/// A monotonic time source, injectable so tests can simulate elapsed time
/// deterministically instead of sleeping.
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// The real monotonic clock, used outside of tests.
#[derive(Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Maintains a bounded window of recent pitch estimates and reports their mean.
///
/// Suppresses frame-to-frame jitter from the autocorrelation estimator,
/// which is sensitive to noise near period boundaries. Silent frames
/// never enter the history; the history is cleared whenever the user
/// reselects a target note so stale pitch from the previous string does
/// not bias the new average.
#[derive(Debug)]
pub struct PitchSmoother {
    history: VecDeque<f32>,
    capacity: usize,
}

impl PitchSmoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a new estimate, evicting the oldest beyond capacity.
    ///
    /// # Returns
    /// * The arithmetic mean of the current history.
    pub fn push(&mut self, estimate: f32) -> f32 {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(estimate);
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    /// Clears the history immediately.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Rate limit for the audible confirmation.
///
/// Fires at most once per cooldown window regardless of how many
/// consecutive frames report in-tune. The comparison against the stored
/// last-fired instant is strictly greater than the window.
#[derive(Debug)]
struct ConfirmationGate {
    cooldown: std::time::Duration,
    last_fired: Option<Instant>,
}

impl ConfirmationGate {
    fn new(cooldown: std::time::Duration) -> Self {
        Self {
            cooldown,
            last_fired: None,
        }
    }

    fn try_fire(&mut self, now: Instant) -> bool {
        let allowed = match self.last_fired {
            None => true,
            Some(last) => now.duration_since(last) > self.cooldown,
        };
        if allowed {
            self.last_fired = Some(now);
        }
        allowed
    }
}

/// Turns a match result and the selected target into a tuning status.
///
/// Off-target takes precedence: when a target note is selected and the
/// detected note differs, the deviation magnitude is irrelevant. In-tune
/// requires |deviation| strictly below the tolerance, so a deviation of
/// exactly the tolerance is classified sharp or flat.
pub fn classify(
    matched: &MatchResult,
    selected_target: Option<&str>,
    tolerance_hz: f32,
) -> TuningStatus {
    if let Some(selected) = selected_target {
        if selected != matched.note {
            return TuningStatus::OffTarget {
                detected: matched.note.clone(),
                selected: selected.to_string(),
            };
        }
    }
    if matched.deviation_hz.abs() < tolerance_hz {
        TuningStatus::InTune(matched.note.clone())
    } else if matched.deviation_hz > 0.0 {
        TuningStatus::Sharp(matched.note.clone())
    } else {
        TuningStatus::Flat(matched.note.clone())
    }
}

/// Maps a Hz deviation to a needle deflection, clamped to the meter range.
pub fn needle_angle(deviation_hz: f32, config: &TunerConfig) -> f32 {
    (deviation_hz * config.needle_degrees_per_hz)
        .clamp(-config.needle_range_degrees, config.needle_range_degrees)
}

/// A single tuning session: configuration, reference tuning, pitch
/// history, selected target and confirmation cooldown.
///
/// One frame at a time: the pipeline is synchronous and the history is
/// mutated in place, so a session must not be driven from more than one
/// frame-processing invocation concurrently.
#[derive(Debug)]
pub struct TuningSession<C: TimeSource = SystemClock> {
    config: TunerConfig,
    tuning: ReferenceTuning,
    smoother: PitchSmoother,
    selected_target: Option<String>,
    confirmation: ConfirmationGate,
    clock: C,
}

impl TuningSession<SystemClock> {
    /// Creates a session driven by the real monotonic clock.
    pub fn new(config: TunerConfig, tuning: ReferenceTuning) -> Self {
        Self::with_clock(config, tuning, SystemClock)
    }
}

impl<C: TimeSource> TuningSession<C> {
    /// Creates a session with an explicit time source (used by tests).
    pub fn with_clock(config: TunerConfig, tuning: ReferenceTuning, clock: C) -> Self {
        let smoother = PitchSmoother::new(config.history_size);
        let confirmation = ConfirmationGate::new(config.cooldown());
        Self {
            config,
            tuning,
            smoother,
            selected_target: None,
            confirmation,
            clock,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn tuning(&self) -> &ReferenceTuning {
        &self.tuning
    }

    /// The currently selected target note, if any. `None` matches any note.
    pub fn selected_target(&self) -> Option<&str> {
        self.selected_target.as_deref()
    }

    /// Selects the target note (or `None` to match any note).
    ///
    /// Also clears the pitch history so the average restarts from the
    /// next estimate instead of blending in pitch from another string.
    pub fn select_target(&mut self, target: Option<String>) {
        self.selected_target = target;
        self.smoother.reset();
    }

    /// Runs the full pipeline on one audio frame.
    ///
    /// # Arguments
    /// * `frame` - Audio samples in [-1.0, 1.0]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `Some(update)` - The frame produced a pitch estimate
    /// * `None` - Silence or a degenerate frame; the caller keeps the
    ///   previously displayed value and status
    pub fn process_frame(&mut self, frame: &[f32], sample_rate: u32) -> Option<TuningUpdate> {
        if !pitch::is_voiced(frame, self.config.rms_gate_threshold) {
            return None;
        }
        let estimate = pitch::detect_pitch_autocorrelation(
            frame,
            sample_rate,
            self.config.edge_trim_threshold,
        )?;

        let smoothed_frequency = self.smoother.push(estimate);
        let matched = self.tuning.nearest(smoothed_frequency);
        let status = classify(
            &matched,
            self.selected_target.as_deref(),
            self.config.tolerance_hz,
        );
        let play_confirmation = matches!(status, TuningStatus::InTune(_))
            && self.confirmation.try_fire(self.clock.now());

        Some(TuningUpdate {
            smoothed_frequency,
            matched,
            status,
            play_confirmation,
        })
    }
}
