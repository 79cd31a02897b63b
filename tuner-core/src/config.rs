//! # Configuration Module
//!
//! Named, overridable parameters for the tuning pipeline. The defaults
//! carry the product's shipped constants; a front-end can load a
//! different set (and a custom tuning table) from a JSON config file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters for a tuning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Minimum frame RMS energy for pitch analysis (silence gate).
    pub rms_gate_threshold: f32,
    /// Amplitude below which a leading/trailing sample ends the transient run.
    pub edge_trim_threshold: f32,
    /// Number of recent estimates averaged by the pitch smoother.
    pub history_size: usize,
    /// Maximum absolute Hz deviation still classified as in tune.
    pub tolerance_hz: f32,
    /// Minimum gap between audible confirmations, in milliseconds.
    pub cooldown_ms: u64,
    /// Half-range of the needle in display units (needle clamps to ±range).
    pub needle_range_degrees: f32,
    /// Needle deflection per Hz of deviation.
    pub needle_degrees_per_hz: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            rms_gate_threshold: 0.01,
            edge_trim_threshold: 0.2,
            history_size: 5,
            tolerance_hz: 1.0,
            cooldown_ms: 2000,
            needle_range_degrees: 45.0,
            needle_degrees_per_hz: 2.0,
        }
    }
}

impl TunerConfig {
    /// The confirmation cooldown as a `Duration`.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_constants() {
        let config = TunerConfig::default();
        assert_eq!(config.rms_gate_threshold, 0.01);
        assert_eq!(config.edge_trim_threshold, 0.2);
        assert_eq!(config.history_size, 5);
        assert_eq!(config.tolerance_hz, 1.0);
        assert_eq!(config.cooldown(), Duration::from_millis(2000));
    }
}
