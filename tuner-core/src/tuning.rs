//! # Reference Tuning Module
//!
//! This module provides the reference tuning table and note matching for
//! the tuner. It maps a detected frequency to the nearest note in a
//! configurable table and reports the signed deviation in Hz.
//!
//! ## Features
//! - Built-in standard ukulele tuning (G4, C4, E4, A4)
//! - Validated custom tuning tables (unique names, positive frequencies)
//! - Nearest-note matching with signed Hz deviation
//!
//! Deviation is deliberately kept in raw Hz rather than cents: the same
//! absolute tolerance applies to every string, which makes high strings
//! perceptually easier to land in tune than low ones. That behavior is
//! inherited from the product and must not be silently corrected here.

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Represents a single musical note with its name and target frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Note name (e.g., "A4", "G4")
    pub name: String,
    /// Target frequency in Hz
    pub frequency: f32,
}

/// The result of matching a frequency against the reference tuning.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Name of the nearest note in the table.
    pub note: String,
    /// Target frequency of that note in Hz.
    pub target_frequency: f32,
    /// Signed deviation in Hz (positive = sharp, negative = flat).
    pub deviation_hz: f32,
}

/// An ordered, validated table of reference notes.
///
/// Iteration order is the insertion order of the table; ties during
/// matching are broken by that order (first minimal difference wins).
/// The table is immutable for the lifetime of a tuning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTuning {
    notes: Vec<Note>,
}

/// Statically computed table for standard (gCEA) ukulele tuning.
static UKULELE: Lazy<ReferenceTuning> = Lazy::new(|| {
    ReferenceTuning::new(vec![
        Note { name: "G4".to_string(), frequency: 392.00 },
        Note { name: "C4".to_string(), frequency: 261.63 },
        Note { name: "E4".to_string(), frequency: 329.63 },
        Note { name: "A4".to_string(), frequency: 440.00 },
    ])
    .expect("built-in ukulele table is valid")
});

impl ReferenceTuning {
    /// Builds a tuning table from a list of notes.
    ///
    /// # Arguments
    /// * `notes` - Notes in the order they should break matching ties
    ///
    /// # Returns
    /// * `Ok(table)` - Validated table
    /// * `Err(e)` - Empty table, duplicate note name, or non-positive frequency
    pub fn new(notes: Vec<Note>) -> Result<Self> {
        if notes.is_empty() {
            bail!("reference tuning must contain at least one note");
        }
        for (i, note) in notes.iter().enumerate() {
            if !(note.frequency > 0.0) {
                bail!("note {} has non-positive frequency {}", note.name, note.frequency);
            }
            if notes[..i].iter().any(|other| other.name == note.name) {
                bail!("duplicate note name {} in reference tuning", note.name);
            }
        }
        Ok(Self { notes })
    }

    /// Returns the built-in standard ukulele tuning (G4, C4, E4, A4).
    pub fn ukulele() -> &'static ReferenceTuning {
        &UKULELE
    }

    /// The notes of this table, in iteration order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Returns true if the table contains a note with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.notes.iter().any(|note| note.name == name)
    }

    /// Finds the note closest to a given frequency.
    ///
    /// Performs a linear scan over the table, keeping the first note with
    /// the minimal absolute difference. For tables with well-separated
    /// frequencies the tie-break never matters in practice.
    ///
    /// # Arguments
    /// * `freq` - Detected (smoothed) frequency in Hz
    ///
    /// # Returns
    /// * `MatchResult` with the nearest note and the signed Hz deviation
    pub fn nearest(&self, freq: f32) -> MatchResult {
        let mut closest = &self.notes[0];
        let mut min_diff = f32::INFINITY;
        for note in &self.notes {
            let diff = (note.frequency - freq).abs();
            if diff < min_diff {
                min_diff = diff;
                closest = note;
            }
        }
        MatchResult {
            note: closest.name.clone(),
            target_frequency: closest.frequency,
            deviation_hz: freq - closest.frequency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_a4() {
        let result = ReferenceTuning::ukulele().nearest(440.0);
        assert_eq!(result.note, "A4");
        assert_eq!(result.target_frequency, 440.0);
        assert_eq!(result.deviation_hz, 0.0);
    }

    #[test]
    fn reports_signed_deviation() {
        let sharp = ReferenceTuning::ukulele().nearest(441.0);
        assert_eq!(sharp.note, "A4");
        assert_eq!(sharp.deviation_hz, 1.0);

        let flat = ReferenceTuning::ukulele().nearest(439.5);
        assert_eq!(flat.note, "A4");
        assert_eq!(flat.deviation_hz, -0.5);
    }

    #[test]
    fn matches_each_string() {
        let table = ReferenceTuning::ukulele();
        assert_eq!(table.nearest(390.0).note, "G4");
        assert_eq!(table.nearest(262.0).note, "C4");
        assert_eq!(table.nearest(330.0).note, "E4");
    }

    #[test]
    fn tie_breaks_by_table_order() {
        let table = ReferenceTuning::new(vec![
            Note { name: "X".to_string(), frequency: 100.0 },
            Note { name: "Y".to_string(), frequency: 120.0 },
        ])
        .unwrap();
        // 110 Hz is equidistant; the first table entry wins.
        assert_eq!(table.nearest(110.0).note, "X");
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(ReferenceTuning::new(vec![]).is_err());
        assert!(
            ReferenceTuning::new(vec![Note { name: "A4".to_string(), frequency: 0.0 }]).is_err()
        );
        assert!(
            ReferenceTuning::new(vec![
                Note { name: "A4".to_string(), frequency: 440.0 },
                Note { name: "A4".to_string(), frequency: 441.0 },
            ])
            .is_err()
        );
    }
}
