use serde::{Deserialize, Serialize};

/// Thresholds for the automatic risk classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Distances at or beyond this are a red vote.
    pub mismatch_meters: f64,
    /// Distances at or beyond this (and below the mismatch radius) are a yellow vote.
    pub warning_meters: f64,
    /// How far past "now" an inspection date may sit before it counts as future-dated.
    pub future_tolerance_hours: i64,
    pub brief_feedback_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mismatch_meters: 1000.0,
            warning_meters: 200.0,
            future_tolerance_hours: 24,
            brief_feedback_chars: 50,
        }
    }
}
