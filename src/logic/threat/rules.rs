//! Threat Aggregation Rules
//!
//! Constants only.

use crate::models::Severity;

/// Mean risk is multiplied by this to land on the 0-100 scale
pub const SCORE_MULTIPLIER: f64 = 20.0;

pub const MAX_SCORE: f64 = 100.0;

/// Batches larger than this get the volume bonus
pub const VOLUME_THRESHOLD: usize = 50;

/// Bonus for many events in one window
pub const VOLUME_BONUS: f64 = 15.0;

// Level thresholds (inclusive lower bound)
pub const CRITICAL_MIN: u8 = 80;
pub const HIGH_MIN: u8 = 60;
pub const MEDIUM_MIN: u8 = 40;

/// Map a 0-100 score to its level
pub fn level_for_score(score: u8) -> Severity {
    if score >= CRITICAL_MIN {
        Severity::Critical
    } else if score >= HIGH_MIN {
        Severity::High
    } else if score >= MEDIUM_MIN {
        Severity::Medium
    } else {
        Severity::Low
    }
}
