//! Threat Module
//!
//! Batch threat score (0-100) and level.
//!
//! ## Structure
//! - `types`: ThreatScore
//! - `rules`: Thresholds and constants
//! - `aggregator`: Aggregation logic

pub mod types;
pub mod rules;
pub mod aggregator;

pub use types::ThreatScore;
pub use rules::{level_for_score, VOLUME_BONUS, VOLUME_THRESHOLD};
pub use aggregator::{score_threat, ThreatAggregator};
