//! Risk Module
//!
//! Per-event risk contribution used by anomaly detection and threat
//! aggregation.
//!
//! ## Structure
//! - `rules`: Weights and modifiers
//! - `scorer`: Scoring logic

pub mod rules;
pub mod scorer;

pub use rules::SeverityWeights;
pub use scorer::{event_risk_score, RiskScorer};
