//! Mitigation Module
//!
//! Level -> ordered remediation actions.

pub mod types;
pub mod engine;

pub use types::{MitigationRecommendation, MitigationRule};
pub use engine::{recommend_mitigations, rules_for_level, MitigationEngine};
