//! Mitigation Types

use serde::{Deserialize, Serialize};

use crate::models::Rating;

/// One suggested remedial action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationRecommendation {
    pub id: String,
    pub action: String,
    pub impact: Rating,
    pub effort: Rating,
    pub rationale: String,
}

/// Rule table row (no id yet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MitigationRule {
    pub action: &'static str,
    pub impact: Rating,
    pub effort: Rating,
    pub rationale: &'static str,
}
