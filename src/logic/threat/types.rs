//! Threat Types
//!
//! Data structures only, no scoring logic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{EventType, Severity};

/// Aggregate threat over one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatScore {
    /// 0 - 100
    pub score: u8,
    pub level: Severity,
    /// Distinct event types present in the batch
    pub contributors: BTreeSet<EventType>,
    pub narrative: String,
}

impl ThreatScore {
    pub fn is_critical(&self) -> bool {
        self.level == Severity::Critical
    }
}
