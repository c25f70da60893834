//! Anomaly Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One flagged event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    pub event_id: String,
    pub reason: String,
    pub score: f64,
}

/// Result of one detection pass over a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetectionResult {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_events: usize,
    pub anomalies: Vec<AnomalyFinding>,
    pub anomaly_rate: f64,
}

impl AnomalyDetectionResult {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }
}
