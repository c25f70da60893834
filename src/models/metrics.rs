//! Pipeline metrics snapshot model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable throughput snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAIMetrics {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub events_processed: u64,
    pub anomalies_detected: u64,
    pub avg_threat_score: f64,
    pub recommendations_issued: u64,
}
