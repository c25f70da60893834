//! Security Report
//!
//! Consolidated summary of one pipeline run: severity counts, compliance
//! status and the recommended actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::anomaly::AnomalyDetectionResult;
use super::mitigation::MitigationRecommendation;
use super::threat::ThreatScore;
use crate::models::{SecurityEvent, Severity};

/// Event counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeveritySummary {
    pub fn from_events(events: &[SecurityEvent]) -> Self {
        let mut summary = Self::default();
        for event in events {
            match event.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplianceStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub generated_at: DateTime<Utc>,
    pub summary: SeveritySummary,
    /// `Fail` whenever the batch contains a critical event
    pub overall_status: ComplianceStatus,
    pub threat_score: u8,
    pub threat_level: Severity,
    pub narrative: String,
    pub anomaly_rate: f64,
    pub flagged_events: Vec<String>,
    pub recommendations: Vec<String>,
}

impl SecurityReport {
    pub fn build(
        events: &[SecurityEvent],
        anomalies: &AnomalyDetectionResult,
        threat: &ThreatScore,
        recommendations: &[MitigationRecommendation],
    ) -> Self {
        let summary = SeveritySummary::from_events(events);
        let overall_status = if summary.critical == 0 {
            ComplianceStatus::Pass
        } else {
            ComplianceStatus::Fail
        };

        Self {
            generated_at: Utc::now(),
            summary,
            overall_status,
            threat_score: threat.score,
            threat_level: threat.level,
            narrative: threat.narrative.clone(),
            anomaly_rate: anomalies.anomaly_rate,
            flagged_events: anomalies.anomalies.iter().map(|a| a.event_id.clone()).collect(),
            recommendations: recommendations.iter().map(|r| r.action.clone()).collect(),
        }
    }
}
