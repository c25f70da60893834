//! Anomaly Detector
//!
//! Percentile cutoff over the risk scores of a single batch. There is no
//! per-user or per-IP history: a batch is only compared with itself.

use chrono::Utc;

use super::types::{AnomalyDetectionResult, AnomalyFinding};
use crate::config::DEFAULT_ANOMALY_THRESHOLD;
use crate::logic::audit::AuditStore;
use crate::logic::risk::rules::{ACTION_FAILED_LOGIN, ACTION_RATE_LIMIT};
use crate::logic::risk::RiskScorer;
use crate::models::{AuditLogEntry, EventType, SecurityEvent, Severity};

// ============================================================================
// REASONS
// ============================================================================

pub const REASON_FAILED_LOGIN: &str = "Failed login spike";
pub const REASON_RATE_LIMIT: &str = "API rate limit triggered";
pub const REASON_BLOCKCHAIN: &str = "Unusual blockchain activity";
pub const REASON_CRITICAL: &str = "Critical severity signal";
pub const REASON_OUTLIER: &str = "Outlier event characteristics";

/// First matching rule wins
pub fn anomaly_reason(event: &SecurityEvent) -> &'static str {
    if event.event_type == EventType::Auth && event.has_action(ACTION_FAILED_LOGIN) {
        REASON_FAILED_LOGIN
    } else if event.event_type == EventType::Api && event.has_action(ACTION_RATE_LIMIT) {
        REASON_RATE_LIMIT
    } else if event.event_type == EventType::Blockchain {
        REASON_BLOCKCHAIN
    } else if event.severity == Severity::Critical {
        REASON_CRITICAL
    } else {
        REASON_OUTLIER
    }
}

// ============================================================================
// PURE DETECTION
// ============================================================================

/// Position of the cutoff in the ascending score list.
///
/// `floor(threshold * n)` clamped to the last index: with n = 10 and 0.9 the
/// cutoff is the single highest score.
pub fn cutoff_index(threshold: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let threshold = if threshold.is_finite() {
        threshold.clamp(0.0, 1.0)
    } else {
        DEFAULT_ANOMALY_THRESHOLD
    };
    ((threshold * n as f64).floor() as usize).min(n - 1)
}

/// Flag every event whose score is at or above the percentile cutoff
pub fn detect_anomalies(
    scorer: &RiskScorer,
    events: &[SecurityEvent],
    threshold: f64,
) -> AnomalyDetectionResult {
    let (first, last) = match (events.first(), events.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            let now = Utc::now();
            return AnomalyDetectionResult {
                window_start: now,
                window_end: now,
                total_events: 0,
                anomalies: vec![],
                anomaly_rate: 0.0,
            };
        }
    };

    let scores = scorer.score_all(events);
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let cutoff = sorted[cutoff_index(threshold, sorted.len())];

    let anomalies: Vec<AnomalyFinding> = events
        .iter()
        .zip(scores.iter())
        .filter(|(_, score)| **score >= cutoff)
        .map(|(event, score)| AnomalyFinding {
            event_id: event.id.clone(),
            reason: anomaly_reason(event).to_string(),
            score: *score,
        })
        .collect();

    AnomalyDetectionResult {
        window_start: first.timestamp,
        window_end: last.timestamp,
        total_events: events.len(),
        anomaly_rate: anomalies.len() as f64 / events.len() as f64,
        anomalies,
    }
}

// ============================================================================
// DETECTOR (with audit side-channel)
// ============================================================================

pub struct AnomalyDetector {
    scorer: RiskScorer,
    threshold: f64,
    audit: AuditStore,
}

impl AnomalyDetector {
    pub fn new(scorer: RiskScorer, threshold: f64, audit: AuditStore) -> Self {
        Self { scorer, threshold, audit }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Detect with the configured threshold
    pub fn detect(&self, events: &[SecurityEvent]) -> AnomalyDetectionResult {
        self.detect_with_threshold(events, self.threshold)
    }

    pub fn detect_with_threshold(&self, events: &[SecurityEvent], threshold: f64) -> AnomalyDetectionResult {
        let result = detect_anomalies(&self.scorer, events, threshold);

        let severity = if result.anomalies.is_empty() {
            Severity::Low
        } else {
            Severity::High
        };

        if !result.anomalies.is_empty() {
            tracing::info!(
                "Anomaly detection: {}/{} events flagged (rate {:.2})",
                result.anomaly_count(),
                result.total_events,
                result.anomaly_rate
            );
        }

        self.audit.log_event(
            AuditLogEntry::system("anomaly_detection", "security_pipeline")
                .with_severity(severity)
                .with_metadata(serde_json::json!({
                    "total_events": result.total_events,
                    "anomalies": result.anomaly_count(),
                    "threshold": threshold,
                })),
        );

        result
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::logic::audit::MemoryAuditBackend;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn low(id: &str) -> SecurityEvent {
        SecurityEvent::new(id, EventType::System, Severity::Low)
    }

    #[test]
    fn test_empty_batch() {
        let result = detect_anomalies(&RiskScorer::default(), &[], 0.9);
        assert_eq!(result.total_events, 0);
        assert!(result.anomalies.is_empty());
        assert_eq!(result.anomaly_rate, 0.0);
        assert_eq!(result.window_start, result.window_end);
    }

    #[test]
    fn test_rate_limit_outlier_flagged_alone() {
        let mut events: Vec<SecurityEvent> = (0..9).map(|i| low(&format!("low-{}", i))).collect();
        events.insert(
            4,
            SecurityEvent::new("rl-1", EventType::Api, Severity::High).with_action("rate_limit"),
        );

        let result = detect_anomalies(&RiskScorer::default(), &events, 0.9);
        assert_eq!(result.total_events, 10);
        assert_eq!(result.anomalies.len(), 1);
        assert_eq!(result.anomalies[0].event_id, "rl-1");
        assert_eq!(result.anomalies[0].reason, REASON_RATE_LIMIT);
        assert_eq!(result.anomalies[0].score, 4.5);
        assert!((result.anomaly_rate - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_batch_ties_at_cutoff() {
        // Every score equals the cutoff, so every event is at-or-above it
        let events: Vec<SecurityEvent> = (0..10).map(|i| low(&format!("e{}", i))).collect();
        let result = detect_anomalies(&RiskScorer::default(), &events, 0.9);
        assert_eq!(result.anomalies.len(), 10);
        assert_eq!(result.anomaly_rate, 1.0);
    }

    #[test]
    fn test_distinct_scores_top_decile() {
        // Ten events, one strictly highest score: only it reaches the 0.9 cutoff
        let severities = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];
        let mut events = Vec::new();
        for (i, sev) in severities.iter().enumerate() {
            events.push(SecurityEvent::new(&format!("sys-{}", i), EventType::System, *sev));
            events.push(SecurityEvent::new(&format!("chain-{}", i), EventType::Blockchain, *sev));
        }
        events.push(SecurityEvent::new("login", EventType::Auth, Severity::Low).with_action("failed_login"));
        events.push(SecurityEvent::new("top", EventType::Auth, Severity::Critical).with_action("failed_login"));

        let result = detect_anomalies(&RiskScorer::default(), &events, 0.9);
        assert_eq!(result.total_events, 10);
        assert_eq!(result.anomalies.len(), 1);
        assert_eq!(result.anomalies[0].event_id, "top");
        assert_eq!(result.anomalies[0].reason, REASON_FAILED_LOGIN);
    }

    #[test]
    fn test_threshold_zero_flags_everything() {
        let events = vec![
            low("a"),
            SecurityEvent::new("b", EventType::Defi, Severity::Critical),
        ];
        let result = detect_anomalies(&RiskScorer::default(), &events, 0.0);
        assert_eq!(result.anomalies.len(), 2);
    }

    #[test]
    fn test_window_from_first_and_last() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let events = vec![
            low("a").with_timestamp(t0),
            low("b").with_timestamp(t0 + Duration::minutes(5)),
            low("c").with_timestamp(t0 + Duration::minutes(2)),
        ];
        let result = detect_anomalies(&RiskScorer::default(), &events, 0.9);
        assert_eq!(result.window_start, t0);
        assert_eq!(result.window_end, t0 + Duration::minutes(2));
    }

    #[test]
    fn test_reason_priority() {
        let chain_critical = SecurityEvent::new("x", EventType::Blockchain, Severity::Critical);
        assert_eq!(anomaly_reason(&chain_critical), REASON_BLOCKCHAIN);

        let defi_critical = SecurityEvent::new("y", EventType::Defi, Severity::Critical);
        assert_eq!(anomaly_reason(&defi_critical), REASON_CRITICAL);

        let gov = SecurityEvent::new("z", EventType::Governance, Severity::High);
        assert_eq!(anomaly_reason(&gov), REASON_OUTLIER);
    }

    #[test]
    fn test_cutoff_index_clamped() {
        assert_eq!(cutoff_index(0.9, 10), 9);
        assert_eq!(cutoff_index(1.0, 10), 9);
        assert_eq!(cutoff_index(0.5, 4), 2);
        assert_eq!(cutoff_index(2.0, 3), 2);
        assert_eq!(cutoff_index(-1.0, 3), 0);
        assert_eq!(cutoff_index(f64::NAN, 10), 9);
        assert_eq!(cutoff_index(0.9, 1), 0);
    }

    #[tokio::test]
    async fn test_detector_writes_one_audit_entry() {
        let backend = Arc::new(MemoryAuditBackend::new());
        let (audit, _handle) = AuditStore::spawn(backend.clone(), None, AuditConfig::default());
        let detector = AnomalyDetector::new(RiskScorer::default(), 0.9, audit.clone());

        let result = detector.detect(&[
            low("a"),
            SecurityEvent::new("b", EventType::Auth, Severity::Critical).with_action("failed_login"),
        ]);
        detector.detect(&[]);
        audit.flush().await;

        assert_eq!(result.anomaly_count(), 1);
        let entries = backend.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "anomaly_detection");
        assert_eq!(entries[0].severity, Severity::High);
        assert_eq!(entries[0].metadata["anomalies"], 1);
        assert_eq!(entries[1].severity, Severity::Low);
    }
}
