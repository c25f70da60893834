use std::sync::Arc;

use chrono::Utc;

use super::*;
use crate::config::AuditConfig;
use crate::logic::anomaly::detector::REASON_RATE_LIMIT;
use crate::logic::audit::MemoryAuditBackend;
use crate::logic::mitigation::engine::ACTION_EMERGENCY_PAUSE;
use crate::logic::report::ComplianceStatus;
use crate::models::EventType;

fn pipeline() -> (SecurityPipeline, Arc<MemoryAuditBackend>) {
    let backend = Arc::new(MemoryAuditBackend::new());
    let (audit, _handle) = AuditStore::spawn(backend.clone(), None, AuditConfig::default());
    (SecurityPipeline::new(PipelineConfig::default(), audit), backend)
}

fn failed_logins(n: usize) -> Vec<SecurityEvent> {
    (0..n)
        .map(|i| {
            SecurityEvent::new(&format!("fl-{}", i), EventType::Auth, Severity::Critical)
                .with_action("failed_login")
                .with_user("u-1")
        })
        .collect()
}

#[tokio::test]
async fn test_empty_batch_analysis() {
    let (pipeline, _) = pipeline();
    let outcome = pipeline.analyze(&[]);

    assert_eq!(outcome.anomalies.total_events, 0);
    assert!(outcome.anomalies.anomalies.is_empty());
    assert_eq!(outcome.anomalies.anomaly_rate, 0.0);
    assert_eq!(outcome.threat.score, 0);
    assert_eq!(outcome.threat.level, Severity::Low);
    assert!(outcome.threat.contributors.is_empty());
}

#[tokio::test]
async fn test_failed_login_storm() {
    let (pipeline, backend) = pipeline();
    let events = failed_logins(60);
    let outcome = pipeline.analyze(&events);
    pipeline.audit().flush().await;

    assert_eq!(outcome.threat.level, Severity::Critical);
    assert_eq!(outcome.threat.score, 100);
    assert_eq!(outcome.recommendations.len(), 3);
    assert_eq!(outcome.recommendations[0].action, ACTION_EMERGENCY_PAUSE);
    assert_eq!(outcome.report.overall_status, ComplianceStatus::Fail);

    // One audit entry per stage
    let actions: Vec<String> = backend.entries().into_iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec!["anomaly_detection", "threat_scored", "mitigations_recommended"]
    );
}

#[tokio::test]
async fn test_rate_limit_among_quiet_events() {
    let (pipeline, _) = pipeline();
    let mut events: Vec<SecurityEvent> = (0..9)
        .map(|i| SecurityEvent::new(&format!("q-{}", i), EventType::System, Severity::Low))
        .collect();
    events.push(SecurityEvent::new("api-1", EventType::Api, Severity::High).with_action("rate_limit"));

    let result = pipeline.detect_anomalies_with_threshold(&events, 0.9);
    assert_eq!(result.anomalies.len(), 1);
    assert_eq!(result.anomalies[0].event_id, "api-1");
    assert_eq!(result.anomalies[0].reason, REASON_RATE_LIMIT);
}

#[tokio::test]
async fn test_score_threat_has_no_hidden_state() {
    let (pipeline, _) = pipeline();
    let events = vec![
        SecurityEvent::new("a", EventType::Defi, Severity::High),
        SecurityEvent::new("b", EventType::Governance, Severity::Medium),
    ];

    let first = pipeline.score_threat(&events);
    let second = pipeline.score_threat(&events);
    assert_eq!(first.score, second.score);
    assert_eq!(first.level, second.level);
    assert_eq!(first.contributors, second.contributors);
}

#[tokio::test]
async fn test_ingest_rejects_malformed_batch() {
    let (pipeline, backend) = pipeline();
    let good = RawSecurityEvent {
        id: Some("ok".to_string()),
        event_type: Some("api".to_string()),
        severity: Some("low".to_string()),
        timestamp: Some(Utc::now()),
        ..Default::default()
    };
    let bad = RawSecurityEvent {
        id: Some("bad".to_string()),
        event_type: Some("api".to_string()),
        severity: Some("low".to_string()),
        timestamp: None,
        ..Default::default()
    };

    assert_eq!(pipeline.ingest(vec![good.clone()]).unwrap().len(), 1);

    let err = pipeline.ingest(vec![good, bad]).unwrap_err();
    assert!(err.to_string().contains("'bad'"));

    pipeline.audit().flush().await;
    let entries = backend.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "event_rejected");
}

#[tokio::test]
async fn test_shutdown_persists_rejection_record() {
    let backend = Arc::new(MemoryAuditBackend::new());
    let (audit, writer) = AuditStore::spawn(backend.clone(), None, AuditConfig::default());
    let pipeline = SecurityPipeline::new(PipelineConfig::default(), audit);

    let missing_severity = RawSecurityEvent {
        id: Some("evt-9".to_string()),
        event_type: Some("auth".to_string()),
        timestamp: Some(Utc::now()),
        ..Default::default()
    };
    assert!(pipeline.ingest(vec![missing_severity]).is_err());

    // Returns only after the writer has drained the queue and exited
    let stats = pipeline.shutdown(writer).await;

    assert_eq!(stats.written, 1);
    let entries = backend.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "event_rejected");
    assert!(entries[0].metadata["error"].as_str().unwrap().contains("evt-9"));
}

#[tokio::test]
async fn test_metrics_snapshot_totals() {
    let (pipeline, _) = pipeline();
    pipeline.analyze(&failed_logins(60));
    pipeline.analyze(&[SecurityEvent::new("x", EventType::System, Severity::Low)]);

    let snap = pipeline.snapshot_metrics();
    assert_eq!(snap.events_processed, 61);
    // 60 identical events all sit at the cutoff, plus the lone event
    assert_eq!(snap.anomalies_detected, 61);
    assert_eq!(snap.recommendations_issued, 4);
    assert_eq!(snap.avg_threat_score, 60.0);
    assert_eq!(pipeline.metrics().latest(), Some(snap));
}

#[tokio::test]
async fn test_audit_outage_is_invisible_to_callers() {
    use crate::error::AuditError;
    use crate::logic::audit::{AuditBackend, AuditPage, AuditQuery};
    use async_trait::async_trait;
    use chrono::DateTime;

    struct DownBackend;

    #[async_trait]
    impl AuditBackend for DownBackend {
        async fn write(&self, _: &AuditLogEntry) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("database offline".to_string()))
        }
        async fn query(&self, _: &AuditQuery) -> Result<AuditPage, AuditError> {
            Err(AuditError::Unavailable("database offline".to_string()))
        }
        async fn anonymize_user(&self, _: &str) -> Result<u64, AuditError> {
            Err(AuditError::Unavailable("database offline".to_string()))
        }
        async fn purge_before(&self, _: DateTime<Utc>) -> Result<u64, AuditError> {
            Err(AuditError::Unavailable("database offline".to_string()))
        }
    }

    let (audit, _handle) = AuditStore::spawn(Arc::new(DownBackend), None, AuditConfig::default());
    let pipeline = SecurityPipeline::new(PipelineConfig::default(), audit);

    let outcome = pipeline.analyze(&failed_logins(3));
    pipeline.audit().flush().await;

    assert_eq!(outcome.threat.level, Severity::Critical);
    assert_eq!(pipeline.audit().stats().write_failures, 3);
}
