//! Security Pipeline
//!
//! One explicitly constructed pipeline per tenant. Wires the scorer,
//! detector, aggregator and mitigation engine to a shared audit handle and
//! keeps running totals for the metrics tracker.
//!
//! ```text
//! raw events ─► ingest ─► detect_anomalies ─► score_threat ─► recommend_mitigations
//!                  │              │                 │                  │
//!                  └──────────────┴──── AuditStore ─┴──────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::task::JoinHandle;

use super::anomaly::{AnomalyDetectionResult, AnomalyDetector};
use super::audit::{AuditStats, AuditStore};
use super::metrics::MetricsTracker;
use super::mitigation::{MitigationEngine, MitigationRecommendation};
use super::report::SecurityReport;
use super::risk::RiskScorer;
use super::threat::{ThreatAggregator, ThreatScore};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::models::{AuditLogEntry, RawSecurityEvent, SecurityAIMetrics, SecurityEvent, Severity};

#[cfg(test)]
mod tests;

#[derive(Default)]
struct PipelineCounters {
    events_processed: AtomicU64,
    anomalies_detected: AtomicU64,
    recommendations_issued: AtomicU64,
    threat_runs: AtomicU64,
    threat_score_total: AtomicU64,
}

/// Everything one `analyze` call produces
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub anomalies: AnomalyDetectionResult,
    pub threat: ThreatScore,
    pub recommendations: Vec<MitigationRecommendation>,
    pub report: SecurityReport,
}

pub struct SecurityPipeline {
    detector: AnomalyDetector,
    aggregator: ThreatAggregator,
    mitigations: MitigationEngine,
    metrics: MetricsTracker,
    audit: AuditStore,
    counters: PipelineCounters,
}

impl SecurityPipeline {
    pub fn new(config: PipelineConfig, audit: AuditStore) -> Self {
        let scorer = RiskScorer::new(config.severity_weights.clone());

        Self {
            detector: AnomalyDetector::new(scorer.clone(), config.anomaly_threshold, audit.clone()),
            aggregator: ThreatAggregator::new(scorer, audit.clone()),
            mitigations: MitigationEngine::new(audit.clone()),
            metrics: MetricsTracker::new(config.metrics_capacity),
            audit,
            counters: PipelineCounters::default(),
        }
    }

    pub fn audit(&self) -> &AuditStore {
        &self.audit
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    /// Validate a raw batch. All-or-nothing: the first malformed event
    /// rejects the batch.
    pub fn ingest(&self, raw: Vec<RawSecurityEvent>) -> PipelineResult<Vec<SecurityEvent>> {
        raw.into_iter()
            .map(SecurityEvent::try_from)
            .collect::<PipelineResult<Vec<_>>>()
            .map_err(|e| {
                tracing::warn!("Rejected inbound batch: {}", e);
                self.audit.log_event(
                    AuditLogEntry::system("event_rejected", "ingestion")
                        .with_severity(Severity::Medium)
                        .with_metadata(serde_json::json!({ "error": e.to_string() })),
                );
                e
            })
    }

    pub fn detect_anomalies(&self, events: &[SecurityEvent]) -> AnomalyDetectionResult {
        self.record_detection(self.detector.detect(events))
    }

    pub fn detect_anomalies_with_threshold(
        &self,
        events: &[SecurityEvent],
        threshold: f64,
    ) -> AnomalyDetectionResult {
        self.record_detection(self.detector.detect_with_threshold(events, threshold))
    }

    fn record_detection(&self, result: AnomalyDetectionResult) -> AnomalyDetectionResult {
        self.counters
            .events_processed
            .fetch_add(result.total_events as u64, Ordering::Relaxed);
        self.counters
            .anomalies_detected
            .fetch_add(result.anomaly_count() as u64, Ordering::Relaxed);
        result
    }

    pub fn score_threat(&self, events: &[SecurityEvent]) -> ThreatScore {
        let threat = self.aggregator.score(events);
        self.counters.threat_runs.fetch_add(1, Ordering::Relaxed);
        self.counters
            .threat_score_total
            .fetch_add(u64::from(threat.score), Ordering::Relaxed);
        threat
    }

    pub fn recommend_mitigations(&self, score: &ThreatScore) -> Vec<MitigationRecommendation> {
        let recommendations = self.mitigations.recommend(score);
        self.counters
            .recommendations_issued
            .fetch_add(recommendations.len() as u64, Ordering::Relaxed);
        recommendations
    }

    /// Full flow over one batch
    pub fn analyze(&self, events: &[SecurityEvent]) -> PipelineOutcome {
        let anomalies = self.detect_anomalies(events);
        let threat = self.score_threat(events);
        let recommendations = self.recommend_mitigations(&threat);
        let report = SecurityReport::build(events, &anomalies, &threat, &recommendations);

        PipelineOutcome {
            anomalies,
            threat,
            recommendations,
            report,
        }
    }

    /// Record the running totals as a metrics snapshot
    pub fn snapshot_metrics(&self) -> SecurityAIMetrics {
        let c = &self.counters;
        let runs = c.threat_runs.load(Ordering::Relaxed);
        let avg_threat = if runs == 0 {
            0.0
        } else {
            c.threat_score_total.load(Ordering::Relaxed) as f64 / runs as f64
        };

        self.metrics.track_metrics(
            c.events_processed.load(Ordering::Relaxed),
            c.anomalies_detected.load(Ordering::Relaxed),
            avg_threat,
            c.recommendations_issued.load(Ordering::Relaxed),
        )
    }

    /// Drain the audit queue, then wait for the writer task to exit.
    ///
    /// The writer only stops once every `AuditStore` clone is gone, so the
    /// caller must not hold one of its own.
    pub async fn shutdown(self, writer: JoinHandle<()>) -> AuditStats {
        self.audit.flush().await;
        let stats = self.audit.stats();
        drop(self);

        if let Err(e) = writer.await {
            tracing::warn!("Audit writer task failed: {}", e);
        }
        stats
    }
}
