//! Threat Aggregator
//!
//! Reduces a batch to one 0-100 score and level.
//! Input: events. Output: ThreatScore.

use std::collections::BTreeSet;

use super::rules::{level_for_score, MAX_SCORE, SCORE_MULTIPLIER, VOLUME_BONUS, VOLUME_THRESHOLD};
use super::types::ThreatScore;
use crate::logic::audit::AuditStore;
use crate::logic::risk::RiskScorer;
use crate::models::{AuditLogEntry, EventType, SecurityEvent, Severity};

// ============================================================================
// PURE AGGREGATION
// ============================================================================

pub fn score_threat(scorer: &RiskScorer, events: &[SecurityEvent]) -> ThreatScore {
    let base = if events.is_empty() {
        0.0
    } else {
        events.iter().map(|e| scorer.score(e)).sum::<f64>() / events.len() as f64
    };

    let volume_bonus = if events.len() > VOLUME_THRESHOLD { VOLUME_BONUS } else { 0.0 };
    let raw = (base * SCORE_MULTIPLIER + volume_bonus).min(MAX_SCORE).round();
    let score = raw.clamp(0.0, MAX_SCORE) as u8;
    let level = level_for_score(score);

    let contributors: BTreeSet<EventType> = events.iter().map(|e| e.event_type).collect();

    ThreatScore {
        score,
        level,
        narrative: narrative(score, level, &contributors),
        contributors,
    }
}

fn narrative(score: u8, level: Severity, contributors: &BTreeSet<EventType>) -> String {
    let names = if contributors.is_empty() {
        "none".to_string()
    } else {
        contributors
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Threat score is {}/100 ({}). Notable contributors: {}.",
        score, level, names
    )
}

// ============================================================================
// AGGREGATOR (with audit side-channel)
// ============================================================================

pub struct ThreatAggregator {
    scorer: RiskScorer,
    audit: AuditStore,
}

impl ThreatAggregator {
    pub fn new(scorer: RiskScorer, audit: AuditStore) -> Self {
        Self { scorer, audit }
    }

    pub fn score(&self, events: &[SecurityEvent]) -> ThreatScore {
        let threat = score_threat(&self.scorer, events);

        if threat.level.is_high() {
            tracing::warn!("{}", threat.narrative);
        } else {
            tracing::debug!("{}", threat.narrative);
        }

        let severity = if threat.is_critical() {
            Severity::Critical
        } else {
            Severity::Medium
        };

        self.audit.log_event(
            AuditLogEntry::system("threat_scored", "security_pipeline")
                .with_severity(severity)
                .with_metadata(serde_json::json!({
                    "score": threat.score,
                    "level": threat.level,
                    "contributors": threat.contributors,
                    "events": events.len(),
                })),
        );

        threat
    }
}

// ============================================================================
// TESTS
// ============================================================================
