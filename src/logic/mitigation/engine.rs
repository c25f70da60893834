//! Mitigation Engine
//!
//! Deterministic rule table keyed by threat level. Every call produces a
//! fresh list with fresh ids.

use uuid::Uuid;

use super::types::{MitigationRecommendation, MitigationRule};
use crate::logic::audit::AuditStore;
use crate::logic::threat::ThreatScore;
use crate::models::{AuditLogEntry, Rating, Severity};

// ============================================================================
// RULE TABLE
// ============================================================================

pub const ACTION_EMERGENCY_PAUSE: &str = "Enable emergency pause";
pub const ACTION_ROTATE_CREDENTIALS: &str = "Rotate credentials and invalidate sessions";
pub const ACTION_RAISE_LOGGING: &str = "Increase logging level and add rate limits";
pub const ACTION_REQUIRE_MFA: &str = "Require MFA for privileged actions";
pub const ACTION_ONCALL_ALERTS: &str = "Add anomaly alerts to on-call";
pub const ACTION_SECURITY_REVIEW: &str = "Schedule periodic security review";

static ELEVATED_RULES: [MitigationRule; 3] = [
    MitigationRule {
        action: ACTION_EMERGENCY_PAUSE,
        impact: Rating::High,
        effort: Rating::Low,
        rationale: "Halts sensitive operations while the active threat is contained.",
    },
    MitigationRule {
        action: ACTION_ROTATE_CREDENTIALS,
        impact: Rating::High,
        effort: Rating::Medium,
        rationale: "Revokes any credentials or sessions that may already be compromised.",
    },
    MitigationRule {
        action: ACTION_RAISE_LOGGING,
        impact: Rating::Medium,
        effort: Rating::Low,
        rationale: "Improves forensic visibility and slows automated abuse.",
    },
];

static MEDIUM_RULES: [MitigationRule; 2] = [
    MitigationRule {
        action: ACTION_REQUIRE_MFA,
        impact: Rating::High,
        effort: Rating::Medium,
        rationale: "Blocks account takeover from credential reuse on privileged paths.",
    },
    MitigationRule {
        action: ACTION_ONCALL_ALERTS,
        impact: Rating::Medium,
        effort: Rating::Low,
        rationale: "Gets a human on the signal before it escalates.",
    },
];

static LOW_RULES: [MitigationRule; 1] = [MitigationRule {
    action: ACTION_SECURITY_REVIEW,
    impact: Rating::Low,
    effort: Rating::Low,
    rationale: "No active threat; keep controls current with a regular review.",
}];

/// Rules for a level, in recommendation order
pub fn rules_for_level(level: Severity) -> &'static [MitigationRule] {
    match level {
        Severity::Critical | Severity::High => &ELEVATED_RULES,
        Severity::Medium => &MEDIUM_RULES,
        Severity::Low => &LOW_RULES,
    }
}

/// Fresh recommendations for a threat score
pub fn recommend_mitigations(score: &ThreatScore) -> Vec<MitigationRecommendation> {
    rules_for_level(score.level)
        .iter()
        .map(|rule| MitigationRecommendation {
            id: format!("mit_{}", Uuid::new_v4().simple()),
            action: rule.action.to_string(),
            impact: rule.impact,
            effort: rule.effort,
            rationale: rule.rationale.to_string(),
        })
        .collect()
}

// ============================================================================
// ENGINE (with audit side-channel)
// ============================================================================

pub struct MitigationEngine {
    audit: AuditStore,
}

impl MitigationEngine {
    pub fn new(audit: AuditStore) -> Self {
        Self { audit }
    }

    pub fn recommend(&self, score: &ThreatScore) -> Vec<MitigationRecommendation> {
        let recommendations = recommend_mitigations(score);

        self.audit.log_event(
            AuditLogEntry::system("mitigations_recommended", "security_pipeline")
                .with_severity(Severity::Low)
                .with_metadata(serde_json::json!({
                    "level": score.level,
                    "count": recommendations.len(),
                })),
        );

        recommendations
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
    use std::collections::{BTreeSet, HashSet};
    use std::sync::Arc;

    fn threat(level: Severity) -> ThreatScore {
        ThreatScore {
            score: 0,
            level,
            contributors: BTreeSet::new(),
            narrative: String::new(),
        }
    }

    #[test]
    fn test_critical_recommendations() {
        let recs = recommend_mitigations(&threat(Severity::Critical));
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].action, ACTION_EMERGENCY_PAUSE);
        assert_eq!((recs[0].impact, recs[0].effort), (Rating::High, Rating::Low));
        assert_eq!(recs[1].action, ACTION_ROTATE_CREDENTIALS);
        assert_eq!((recs[1].impact, recs[1].effort), (Rating::High, Rating::Medium));
        assert_eq!(recs[2].action, ACTION_RAISE_LOGGING);
        assert_eq!((recs[2].impact, recs[2].effort), (Rating::Medium, Rating::Low));
    }

    #[test]
    fn test_high_matches_critical_table() {
        let high: Vec<String> = recommend_mitigations(&threat(Severity::High))
            .into_iter()
            .map(|r| r.action)
            .collect();
        let critical: Vec<String> = recommend_mitigations(&threat(Severity::Critical))
            .into_iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(high, critical);
    }

    #[test]
    fn test_medium_and_low() {
        let medium = recommend_mitigations(&threat(Severity::Medium));
        assert_eq!(medium.len(), 2);
        assert_eq!(medium[0].action, ACTION_REQUIRE_MFA);
        assert_eq!(medium[1].action, ACTION_ONCALL_ALERTS);

        let low = recommend_mitigations(&threat(Severity::Low));
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].action, ACTION_SECURITY_REVIEW);
        assert_eq!((low[0].impact, low[0].effort), (Rating::Low, Rating::Low));
    }

    #[test]
    fn test_ids_unique_in_tight_loop() {
        let mut ids = HashSet::new();
        for _ in 0..500 {
            for rec in recommend_mitigations(&threat(Severity::Critical)) {
                assert!(ids.insert(rec.id));
            }
        }
        assert_eq!(ids.len(), 1500);
    }

    #[tokio::test]
    async fn test_engine_audits_level_and_count() {
        let backend = Arc::new(MemoryAuditBackend::new());
        let (audit, _handle) = AuditStore::spawn(backend.clone(), None, AuditConfig::default());
        let engine = MitigationEngine::new(audit.clone());

        engine.recommend(&threat(Severity::Medium));
        audit.flush().await;

        let entries = backend.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Low);
        assert_eq!(entries[0].metadata["level"], "medium");
        assert_eq!(entries[0].metadata["count"], 2);
    }
}
