//! Event Risk Scorer
//!
//! Pure mapping from one event to its risk contribution.
//! No clock, no randomness, no shared state.

use super::rules::{
    SeverityWeights, ACTION_FAILED_LOGIN, ACTION_RATE_LIMIT, BLOCKCHAIN_BONUS,
    FAILED_LOGIN_BONUS, RATE_LIMIT_BONUS,
};
use crate::models::{EventType, SecurityEvent};

/// Risk scorer with an injected weight table
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: SeverityWeights,
}

impl RiskScorer {
    pub fn new(weights: SeverityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &SeverityWeights {
        &self.weights
    }

    /// Base severity weight plus additive context modifiers
    pub fn score(&self, event: &SecurityEvent) -> f64 {
        let mut score = self.weights.weight(event.severity);

        match event.event_type {
            EventType::Auth if event.has_action(ACTION_FAILED_LOGIN) => score += FAILED_LOGIN_BONUS,
            EventType::Api if event.has_action(ACTION_RATE_LIMIT) => score += RATE_LIMIT_BONUS,
            EventType::Blockchain => score += BLOCKCHAIN_BONUS,
            _ => {}
        }

        score
    }

    /// Scores for a batch, in input order
    pub fn score_all(&self, events: &[SecurityEvent]) -> Vec<f64> {
        events.iter().map(|e| self.score(e)).collect()
    }
}

/// Score with the default weight table
pub fn event_risk_score(event: &SecurityEvent) -> f64 {
    RiskScorer::default().score(event)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn event(event_type: EventType, severity: Severity, action: Option<&str>) -> SecurityEvent {
        let e = SecurityEvent::new("e", event_type, severity);
        match action {
            Some(a) => e.with_action(a),
            None => e,
        }
    }

    #[test]
    fn test_base_weights() {
        assert_eq!(event_risk_score(&event(EventType::System, Severity::Low, None)), 1.0);
        assert_eq!(event_risk_score(&event(EventType::System, Severity::Medium, None)), 2.0);
        assert_eq!(event_risk_score(&event(EventType::System, Severity::High, None)), 3.0);
        assert_eq!(event_risk_score(&event(EventType::System, Severity::Critical, None)), 5.0);
    }

    #[test]
    fn test_context_modifiers() {
        let failed_login = event(EventType::Auth, Severity::Critical, Some("failed_login"));
        assert_eq!(event_risk_score(&failed_login), 7.0);

        let rate_limit = event(EventType::Api, Severity::High, Some("rate_limit"));
        assert_eq!(event_risk_score(&rate_limit), 4.5);

        let chain = event(EventType::Blockchain, Severity::Low, Some("transfer"));
        assert!((event_risk_score(&chain) - 2.2).abs() < 1e-9);
    }

    #[test]
    fn test_modifier_requires_matching_type() {
        // failed_login only counts for auth events
        let api_login = event(EventType::Api, Severity::Low, Some("failed_login"));
        assert_eq!(event_risk_score(&api_login), 1.0);

        let auth_rate = event(EventType::Auth, Severity::Low, Some("rate_limit"));
        assert_eq!(event_risk_score(&auth_rate), 1.0);
    }

    #[test]
    fn test_monotonic_in_severity() {
        let cases = [
            (EventType::Auth, Some("failed_login")),
            (EventType::Api, Some("rate_limit")),
            (EventType::Blockchain, None),
            (EventType::Defi, None),
            (EventType::Governance, Some("vote")),
        ];

        for (event_type, action) in cases {
            let scores: Vec<f64> = Severity::ALL
                .iter()
                .map(|s| event_risk_score(&event(event_type, *s, action)))
                .collect();
            assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}: {:?}", event_type, scores);
        }
    }

    #[test]
    fn test_custom_weights() {
        let scorer = RiskScorer::new(SeverityWeights {
            critical: 10.0,
            ..Default::default()
        });
        assert_eq!(scorer.score(&event(EventType::System, Severity::Critical, None)), 10.0);
    }

    #[test]
    fn test_deterministic() {
        let e = event(EventType::Blockchain, Severity::High, None);
        assert_eq!(event_risk_score(&e), event_risk_score(&e));
    }
}
