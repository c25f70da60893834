//! Risk Scoring Rules & Weights
//!
//! Constants and the overridable severity weight table.
//! No scoring logic here.

use serde::{Deserialize, Serialize};

use crate::models::Severity;

// ============================================================================
// BASE WEIGHTS (by severity)
// ============================================================================

pub const LOW_WEIGHT: f64 = 1.0;
pub const MEDIUM_WEIGHT: f64 = 2.0;
pub const HIGH_WEIGHT: f64 = 3.0;
pub const CRITICAL_WEIGHT: f64 = 5.0;

// ============================================================================
// CONTEXT MODIFIERS (additive)
// ============================================================================

/// auth + failed_login
pub const FAILED_LOGIN_BONUS: f64 = 2.0;

/// api + rate_limit
pub const RATE_LIMIT_BONUS: f64 = 1.5;

/// Any blockchain event
pub const BLOCKCHAIN_BONUS: f64 = 1.2;

pub const ACTION_FAILED_LOGIN: &str = "failed_login";
pub const ACTION_RATE_LIMIT: &str = "rate_limit";

// ============================================================================
// CONFIGURABLE WEIGHTS
// ============================================================================

/// Severity -> base weight table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            low: LOW_WEIGHT,
            medium: MEDIUM_WEIGHT,
            high: HIGH_WEIGHT,
            critical: CRITICAL_WEIGHT,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    /// Parse `low=1,medium=2,high=3,critical=5`; omitted keys keep their default.
    ///
    /// Weights must be finite, non-negative and non-decreasing with severity,
    /// otherwise a more severe event could score lower than a milder one.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut weights = Self::default();

        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            let severity = key.parse::<Severity>()?;
            let value = value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid weight '{}' for {}", value.trim(), severity))?;
            if !value.is_finite() || value < 0.0 {
                return Err(format!("weight for {} must be a non-negative number", severity));
            }

            match severity {
                Severity::Low => weights.low = value,
                Severity::Medium => weights.medium = value,
                Severity::High => weights.high = value,
                Severity::Critical => weights.critical = value,
            }
        }

        let ordered = [weights.low, weights.medium, weights.high, weights.critical];
        if ordered.windows(2).any(|w| w[0] > w[1]) {
            return Err("weights must not decrease with severity".to_string());
        }

        Ok(weights)
    }
}
