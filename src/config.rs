//! Configuration module

use std::env;

use crate::logic::risk::SeverityWeights;

/// Default anomaly percentile threshold
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.9;

/// Default audit retention (days)
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

/// Upper bound for `AUDIT_RETENTION_DAYS` (100 years)
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Actions forwarded to the SIEM when no allowlist is configured
pub const DEFAULT_SENSITIVE_ACTIONS: &[&str] = &[
    "failed_login",
    "privilege_escalation",
    "role_change",
    "api_key_created",
    "user_deleted",
    "emergency_pause",
];

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL URL for the audit log (in-memory store when unset)
    pub database_url: Option<String>,

    /// SIEM collector endpoint (forwarding disabled when unset)
    pub siem_url: Option<String>,

    /// SIEM request timeout in seconds
    pub siem_timeout_secs: u64,

    /// Audit actions that are also forwarded to the SIEM
    pub sensitive_actions: Vec<String>,

    /// Audit retention in days
    pub audit_retention_days: i64,

    /// Capacity of the audit write queue
    pub audit_queue_capacity: usize,

    /// Percentile threshold for anomaly detection (0.0 - 1.0)
    pub anomaly_threshold: f64,

    /// Severity -> base risk weight
    pub severity_weights: SeverityWeights,

    /// Number of metrics snapshots kept in memory
    pub metrics_capacity: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            siem_url: None,
            siem_timeout_secs: 5,
            sensitive_actions: DEFAULT_SENSITIVE_ACTIONS.iter().map(|s| s.to_string()).collect(),
            audit_retention_days: DEFAULT_RETENTION_DAYS,
            audit_queue_capacity: 1024,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            severity_weights: SeverityWeights::default(),
            metrics_capacity: 1000,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let anomaly_threshold = parse_or(&lookup, "ANOMALY_THRESHOLD", defaults.anomaly_threshold);
        let anomaly_threshold = if (0.0..=1.0).contains(&anomaly_threshold) {
            anomaly_threshold
        } else {
            tracing::warn!(
                "ANOMALY_THRESHOLD {} outside [0, 1], using {}",
                anomaly_threshold,
                DEFAULT_ANOMALY_THRESHOLD
            );
            DEFAULT_ANOMALY_THRESHOLD
        };

        let audit_retention_days =
            parse_or(&lookup, "AUDIT_RETENTION_DAYS", defaults.audit_retention_days);
        let audit_retention_days = if (1..=MAX_RETENTION_DAYS).contains(&audit_retention_days) {
            audit_retention_days
        } else {
            tracing::warn!(
                "AUDIT_RETENTION_DAYS {} outside [1, {}], using {}",
                audit_retention_days,
                MAX_RETENTION_DAYS,
                DEFAULT_RETENTION_DAYS
            );
            DEFAULT_RETENTION_DAYS
        };

        let severity_weights = match lookup("SEVERITY_WEIGHTS") {
            Some(raw) => SeverityWeights::parse(&raw).unwrap_or_else(|e| {
                tracing::warn!("Invalid SEVERITY_WEIGHTS ({}), using defaults", e);
                SeverityWeights::default()
            }),
            None => defaults.severity_weights,
        };

        let sensitive_actions = lookup("SENSITIVE_AUDIT_ACTIONS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.sensitive_actions);

        Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            siem_url: lookup("SIEM_URL").filter(|s| !s.is_empty()),
            siem_timeout_secs: parse_or(&lookup, "SIEM_TIMEOUT_SECS", defaults.siem_timeout_secs),
            sensitive_actions,
            audit_retention_days,
            audit_queue_capacity: parse_or(&lookup, "AUDIT_QUEUE_CAPACITY", defaults.audit_queue_capacity).max(1),
            anomaly_threshold,
            severity_weights,
            metrics_capacity: parse_or(&lookup, "METRICS_CAPACITY", defaults.metrics_capacity).max(1),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Scoring configuration for one pipeline instance
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            anomaly_threshold: self.anomaly_threshold,
            severity_weights: self.severity_weights.clone(),
            metrics_capacity: self.metrics_capacity,
        }
    }

    /// Audit store configuration
    pub fn audit(&self) -> AuditConfig {
        AuditConfig {
            sensitive_actions: self.sensitive_actions.clone(),
            retention_days: self.audit_retention_days,
            queue_capacity: self.audit_queue_capacity,
        }
    }
}

/// Per-tenant scoring configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub anomaly_threshold: f64,
    pub severity_weights: SeverityWeights,
    pub metrics_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Config::default().pipeline()
    }
}

/// Audit store configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub sensitive_actions: Vec<String>,
    pub retention_days: i64,
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Config::default().audit()
    }
}

impl AuditConfig {
    pub fn is_sensitive(&self, action: &str) -> bool {
        self.sensitive_actions.iter().any(|a| a == action)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}='{}', using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
