//! Security event model
//!
//! Immutable, timestamped facts about user/system activity. Raw telemetry is
//! validated into a `SecurityEvent` at the ingestion boundary; nothing
//! downstream ever sees a partially-filled event.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::severity::Severity;
use crate::error::PipelineError;

// ============================================================================
// EVENT TYPE
// ============================================================================

/// Category of the telemetry source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Auth,
    Api,
    Blockchain,
    Defi,
    System,
    Governance,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Auth => "auth",
            EventType::Api => "api",
            EventType::Blockchain => "blockchain",
            EventType::Defi => "defi",
            EventType::System => "system",
            EventType::Governance => "governance",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(EventType::Auth),
            "api" => Ok(EventType::Api),
            "blockchain" => Ok(EventType::Blockchain),
            "defi" => Ok(EventType::Defi),
            "system" => Ok(EventType::System),
            "governance" => Ok(EventType::Governance),
            other => Err(format!("unknown event type '{}'", other)),
        }
    }
}

// ============================================================================
// SECURITY EVENT
// ============================================================================

/// Immutable security event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SecurityEvent {
    /// Create an event stamped with the current time
    pub fn new(id: &str, event_type: EventType, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            event_type,
            user_id: None,
            ip: None,
            user_agent: None,
            resource: None,
            action: None,
            severity,
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    // Builder pattern methods
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip = Some(ip.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// True when the event's action equals `action`
    pub fn has_action(&self, action: &str) -> bool {
        self.action.as_deref() == Some(action)
    }
}

// ============================================================================
// RAW EVENT (ingestion boundary)
// ============================================================================

/// Untrusted telemetry as received from a producer
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RawSecurityEvent {
    #[validate(length(min = 1, max = 128))]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(max = 64))]
    pub ip: Option<String>,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    #[validate(length(max = 256))]
    pub resource: Option<String>,
    #[validate(length(max = 128))]
    pub action: Option<String>,
    pub severity: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TryFrom<RawSecurityEvent> for SecurityEvent {
    type Error = PipelineError;

    fn try_from(raw: RawSecurityEvent) -> Result<Self, Self::Error> {
        raw.validate()
            .map_err(|e| PipelineError::validation(raw.id.as_deref(), e.to_string()))?;

        let id = raw
            .id
            .ok_or_else(|| PipelineError::validation(None, "missing id"))?;

        let event_type = raw
            .event_type
            .as_deref()
            .ok_or_else(|| PipelineError::validation(Some(&id), "missing type"))?
            .parse::<EventType>()
            .map_err(|e| PipelineError::validation(Some(&id), e))?;

        let severity = raw
            .severity
            .as_deref()
            .ok_or_else(|| PipelineError::validation(Some(&id), "missing severity"))?
            .parse::<Severity>()
            .map_err(|e| PipelineError::validation(Some(&id), e))?;

        let timestamp = raw
            .timestamp
            .ok_or_else(|| PipelineError::validation(Some(&id), "missing timestamp"))?;

        Ok(SecurityEvent {
            id,
            event_type,
            user_id: raw.user_id,
            ip: raw.ip,
            user_agent: raw.user_agent,
            resource: raw.resource,
            action: raw.action,
            severity,
            timestamp,
            metadata: raw.metadata,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_ok() -> RawSecurityEvent {
        RawSecurityEvent {
            id: Some("evt-1".to_string()),
            event_type: Some("auth".to_string()),
            action: Some("failed_login".to_string()),
            severity: Some("high".to_string()),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    #[test]
    fn test_event_builder() {
        let event = SecurityEvent::new("e1", EventType::Api, Severity::Medium)
            .with_action("rate_limit")
            .with_user("u-42")
            .with_ip("10.0.0.1");

        assert!(event.has_action("rate_limit"));
        assert!(!event.has_action("failed_login"));
        assert_eq!(event.user_id.as_deref(), Some("u-42"));
    }

    #[test]
    fn test_raw_event_accepted() {
        let event = SecurityEvent::try_from(raw_ok()).unwrap();
        assert_eq!(event.event_type, EventType::Auth);
        assert_eq!(event.severity, Severity::High);
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let raw = RawSecurityEvent { timestamp: None, ..raw_ok() };
        let err = SecurityEvent::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("missing timestamp"));
    }

    #[test]
    fn test_missing_severity_rejected() {
        let raw = RawSecurityEvent { severity: None, ..raw_ok() };
        let err = SecurityEvent::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("missing severity"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = RawSecurityEvent { event_type: Some("quantum".to_string()), ..raw_ok() };
        assert!(SecurityEvent::try_from(raw).is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let raw = RawSecurityEvent { id: Some(String::new()), ..raw_ok() };
        assert!(SecurityEvent::try_from(raw).is_err());
    }

    #[test]
    fn test_raw_event_from_json() {
        let json = r#"{
            "id": "evt-9",
            "type": "blockchain",
            "severity": "critical",
            "timestamp": "2024-05-01T12:00:00Z",
            "metadata": {"chain": "eth"}
        }"#;
        let raw: RawSecurityEvent = serde_json::from_str(json).unwrap();
        let event = SecurityEvent::try_from(raw).unwrap();
        assert_eq!(event.event_type, EventType::Blockchain);
        assert_eq!(event.metadata.get("chain"), Some(&serde_json::json!("eth")));
    }
}
