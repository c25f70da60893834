//! Audit log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::severity::Severity;
use crate::error::AuditError;

/// User id recorded for entries produced by the pipeline itself
pub const SYSTEM_USER: &str = "system";

/// Replacement user id for entries of a deleted user
pub const ANONYMIZED_USER: &str = "anonymized";

/// One append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub user_id: String,
    pub action: String,
    pub resource: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: serde_json::Value,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}

impl AuditLogEntry {
    pub fn new(user_id: &str, action: &str, resource: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            ip: None,
            user_agent: None,
            metadata: serde_json::Value::Object(Default::default()),
            severity: Severity::Low,
            timestamp: Utc::now(),
            session_id: String::new(),
        }
    }

    /// Entry attributed to the pipeline rather than a user
    pub fn system(action: &str, resource: &str) -> Self {
        Self::new(SYSTEM_USER, action, resource)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_anonymized(&self) -> bool {
        self.user_id == ANONYMIZED_USER
    }
}

// ============================================================================
// DATABASE ROW
// ============================================================================

/// `audit_log` row as stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub user_id: String,
    pub action: String,
    pub resource: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
    pub severity: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = AuditError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let severity = row
            .severity
            .parse::<Severity>()
            .map_err(AuditError::InvalidRecord)?;

        Ok(AuditLogEntry {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            resource: row.resource,
            ip: row.ip_address,
            user_agent: row.user_agent,
            metadata: row.details,
            severity,
            timestamp: row.created_at,
            session_id: row.session_id,
        })
    }
}
