//! Error handling
//!
//! Callers of the scoring pipeline only ever see `PipelineError`. Audit
//! failures stay inside the audit path and are counted, never propagated.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed inbound event, rejected at ingestion
    #[error("invalid security event{}: {message}", quoted_id(.event_id))]
    Validation {
        event_id: Option<String>,
        message: String,
    },
}

impl PipelineError {
    pub fn validation(event_id: Option<&str>, message: impl Into<String>) -> Self {
        PipelineError::Validation {
            event_id: event_id.map(str::to_string),
            message: message.into(),
        }
    }
}

fn quoted_id(event_id: &Option<String>) -> String {
    event_id
        .as_deref()
        .map(|id| format!(" '{}'", id))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("SIEM forward failed: {0}")]
    Forward(#[from] reqwest::Error),

    #[error("invalid audit record: {0}")]
    InvalidRecord(String),

    #[error("audit backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid retention period: {0} days")]
    InvalidRetention(i64),
}
