//! SIEM Forwarder
//!
//! Best-effort delivery of sensitive audit entries to an external
//! log-aggregation collector.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AuditError;
use crate::models::AuditLogEntry;

#[async_trait]
pub trait SiemForwarder: Send + Sync {
    async fn send(&self, entry: &AuditLogEntry) -> Result<(), AuditError>;
}

/// Posts each entry as JSON to a collector URL
pub struct HttpSiemForwarder {
    client: reqwest::Client,
    url: String,
}

impl HttpSiemForwarder {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, AuditError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SiemForwarder for HttpSiemForwarder {
    async fn send(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let body = serde_json::json!({
            "source": "shield-pipeline",
            "event": entry,
        });

        self.client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!("Forwarded audit entry {} ({}) to SIEM", entry.id, entry.action);
        Ok(())
    }
}
