//! Audit Store
//!
//! Callers enqueue entries without waiting; one writer task drains the queue
//! into the backend and forwards sensitive actions to the SIEM. A slow or
//! failing backend never blocks or fails the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::backend::{AuditBackend, AuditPage, AuditQuery};
use super::forwarder::SiemForwarder;
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::models::AuditLogEntry;

// ============================================================================
// CONSTANTS
// ============================================================================

/// First attempt + one retry
const MAX_ATTEMPTS: u32 = 2;

// ============================================================================
// COMMANDS & COUNTERS
// ============================================================================

enum AuditCommand {
    Write(Box<AuditLogEntry>),
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct AuditCounters {
    enqueued: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    write_failures: AtomicU64,
    forwarded: AtomicU64,
    forward_failures: AtomicU64,
}

/// Audit path counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub enqueued: u64,
    pub written: u64,
    pub dropped: u64,
    pub write_failures: u64,
    pub forwarded: u64,
    pub forward_failures: u64,
}

// ============================================================================
// AUDIT STORE (handle)
// ============================================================================

/// Cloneable handle to the audit queue and backend
#[derive(Clone)]
pub struct AuditStore {
    tx: mpsc::Sender<AuditCommand>,
    backend: Arc<dyn AuditBackend>,
    counters: Arc<AuditCounters>,
    session_id: Arc<str>,
    retention_days: i64,
}

impl AuditStore {
    /// Start the writer task. Must be called inside a Tokio runtime.
    ///
    /// The writer stops once every handle has been dropped and the queue is
    /// drained.
    pub fn spawn(
        backend: Arc<dyn AuditBackend>,
        forwarder: Option<Arc<dyn SiemForwarder>>,
        config: AuditConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(AuditCounters::default());

        let writer = AuditWriter {
            backend: backend.clone(),
            forwarder,
            config: config.clone(),
            counters: counters.clone(),
        };
        let handle = tokio::spawn(writer.run(rx));

        let store = Self {
            tx,
            backend,
            counters,
            session_id: Uuid::new_v4().to_string().into(),
            retention_days: config.retention_days,
        };

        (store, handle)
    }

    /// Correlation id stamped on entries that carry none
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Enqueue one entry. Never blocks and never fails.
    pub fn log_event(&self, mut entry: AuditLogEntry) {
        if entry.session_id.is_empty() {
            entry.session_id = self.session_id.to_string();
        }

        match self.tx.try_send(AuditCommand::Write(Box::new(entry))) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(cmd)) => self.drop_command("queue full", cmd),
            Err(mpsc::error::TrySendError::Closed(cmd)) => self.drop_command("writer stopped", cmd),
        }
    }

    fn drop_command(&self, reason: &str, cmd: AuditCommand) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        if let AuditCommand::Write(entry) = cmd {
            tracing::warn!("Audit entry dropped ({}): {} on {}", reason, entry.action, entry.resource);
        }
    }

    /// Wait until every entry enqueued before this call has been processed
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(AuditCommand::Flush(ack_tx)).await.is_err() {
            tracing::warn!("Audit flush skipped: writer stopped");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Entries of one user within `[start, end]`, newest first
    pub async fn get_audit_trail(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
        offset: u64,
    ) -> Result<AuditPage, AuditError> {
        let filter = AuditQuery::new(start, end).for_user(user_id).page(limit, offset);
        self.backend.query(&filter).await
    }

    /// Arbitrary filtered query against the backend
    pub async fn query(&self, filter: &AuditQuery) -> Result<AuditPage, AuditError> {
        self.backend.query(filter).await
    }

    /// Anonymize a deleted user's entries in place
    pub async fn anonymize_user(&self, user_id: &str) -> Result<u64, AuditError> {
        // Entries still queued for this user must be rewritten too
        self.flush().await;

        let touched = self.backend.anonymize_user(user_id).await?;
        tracing::info!("Anonymized {} audit entries", touched);

        self.log_event(
            AuditLogEntry::system("audit_user_anonymized", "audit_log")
                .with_metadata(serde_json::json!({ "entries": touched })),
        );
        Ok(touched)
    }

    /// Delete entries older than the retention period
    pub async fn purge_expired(&self) -> Result<u64, AuditError> {
        let cutoff = retention_cutoff(Utc::now(), self.retention_days)?;
        let removed = self.backend.purge_before(cutoff).await?;
        if removed > 0 {
            tracing::info!("Purged {} audit entries older than {} days", removed, self.retention_days);
        }
        Ok(removed)
    }

    pub fn stats(&self) -> AuditStats {
        let c = &self.counters;
        AuditStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            written: c.written.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            write_failures: c.write_failures.load(Ordering::Relaxed),
            forwarded: c.forwarded.load(Ordering::Relaxed),
            forward_failures: c.forward_failures.load(Ordering::Relaxed),
        }
    }
}

/// Oldest timestamp kept. A non-positive or overflowing period is refused.
fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> Result<DateTime<Utc>, AuditError> {
    if retention_days < 1 {
        return Err(AuditError::InvalidRetention(retention_days));
    }
    Duration::try_days(retention_days)
        .and_then(|period| now.checked_sub_signed(period))
        .ok_or(AuditError::InvalidRetention(retention_days))
}

// ============================================================================
// WRITER TASK
// ============================================================================

struct AuditWriter {
    backend: Arc<dyn AuditBackend>,
    forwarder: Option<Arc<dyn SiemForwarder>>,
    config: AuditConfig,
    counters: Arc<AuditCounters>,
}

impl AuditWriter {
    async fn run(self, mut rx: mpsc::Receiver<AuditCommand>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                AuditCommand::Write(entry) => self.process(&entry).await,
                AuditCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        tracing::debug!("Audit writer stopped");
    }

    async fn process(&self, entry: &AuditLogEntry) {
        match self.write_with_retry(entry).await {
            Ok(()) => {
                self.counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Audit write failed after {} attempts, dropping {}: {}", MAX_ATTEMPTS, entry.id, e);
            }
        }

        if !self.config.is_sensitive(&entry.action) {
            return;
        }

        if let Some(forwarder) = &self.forwarder {
            match forward_with_retry(forwarder.as_ref(), entry).await {
                Ok(()) => {
                    self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.forward_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("SIEM forward failed for {}: {}", entry.id, e);
                }
            }
        }
    }

    async fn write_with_retry(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let mut attempt = 1;
        loop {
            match self.backend.write(entry).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::debug!("Audit write attempt {} failed: {}", attempt, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn forward_with_retry(forwarder: &dyn SiemForwarder, entry: &AuditLogEntry) -> Result<(), AuditError> {
    let mut attempt = 1;
    loop {
        match forwarder.send(entry).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::debug!("SIEM forward attempt {} failed: {}", attempt, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
