//! Audit Backends
//!
//! Durable storage behind the audit queue. The queue consumer is the only
//! writer; queries may run concurrently with it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AuditError;
use crate::models::{AuditLogEntry, AuditLogRow, ANONYMIZED_USER};

/// Maximum page size accepted by any backend
pub const MAX_PAGE_SIZE: u32 = 500;

// ============================================================================
// QUERY TYPES
// ============================================================================

/// Audit trail filter. Bounds are inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: u32,
    pub offset: u64,
}

impl AuditQuery {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            user_id: None,
            start,
            end,
            limit: 50,
            offset: 0,
        }
    }

    pub fn for_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn page(mut self, limit: u32, offset: u64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of audit entries, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    /// Offset of the next page, `None` on the last page
    pub next_offset: Option<u64>,
}

// ============================================================================
// BACKEND TRAIT
// ============================================================================

#[async_trait]
pub trait AuditBackend: Send + Sync {
    /// Append one entry
    async fn write(&self, entry: &AuditLogEntry) -> Result<(), AuditError>;

    /// Entries matching the filter, newest first
    async fn query(&self, filter: &AuditQuery) -> Result<AuditPage, AuditError>;

    /// Replace `user_id` with the anonymized sentinel; returns rows touched
    async fn anonymize_user(&self, user_id: &str) -> Result<u64, AuditError>;

    /// Delete entries older than `cutoff`; returns rows removed
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError>;
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

/// Process-local backend (tests, CLI without a database)
#[derive(Default)]
pub struct MemoryAuditBackend {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl MemoryAuditBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every stored entry in insertion order
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().clone()
    }
}

#[async_trait]
impl AuditBackend for MemoryAuditBackend {
    async fn write(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn query(&self, filter: &AuditQuery) -> Result<AuditPage, AuditError> {
        let entries = self.entries.read();
        let mut matched: Vec<&AuditLogEntry> = entries
            .iter()
            .filter(|e| filter.user_id.as_deref().map_or(true, |u| e.user_id == u))
            .filter(|e| e.timestamp >= filter.start && e.timestamp <= filter.end)
            .collect();

        // Newest first; insertion order breaks ties
        matched.reverse();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let limit = filter.effective_limit() as usize;
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let page: Vec<AuditLogEntry> = matched
            .iter()
            .skip(offset)
            .take(limit)
            .map(|e| (*e).clone())
            .collect();

        let next_offset = if offset.saturating_add(limit) < matched.len() {
            Some(filter.offset + page.len() as u64)
        } else {
            None
        };

        Ok(AuditPage { entries: page, next_offset })
    }

    async fn anonymize_user(&self, user_id: &str) -> Result<u64, AuditError> {
        let mut entries = self.entries.write();
        let mut touched = 0;
        for entry in entries.iter_mut().filter(|e| e.user_id == user_id) {
            entry.user_id = ANONYMIZED_USER.to_string();
            touched += 1;
        }
        Ok(touched)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}

// ============================================================================
// POSTGRES BACKEND
// ============================================================================

/// PostgreSQL `audit_log` table (schema in `db.rs`)
#[derive(Clone)]
pub struct PgAuditBackend {
    pool: PgPool,
}

impl PgAuditBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditBackend for PgAuditBackend {
    async fn write(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, user_id, action, resource, ip_address, user_agent, details, severity, session_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(&entry.action)
        .bind(&entry.resource)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(&entry.metadata)
        .bind(entry.severity.as_str())
        .bind(&entry.session_id)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, filter: &AuditQuery) -> Result<AuditPage, AuditError> {
        let limit = filter.effective_limit() as i64;
        let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);

        // One extra row tells us whether another page exists
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, user_id, action, resource, ip_address, user_agent, details, severity, session_id, created_at
            FROM audit_log
            WHERE ($1::TEXT IS NULL OR user_id = $1)
              AND created_at >= $2
              AND created_at <= $3
            ORDER BY created_at DESC, seq DESC
            LIMIT $4 OFFSET $5
            "#
        )
        .bind(&filter.user_id)
        .bind(filter.start)
        .bind(filter.end)
        .bind(limit + 1)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let has_more = rows.len() as i64 > limit;
        let entries = rows
            .into_iter()
            .take(limit as usize)
            .map(AuditLogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let next_offset = has_more.then(|| filter.offset + entries.len() as u64);
        Ok(AuditPage { entries, next_offset })
    }

    async fn anonymize_user(&self, user_id: &str) -> Result<u64, AuditError> {
        let result = sqlx::query("UPDATE audit_log SET user_id = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(ANONYMIZED_USER)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        let result = sqlx::query("DELETE FROM audit_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// TESTS
// ============================================================================
