//! One-Shield Security Pipeline
//!
//! Security telemetry in, threat assessment out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SECURITY PIPELINE                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  RawSecurityEvent ─► ingest ─► RiskScorer                    │
//! │                                   │                          │
//! │              ┌────────────────────┼──────────────────┐       │
//! │              ▼                    ▼                  ▼       │
//! │       AnomalyDetector     ThreatAggregator   MitigationEngine│
//! │              └────────────────────┼──────────────────┘       │
//! │                                   ▼                          │
//! │           AuditStore (queue) ─► writer task ─► Postgres/SIEM │
//! │                                                              │
//! │           MetricsTracker ◄── running totals                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod logic;
pub mod models;

pub use config::{AuditConfig, Config, PipelineConfig};
pub use error::{AuditError, PipelineError, PipelineResult};
pub use logic::audit::{AuditStore, MemoryAuditBackend, PgAuditBackend};
pub use logic::risk::event_risk_score;
pub use logic::{PipelineOutcome, SecurityPipeline};
pub use models::*;
