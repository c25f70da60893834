//! Audit Module
//!
//! Append-only audit log for the security pipeline.
//!
//! ## Structure
//! - `backend.rs` - Storage trait + in-memory and PostgreSQL backends
//! - `forwarder.rs` - SIEM forwarding (HTTP)
//! - `store.rs` - Queue handle + single writer task
//!
//! ## Usage
//! ```ignore
//! let (audit, writer) = AuditStore::spawn(backend, forwarder, config.audit());
//! audit.log_event(AuditLogEntry::system("threat_scored", "security_pipeline"));
//! audit.flush().await;
//! ```

pub mod backend;
pub mod forwarder;
pub mod store;

pub use backend::{AuditBackend, AuditPage, AuditQuery, MemoryAuditBackend, PgAuditBackend, MAX_PAGE_SIZE};
pub use forwarder::{HttpSiemForwarder, SiemForwarder};
pub use store::{AuditStats, AuditStore};
