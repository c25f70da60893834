//! Metrics Tracker
//!
//! In-memory table of throughput snapshots for dashboards. Lost on restart;
//! the audit log is the source of record.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::models::SecurityAIMetrics;

/// Ids are allocated under the same lock as the insert, so key order is
/// insertion order.
struct MetricsTable {
    snapshots: BTreeMap<u64, SecurityAIMetrics>,
    next_id: u64,
}

pub struct MetricsTracker {
    table: RwLock<MetricsTable>,
    capacity: usize,
}

impl MetricsTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: RwLock::new(MetricsTable {
                snapshots: BTreeMap::new(),
                next_id: 1,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Store a timestamped snapshot and return it
    pub fn track_metrics(
        &self,
        events_processed: u64,
        anomalies_detected: u64,
        avg_threat_score: f64,
        recommendations_issued: u64,
    ) -> SecurityAIMetrics {
        let mut table = self.table.write();
        let snapshot = SecurityAIMetrics {
            id: table.next_id,
            timestamp: Utc::now(),
            events_processed,
            anomalies_detected,
            avg_threat_score,
            recommendations_issued,
        };
        table.next_id += 1;

        table.snapshots.insert(snapshot.id, snapshot.clone());
        while table.snapshots.len() > self.capacity {
            table.snapshots.pop_first();
        }

        snapshot
    }

    pub fn get(&self, id: u64) -> Option<SecurityAIMetrics> {
        self.table.read().snapshots.get(&id).cloned()
    }

    pub fn latest(&self) -> Option<SecurityAIMetrics> {
        self.table.read().snapshots.values().next_back().cloned()
    }

    /// Up to `limit` snapshots, newest first
    pub fn recent(&self, limit: usize) -> Vec<SecurityAIMetrics> {
        self.table.read().snapshots.values().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.table.read().snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().snapshots.is_empty()
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}
