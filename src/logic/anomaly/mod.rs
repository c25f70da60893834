//! Anomaly Module
//!
//! Batch-relative outlier detection on top of the risk scorer.

pub mod types;
pub mod detector;

pub use types::{AnomalyDetectionResult, AnomalyFinding};
pub use detector::{anomaly_reason, cutoff_index, detect_anomalies, AnomalyDetector};
