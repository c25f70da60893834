//! Logic - scoring, detection, aggregation and audit

pub mod audit;
pub mod risk;
pub mod anomaly;
pub mod threat;
pub mod mitigation;
pub mod metrics;
pub mod report;
pub mod pipeline;

pub use pipeline::{PipelineOutcome, SecurityPipeline};
