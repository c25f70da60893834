//! Data models

pub mod severity;
pub mod event;
pub mod audit;
pub mod metrics;

pub use severity::*;
pub use event::*;
pub use audit::*;
pub use metrics::*;
