//! Analytics module for mcp-dashboard
//!
//! - [`metrics`]: the shared, lock-guarded aggregate store fed by the tailers
//! - [`summary`]: roll-up statistics computed from a store snapshot

pub mod metrics;
pub mod summary;

pub use metrics::{bucket_start, MetricsSnapshot, MetricsStore, TimelinePoint, BUCKET_SECS};
pub use summary::{summarize, ActivityLevel, MetricsReport, Summary};
