//! # mcp-dashboard-core
//!
//! Core library for mcp-dashboard - a live view over the logs written by the
//! MCP tool-call logging wrapper.
//!
//! This library provides:
//! - Domain types for parsed log events
//! - Line parsers for the three MCP log formats
//! - A file tailer per watched log
//! - A thread-safe metrics store and summary statistics
//! - A broadcast hub fanning events out to live viewers
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcp_dashboard_core::ingest::{spawn_tailers, Pipeline};
//! use mcp_dashboard_core::{BroadcastHub, Config, MetricsStore};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! # async fn run() -> mcp_dashboard_core::Result<()> {
//! let config = Config::load()?;
//! let pipeline = Pipeline::new(
//!     Arc::new(MetricsStore::new()),
//!     BroadcastHub::new(config.viewer.queue_capacity),
//! );
//! let (stop, shutdown) = watch::channel(false);
//! let tailers = spawn_tailers(config.watch.paths(), &pipeline, &shutdown);
//!
//! let report = pipeline.store().report();
//! println!("{} tool calls so far", report.summary.total_tool_calls);
//!
//! stop.send_replace(true);
//! for tailer in tailers {
//!     if let Ok(Some(stats)) = tailer.await {
//!         println!("{} lines read", stats.lines_read);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{MetricsReport, MetricsSnapshot, MetricsStore, Summary};
pub use broadcast::BroadcastHub;
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod types;
