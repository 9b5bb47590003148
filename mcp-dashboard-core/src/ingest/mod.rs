//! Ingestion: from appended log lines to aggregated, broadcast events
//!
//! ## Architecture
//!
//! ```text
//! log file ──> FileTailer ──> LineParser ──> Pipeline ─┬─> MetricsStore::ingest
//!                                                      └─> BroadcastHub::publish
//! ```
//!
//! One [`FileTailer`] runs per watched file, each on its own task. Within a
//! file, every event is ingested and then published before the next line is
//! looked at, so per-file order is preserved end to end. Nothing orders events
//! from different files relative to each other.

pub mod parser;
pub mod parsers;
mod tailer;

pub use parser::{parse, parse_for_path, LineParser, LOG_TIMESTAMP_FORMAT};
pub use tailer::{spawn_tailer, spawn_tailers, FileTailer, TailStats};

use crate::analytics::MetricsStore;
use crate::broadcast::BroadcastHub;
use crate::error::Result;
use crate::types::Event;
use std::sync::Arc;

/// Where every parsed event goes: the shared store, then the live feed.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    store: Arc<MetricsStore>,
    hub: BroadcastHub,
}

impl Pipeline {
    pub fn new(store: Arc<MetricsStore>, hub: BroadcastHub) -> Self {
        Self { store, hub }
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Ingest `event`, then serialize and publish it.
    ///
    /// Returns the number of viewers the event was queued for.
    pub fn dispatch(&self, event: &Event) -> Result<usize> {
        self.store.ingest(event);
        let payload = serde_json::to_string(event)?;
        Ok(self.hub.publish(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;

    #[test]
    fn test_dispatch_ingests_and_publishes() {
        let pipeline = Pipeline::default();
        let mut viewer = pipeline.hub().register();

        let mut event = Event::empty(EventKind::ToolCall);
        event.tool = "create_issue".to_string();
        assert_eq!(pipeline.dispatch(&event).unwrap(), 1);

        assert_eq!(pipeline.store().snapshot().tool_call_counts["create_issue"], 1);
        let payload = viewer.receiver.try_recv().unwrap();
        let decoded: Event = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, event);
    }
}
