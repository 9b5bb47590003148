//! Meta-analytics JSONL parser
//!
//! Parses `mcp-meta-analytics.jsonl`, one JSON object per line:
//!
//! ```json
//! {"timestamp": 1704103200, "tool": "create_issue", "metadata": {"execution_ms": 120, "principle": "tracer-bullets"}}
//! ```
//!
//! Fields with an unexpected type are ignored individually. A line that is not
//! a JSON object produces no event.

use crate::ingest::parser::LineParser;
use crate::types::{Event, EventKind, LogSource};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Parser for the meta-analytics JSON lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetaAnalyticsParser;

impl LineParser for MetaAnalyticsParser {
    fn source(&self) -> LogSource {
        LogSource::MetaAnalytics
    }

    fn parse_line(&self, line: &str) -> Option<Event> {
        let record: Map<String, Value> = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparsable meta-analytics line");
                return None;
            }
        };

        let mut event = Event::empty(EventKind::Meta);

        if let Some(secs) = record.get("timestamp").and_then(Value::as_f64) {
            // Fractional seconds are dropped
            if let Some(ts) = DateTime::<Utc>::from_timestamp(secs as i64, 0) {
                event.timestamp = ts;
            }
        }
        if let Some(tool) = record.get("tool").and_then(Value::as_str) {
            event.tool = tool.to_string();
        }
        if let Some(Value::Object(metadata)) = record.get("metadata") {
            event.parameters = metadata.clone();
        }

        Some(event)
    }
}
