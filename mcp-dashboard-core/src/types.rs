//! Core domain types for mcp-dashboard
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One structured record derived from a single appended log line |
//! | **LogSource** | One of the three files the MCP logging wrapper appends to |
//! | **Bucket** | A fixed 5-minute window used to group timeline activity |
//!
//! Events are built once by a parser and never mutated afterwards. Their only
//! lasting effect is what the metrics store derives from them and what live
//! viewers were sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================
// Event
// ============================================

/// Which file produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A line from the tool-call log
    ToolCall,
    /// A line from the error log
    Error,
    /// A JSON record from the meta-analytics log
    Meta,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ToolCall => "tool_call",
            EventKind::Error => "error",
            EventKind::Meta => "meta",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed log line.
///
/// Serialized as-is for the live feed, one JSON object per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the underlying action occurred (Unix epoch if unknown)
    pub timestamp: DateTime<Utc>,
    pub server: String,
    pub tool: String,
    pub status: String,
    pub branch: String,
    pub details: String,
    /// Format-specific metadata (execution time, principle, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl Event {
    /// An event of the given kind with every other field unset.
    pub fn empty(kind: EventKind) -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            server: String::new(),
            tool: String::new(),
            status: String::new(),
            branch: String::new(),
            details: String::new(),
            parameters: serde_json::Map::new(),
            kind,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }

    /// Numeric `execution_ms` parameter, if present.
    pub fn execution_ms(&self) -> Option<f64> {
        self.parameters.get("execution_ms").and_then(|v| v.as_f64())
    }
}

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_ERROR: &str = "ERROR";

// ============================================
// Log sources
// ============================================

/// The three log files written by the MCP logging wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// `mcp-tool-calls.log`, pipe-delimited text
    ToolCalls,
    /// `mcp-errors.log`, colon-delimited text
    Errors,
    /// `mcp-meta-analytics.jsonl`, one JSON object per line
    MetaAnalytics,
}

impl LogSource {
    pub const ALL: [LogSource; 3] = [
        LogSource::ToolCalls,
        LogSource::Errors,
        LogSource::MetaAnalytics,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            LogSource::ToolCalls => "mcp-tool-calls.log",
            LogSource::Errors => "mcp-errors.log",
            LogSource::MetaAnalytics => "mcp-meta-analytics.jsonl",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            LogSource::ToolCalls => EventKind::ToolCall,
            LogSource::Errors => EventKind::Error,
            LogSource::MetaAnalytics => EventKind::Meta,
        }
    }

    /// Identify a source by substring match on the path.
    ///
    /// Returns `None` for paths that are not one of the known files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let path = path.to_string_lossy();
        Self::ALL
            .into_iter()
            .find(|source| path.contains(source.file_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_source_from_path() {
        assert_eq!(
            LogSource::from_path(&PathBuf::from("/home/me/mcp-tool-calls.log")),
            Some(LogSource::ToolCalls)
        );
        assert_eq!(
            LogSource::from_path(&PathBuf::from("/tmp/mcp-errors.log")),
            Some(LogSource::Errors)
        );
        assert_eq!(
            LogSource::from_path(&PathBuf::from("mcp-meta-analytics.jsonl")),
            Some(LogSource::MetaAnalytics)
        );
        assert_eq!(LogSource::from_path(&PathBuf::from("/var/log/syslog")), None);
    }

    #[test]
    fn test_event_wire_format() {
        let mut event = Event::empty(EventKind::ToolCall);
        event.tool = "create_issue".to_string();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool"], "create_issue");
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
        // Empty parameters are omitted
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_execution_ms() {
        let mut event = Event::empty(EventKind::Meta);
        assert_eq!(event.execution_ms(), None);

        event
            .parameters
            .insert("execution_ms".to_string(), serde_json::json!(120));
        assert_eq!(event.execution_ms(), Some(120.0));

        event
            .parameters
            .insert("execution_ms".to_string(), serde_json::json!("fast"));
        assert_eq!(event.execution_ms(), None);
    }
}
