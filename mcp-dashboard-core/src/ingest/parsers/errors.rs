//! Error log parser
//!
//! Parses `mcp-errors.log`:
//!
//! ```text
//! 2024-01-01 10:00:00: [github] MCP ERROR: request failed: 502 Bad Gateway
//! ```
//!
//! Everything after the server is the message, colons included.

use crate::ingest::parser::{parse_log_timestamp, LineParser};
use crate::types::{Event, EventKind, LogSource, STATUS_ERROR};

const FIELD_SEPARATOR: &str = ": ";

/// Parser for the colon-delimited error log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorLogParser;

impl LineParser for ErrorLogParser {
    fn source(&self) -> LogSource {
        LogSource::Errors
    }

    fn parse_line(&self, line: &str) -> Option<Event> {
        let mut event = Event::empty(EventKind::Error);

        let parts: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if parts.len() < 3 {
            return Some(event);
        }

        event.timestamp = parse_log_timestamp(parts[0]);
        let server = parts[1].strip_prefix('[').unwrap_or(parts[1]);
        let server = server.strip_suffix("] MCP ERROR").unwrap_or(server);
        event.server = server.to_string();
        event.status = STATUS_ERROR.to_string();
        event.details = parts[2..].join(FIELD_SEPARATOR);

        Some(event)
    }
}
