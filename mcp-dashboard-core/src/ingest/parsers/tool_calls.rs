//! Tool-call log parser
//!
//! Parses `mcp-tool-calls.log`, one call per line:
//!
//! ```text
//! 2024-01-01 10:00:00: [github] TOOL_CALL: create_issue | STATUS: SUCCESS | BRANCH: main | DETAILS: ok | PARAMS: {"repo":"x"}
//! ```
//!
//! The `PARAMS` segment is optional. Lines with fewer than four segments
//! still produce an event, just an empty one.

use crate::ingest::parser::{parse_log_timestamp, LineParser};
use crate::types::{Event, EventKind, LogSource};

const SEGMENT_SEPARATOR: &str = " | ";
const FIELD_SEPARATOR: &str = ": ";
const MIN_SEGMENTS: usize = 4;

/// Parser for the pipe-delimited tool-call log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolCallParser;

impl LineParser for ToolCallParser {
    fn source(&self) -> LogSource {
        LogSource::ToolCalls
    }

    fn parse_line(&self, line: &str) -> Option<Event> {
        let mut event = Event::empty(EventKind::ToolCall);

        let segments: Vec<&str> = line.split(SEGMENT_SEPARATOR).collect();
        if segments.len() < MIN_SEGMENTS {
            return Some(event);
        }

        // "<timestamp>: [<server>] TOOL_CALL: <tool>"
        let head: Vec<&str> = segments[0].split(FIELD_SEPARATOR).collect();
        if head.len() >= 2 {
            event.timestamp = parse_log_timestamp(head[0]);
            let server = head[1].strip_prefix('[').unwrap_or(head[1]);
            let server = server.strip_suffix("] TOOL_CALL").unwrap_or(server);
            event.server = server.to_string();
        }
        if head.len() >= 3 {
            event.tool = head[2].trim().to_string();
        }

        for segment in &segments[1..] {
            let Some((key, value)) = segment.split_once(FIELD_SEPARATOR) else {
                continue;
            };
            match key {
                "STATUS" => event.status = value.to_string(),
                "BRANCH" => event.branch = value.to_string(),
                "DETAILS" => event.details = value.to_string(),
                "PARAMS" => {
                    if let Ok(params) = serde_json::from_str(value) {
                        event.parameters = params;
                    }
                }
                _ => {}
            }
        }

        Some(event)
    }
}
