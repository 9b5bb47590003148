//! Line parser trait abstraction
//!
//! Each log source has a parser implementing [`LineParser`]. Parsers are
//! stateless: one raw line in, at most one [`Event`] out.
//!
//! ## Design Principles
//!
//! 1. **Resilience**: a malformed line never fails the tailer. Text formats
//!    produce a partially filled event; the JSON format produces no event.
//! 2. **Purity**: parsing has no side effects and needs no context beyond the
//!    line and the source it came from.

use crate::types::{Event, EventKind, LogSource};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

use super::parsers::parser_for;

/// Timestamp layout used by both text logs.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Trait implemented by all log line parsers.
pub trait LineParser: Send + Sync {
    /// Which log file this parser handles
    fn source(&self) -> LogSource;

    /// Parse one line (without its trailing newline).
    ///
    /// Returns `None` when the line is not recognizable at all.
    fn parse_line(&self, line: &str) -> Option<Event>;
}

/// Parse a line produced by the file that emits `kind` events.
pub fn parse(line: &str, kind: EventKind) -> Option<Event> {
    let source = match kind {
        EventKind::ToolCall => LogSource::ToolCalls,
        EventKind::Error => LogSource::Errors,
        EventKind::Meta => LogSource::MetaAnalytics,
    };
    parser_for(source).parse_line(line)
}

/// Parse a line read from `path`, choosing the parser by file name.
///
/// Lines from unrecognized files yield no event.
pub fn parse_for_path(line: &str, path: &Path) -> Option<Event> {
    LogSource::from_path(path).and_then(|source| parser_for(source).parse_line(line))
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp as UTC.
///
/// Returns the Unix epoch when the text does not match.
pub(crate) fn parse_log_timestamp(text: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(text, LOG_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn test_parse_log_timestamp() {
        assert_eq!(
            parse_log_timestamp("2024-01-01 10:00:00"),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_log_timestamp("yesterday-ish"),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn test_parse_dispatches_by_kind() {
        let line = "2024-01-01 10:00:00: [git] MCP ERROR: repository not found";
        let event = parse(line, EventKind::Error).unwrap();
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.status, "ERROR");

        // The same text is not valid JSON, so the meta parser drops it
        assert!(parse(line, EventKind::Meta).is_none());
    }

    #[test]
    fn test_parse_for_unknown_path() {
        let line = "2024-01-01 10:00:00: [git] MCP ERROR: boom";
        assert!(parse_for_path(line, &PathBuf::from("/tmp/other.log")).is_none());
        assert!(parse_for_path(line, &PathBuf::from("/tmp/mcp-errors.log")).is_some());
    }
}
