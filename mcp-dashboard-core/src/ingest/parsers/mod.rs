//! Source-specific parsers
//!
//! Each log file written by the MCP logging wrapper has a parser module
//! implementing the [`LineParser`](super::LineParser) trait.
//!
//! | Source | File | Module |
//! |--------|------|--------|
//! | Tool calls | `mcp-tool-calls.log` | [`tool_calls`] |
//! | Errors | `mcp-errors.log` | [`errors`] |
//! | Meta analytics | `mcp-meta-analytics.jsonl` | [`meta`] |

mod errors;
mod meta;
mod tool_calls;

pub use errors::ErrorLogParser;
pub use meta::MetaAnalyticsParser;
pub use tool_calls::ToolCallParser;

use super::LineParser;
use crate::types::LogSource;

static TOOL_CALLS: ToolCallParser = ToolCallParser;
static ERRORS: ErrorLogParser = ErrorLogParser;
static META: MetaAnalyticsParser = MetaAnalyticsParser;

/// Get the parser for a log source.
pub fn parser_for(source: LogSource) -> &'static dyn LineParser {
    match source {
        LogSource::ToolCalls => &TOOL_CALLS,
        LogSource::Errors => &ERRORS,
        LogSource::MetaAnalytics => &META,
    }
}
