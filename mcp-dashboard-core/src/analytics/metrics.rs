//! Running aggregate metrics over every event seen since startup.
//!
//! [`MetricsStore`] is shared by all file tailers (writers) and any number of
//! query handlers (readers). Every operation takes the lock for the length of
//! one ingest or one copy, so readers never observe a half-applied event.
//!
//! ## Smoothing
//!
//! Success rates, execution times and the timeline's average execution time
//! all use the same update, `new = (old + x) / 2`. For success rates `x` is 1
//! on `SUCCESS` and 0 on `ERROR`. This is an exponentially weighted indicator,
//! not a true ratio: two successes on a fresh key give 0.75, a success then an
//! error gives 0.25. Dashboards depend on this decay, so it is kept as-is.

use crate::types::{Event, EventKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::summary::{summarize, MetricsReport};

/// Width of one timeline bucket in seconds.
pub const BUCKET_SECS: i64 = 5 * 60;

/// Branch name the logging wrapper writes when git is unavailable.
const UNKNOWN_BRANCH: &str = "unknown";

/// Activity in one 5-minute bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    #[serde(rename = "time")]
    pub bucket_start: DateTime<Utc>,
    #[serde(rename = "toolCalls")]
    pub tool_call_count: u64,
    #[serde(rename = "errors")]
    pub error_count: u64,
    #[serde(rename = "avgExecTime")]
    pub avg_exec_time: f64,
}

impl TimelinePoint {
    fn new(bucket_start: DateTime<Utc>) -> Self {
        Self {
            bucket_start,
            tool_call_count: 0,
            error_count: 0,
            avg_exec_time: 0.0,
        }
    }
}

/// Aggregate state built from events.
///
/// This is both the store's internal state and the value handed out by
/// [`MetricsStore::snapshot`]. Field names on the wire match what the
/// dashboard front end reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// tool -> number of calls
    #[serde(rename = "toolCalls")]
    pub tool_call_counts: HashMap<String, u64>,
    /// "server:tool" -> smoothed success indicator in [0, 1]
    #[serde(rename = "successRates")]
    pub success_rates: HashMap<String, f64>,
    /// tool -> smoothed execution time in ms
    #[serde(rename = "executionTimes")]
    pub execution_times: HashMap<String, f64>,
    /// One point per 5-minute bucket, in order of first appearance. Events
    /// arrive in log order, so this is ascending unless a line carries an
    /// unparsable timestamp, whose epoch bucket is appended where it is seen.
    #[serde(rename = "activityTimeline")]
    pub activity_timeline: Vec<TimelinePoint>,
    #[serde(rename = "principleUsage")]
    pub principle_usage: HashMap<String, u64>,
    #[serde(rename = "errorCounts")]
    pub error_counts_by_server: HashMap<String, u64>,
    #[serde(rename = "branchActivity")]
    pub branch_activity: HashMap<String, u64>,
    #[serde(rename = "cognitiveLoad")]
    pub cognitive_load_counts: HashMap<String, u64>,
}

impl MetricsSnapshot {
    /// Apply one event.
    fn apply(&mut self, event: &Event) {
        if !event.tool.is_empty() {
            *self.tool_call_counts.entry(event.tool.clone()).or_insert(0) += 1;
        }

        if event.is_success() || event.is_error() {
            let key = format!("{}:{}", event.server, event.tool);
            let rate = self.success_rates.entry(key).or_insert(0.0);
            let outcome = if event.is_success() { 1.0 } else { 0.0 };
            *rate = smooth(*rate, outcome);
        }

        if event.is_error() {
            *self
                .error_counts_by_server
                .entry(event.server.clone())
                .or_insert(0) += 1;
        }

        if !event.branch.is_empty() && event.branch != UNKNOWN_BRANCH {
            *self.branch_activity.entry(event.branch.clone()).or_insert(0) += 1;
        }

        if event.kind == EventKind::Meta {
            self.apply_meta(event);
        }

        self.update_timeline(event);
    }

    fn apply_meta(&mut self, event: &Event) {
        if let Some(exec_ms) = event.execution_ms() {
            let avg = self
                .execution_times
                .entry(event.tool.clone())
                .or_insert(0.0);
            *avg = smooth(*avg, exec_ms);
        }

        if let Some(principle) = event.parameters.get("principle").and_then(|v| v.as_str()) {
            *self
                .principle_usage
                .entry(principle.to_string())
                .or_insert(0) += 1;
        }

        let load = event
            .parameters
            .get("operation_context")
            .and_then(|ctx| ctx.get("cognitive_load"))
            .and_then(|v| v.as_str());
        if let Some(load) = load {
            *self
                .cognitive_load_counts
                .entry(load.to_string())
                .or_insert(0) += 1;
        }
    }

    fn update_timeline(&mut self, event: &Event) {
        let bucket = bucket_start(event.timestamp);

        // The timeline stays small, a linear scan is fine
        let index = match self
            .activity_timeline
            .iter()
            .position(|point| point.bucket_start == bucket)
        {
            Some(index) => index,
            None => {
                self.activity_timeline.push(TimelinePoint::new(bucket));
                self.activity_timeline.len() - 1
            }
        };
        let point = &mut self.activity_timeline[index];

        if event.kind == EventKind::ToolCall {
            point.tool_call_count += 1;
        }
        if event.is_error() {
            point.error_count += 1;
        }
        if let Some(exec_ms) = event.execution_ms() {
            point.avg_exec_time = smooth(point.avg_exec_time, exec_ms);
        }
    }
}

/// Thread-safe aggregate store.
///
/// Created once at startup and shared (behind an `Arc`) by every tailer and
/// query handler.
#[derive(Debug, Default)]
pub struct MetricsStore {
    inner: RwLock<MetricsSnapshot>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the aggregates.
    pub fn ingest(&self, event: &Event) {
        let mut metrics = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        metrics.apply(event);
    }

    /// Independent deep copy of the current aggregates.
    ///
    /// Later ingests never show up in a snapshot that was already returned.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot plus a freshly computed summary, as served to dashboards.
    pub fn report(&self) -> MetricsReport {
        let metrics = self.snapshot();
        let summary = summarize(&metrics);
        MetricsReport { metrics, summary }
    }
}

/// Start of the 5-minute bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp();
    let start = secs - secs.rem_euclid(BUCKET_SECS);
    DateTime::<Utc>::from_timestamp(start, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn smooth(old: f64, new: f64) -> f64 {
    (old + new) / 2.0
}
