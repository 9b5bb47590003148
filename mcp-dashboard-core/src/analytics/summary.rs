//! Human-facing roll-up statistics derived from a metrics snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::metrics::MetricsSnapshot;

/// Timeline calls above this count in the latest bucket mean "high" activity.
const HIGH_ACTIVITY_THRESHOLD: u64 = 50;
/// Timeline calls above this count in the latest bucket mean "medium" activity.
const MEDIUM_ACTIVITY_THRESHOLD: u64 = 10;

/// Activity level of the most recent timeline bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
}

impl ActivityLevel {
    pub fn from_tool_calls(count: u64) -> Self {
        if count > HIGH_ACTIVITY_THRESHOLD {
            ActivityLevel::High
        } else if count > MEDIUM_ACTIVITY_THRESHOLD {
            ActivityLevel::Medium
        } else {
            ActivityLevel::Low
        }
    }
}

/// High-level statistics, recomputed on every query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_tool_calls: u64,
    pub overall_success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_used_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_active_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_principle: Option<String>,
    pub average_execution_time: f64,
    pub error_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_activity: Option<ActivityLevel>,
}

/// Snapshot query response: metrics at the top level, summary nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    pub summary: Summary,
}

/// Compute the summary for a snapshot.
///
/// When several keys share the maximal count, the lexicographically smallest
/// one is reported so the result does not depend on map iteration order.
pub fn summarize(metrics: &MetricsSnapshot) -> Summary {
    let total_tool_calls: u64 = metrics.tool_call_counts.values().sum();
    let total_errors: u64 = metrics.error_counts_by_server.values().sum();

    let error_rate = if total_tool_calls > 0 {
        total_errors as f64 / total_tool_calls as f64
    } else {
        0.0
    };

    Summary {
        total_tool_calls,
        overall_success_rate: mean(metrics.success_rates.values()),
        most_used_tool: max_key(&metrics.tool_call_counts),
        most_active_branch: max_key(&metrics.branch_activity),
        dominant_principle: max_key(&metrics.principle_usage),
        average_execution_time: mean(metrics.execution_times.values()),
        error_rate,
        recent_activity: metrics
            .activity_timeline
            .last()
            .map(|point| ActivityLevel::from_tool_calls(point.tool_call_count)),
    }
}

fn max_key(counts: &HashMap<String, u64>) -> Option<String> {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .max_by(|(a_key, a_count), (b_key, b_count)| {
            a_count.cmp(b_count).then_with(|| b_key.cmp(a_key))
        })
        .map(|(key, _)| key.clone())
}

fn mean<'a>(values: impl ExactSizeIterator<Item = &'a f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}
