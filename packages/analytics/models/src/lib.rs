#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregate view result types for the dashboard charts.
//!
//! Every type here is a freshly computed, read-only snapshot: never
//! mutated in place, only replaced when the record set or active filter
//! changes.

use serde::{Deserialize, Serialize};

/// One calendar month's volume bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyVolume {
    /// Zero-based calendar month (0 = January).
    pub month: u32,
    /// Three-letter month abbreviation for the axis label.
    pub month_name: String,
    /// Total requests opened in this month.
    pub requests: u64,
    /// How many of those are closed.
    pub closed: u64,
    /// How many of those are flagged overdue.
    pub overdue: u64,
}

/// A category and its request count.
///
/// `label` is truncated with an ellipsis for axis rendering; `full_label`
/// preserves the untruncated category name for tooltips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    /// Display label, possibly truncated.
    pub label: String,
    /// Full category name.
    pub full_label: String,
    /// Number of matching requests.
    pub count: u64,
}

/// A status value and its request count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    /// Exact status string.
    pub status: String,
    /// Number of matching requests.
    pub count: u64,
}

/// Binary on-time versus overdue counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnTimeBreakdown {
    /// Requests flagged `ONTIME`.
    pub on_time: u64,
    /// Requests flagged `OVERDUE`.
    pub overdue: u64,
}

/// Mean resolution time across closed requests.
///
/// `None` means no record carried a resolution duration; rendered as
/// `"N/A"`, never as zero or NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionSummary {
    /// Mean days-to-close, when at least one record has one.
    pub average_days: Option<f64>,
}

impl std::fmt::Display for ResolutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.average_days {
            Some(days) => write!(f, "{days:.1}"),
            None => write!(f, "N/A"),
        }
    }
}

/// Share of flagged requests that were resolved on time.
///
/// `None` means no record carried the on-time flag at all; rendered as
/// `"N/A"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnTimeRate {
    /// Percentage (0-100) of flagged requests that were on time.
    pub percent: Option<f64>,
}

impl std::fmt::Display for OnTimeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.percent {
            Some(percent) => write!(f, "{percent:.1}%"),
            None => write!(f, "N/A"),
        }
    }
}

/// Mean resolution time for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResolution {
    /// Topic name.
    pub topic: String,
    /// Mean days-to-close across this topic's closed requests.
    pub average_days: f64,
    /// Number of contributing records.
    pub samples: u64,
}

/// Requests bucketed by hour of day (0-23).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyDistribution {
    /// Count per hour, index = hour.
    pub counts: [u64; 24],
}

impl Default for HourlyDistribution {
    fn default() -> Self {
        Self { counts: [0; 24] }
    }
}

/// Requests bucketed by day of week (0 = Sunday).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayDistribution {
    /// Count per weekday, index 0 = Sunday.
    pub counts: [u64; 7],
}

/// Every aggregate the dashboard renders, computed in one pass over the
/// filtered record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateViews {
    /// Number of records passing the active filter.
    pub total: u64,
    /// Monthly volume buckets, calendar order, nonzero months only.
    pub monthly: Vec<MonthlyVolume>,
    /// Top neighborhoods by request count.
    pub by_neighborhood: Vec<CategoryCount>,
    /// Top topics by request count.
    pub by_topic: Vec<CategoryCount>,
    /// Top departments by request count.
    pub by_department: Vec<CategoryCount>,
    /// Report sources by request count (unbounded).
    pub by_source: Vec<CategoryCount>,
    /// Status breakdown.
    pub statuses: Vec<StatusCount>,
    /// On-time versus overdue counts.
    pub on_time: OnTimeBreakdown,
    /// Mean resolution time.
    pub resolution: ResolutionSummary,
    /// On-time percentage.
    pub on_time_rate: OnTimeRate,
    /// Slowest topics by mean resolution time.
    pub resolution_by_topic: Vec<TopicResolution>,
    /// Hour-of-day histogram.
    pub hourly: HourlyDistribution,
    /// Day-of-week histogram.
    pub weekday: WeekdayDistribution,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summaries_render_as_not_available() {
        assert_eq!(ResolutionSummary::default().to_string(), "N/A");
        assert_eq!(OnTimeRate::default().to_string(), "N/A");
    }

    #[test]
    fn populated_summaries_render_with_one_decimal() {
        let summary = ResolutionSummary {
            average_days: Some(5.25),
        };
        assert_eq!(summary.to_string(), "5.2");

        let rate = OnTimeRate {
            percent: Some(82.456),
        };
        assert_eq!(rate.to_string(), "82.5%");
    }
}
