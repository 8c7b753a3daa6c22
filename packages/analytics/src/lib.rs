#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Pure aggregation functions over normalized service requests.
//!
//! Every function takes the full record slice plus the active
//! [`RequestFilter`] and returns a fresh result snapshot. Recomputation
//! is total (no incremental updates) and cheap enough to rerun on every
//! filter change; inputs are immutable, so callers recompute freely.

use std::collections::BTreeMap;

use boston311_analytics_models::{
    AggregateViews, CategoryCount, HourlyDistribution, MonthlyVolume, OnTimeBreakdown, OnTimeRate,
    ResolutionSummary, StatusCount, TopicResolution, WeekdayDistribution,
};
use boston311_request_models::{
    MONTH_ABBREV, ON_TIME, OVERDUE, RequestFilter, STATUS_CLOSED, ServiceRequest,
};

/// How many neighborhoods the ranking chart shows.
pub const NEIGHBORHOOD_LIMIT: usize = 15;
/// How many topics the ranking chart shows.
pub const TOPIC_LIMIT: usize = 12;
/// How many departments the ranking chart shows.
pub const DEPARTMENT_LIMIT: usize = 10;
/// How many topics the resolution-time chart shows.
pub const RESOLUTION_TOPIC_LIMIT: usize = 12;

/// Topics with fewer contributing records than this are suppressed from
/// the resolution-by-topic view, so one freak case cannot dominate it.
pub const MIN_TOPIC_SAMPLES: u64 = 3;

/// Maximum axis label length before truncation.
const LABEL_MAX_CHARS: usize = 24;

fn matching<'a>(
    records: &'a [ServiceRequest],
    filter: &'a RequestFilter,
) -> impl Iterator<Item = &'a ServiceRequest> {
    records.iter().filter(|r| filter.matches(r))
}

/// Shortens a label to [`LABEL_MAX_CHARS`], marking the cut with an
/// ellipsis. Counts characters, not bytes.
fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        return label.to_owned();
    }
    let mut truncated: String = label.chars().take(LABEL_MAX_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

/// Counts records per calendar month, with closed and overdue breakouts.
///
/// Only months with a nonzero total are emitted, in calendar order.
/// Records with an unparseable open date fall into no bucket.
#[must_use]
pub fn monthly_volume(records: &[ServiceRequest], filter: &RequestFilter) -> Vec<MonthlyVolume> {
    let mut buckets = [(0u64, 0u64, 0u64); 12];

    for record in matching(records, filter) {
        let Some(month) = record.month else {
            continue;
        };
        let Some(bucket) = buckets.get_mut(month as usize) else {
            continue;
        };
        bucket.0 += 1;
        if record.status == STATUS_CLOSED {
            bucket.1 += 1;
        }
        if record.on_time.as_deref() == Some(OVERDUE) {
            bucket.2 += 1;
        }
    }

    buckets
        .iter()
        .enumerate()
        .filter(|(_, (requests, _, _))| *requests > 0)
        .map(|(month, &(requests, closed, overdue))| MonthlyVolume {
            #[allow(clippy::cast_possible_truncation)]
            month: month as u32,
            month_name: MONTH_ABBREV[month].to_owned(),
            requests,
            closed,
            overdue,
        })
        .collect()
}

/// Groups records by a categorical key, sorted by descending count and
/// truncated to `limit` (`None` = unbounded). Ties break alphabetically
/// so output is deterministic.
fn top_categories<F>(
    records: &[ServiceRequest],
    filter: &RequestFilter,
    limit: Option<usize>,
    key: F,
) -> Vec<CategoryCount>
where
    F: Fn(&ServiceRequest) -> &str,
{
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for record in matching(records, filter) {
        *counts.entry(key(record)).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    // BTreeMap iteration is alphabetical; the stable sort keeps that
    // order within equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    ranked
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: truncate_label(label),
            full_label: label.to_owned(),
            count,
        })
        .collect()
}

/// Top neighborhoods by request count.
#[must_use]
pub fn by_neighborhood(records: &[ServiceRequest], filter: &RequestFilter) -> Vec<CategoryCount> {
    top_categories(records, filter, Some(NEIGHBORHOOD_LIMIT), |r| {
        &r.neighborhood
    })
}

/// Top topics by request count.
#[must_use]
pub fn by_topic(records: &[ServiceRequest], filter: &RequestFilter) -> Vec<CategoryCount> {
    top_categories(records, filter, Some(TOPIC_LIMIT), |r| &r.topic)
}

/// Top departments by request count.
#[must_use]
pub fn by_department(records: &[ServiceRequest], filter: &RequestFilter) -> Vec<CategoryCount> {
    top_categories(records, filter, Some(DEPARTMENT_LIMIT), |r| &r.department)
}

/// All report sources by request count.
#[must_use]
pub fn by_source(records: &[ServiceRequest], filter: &RequestFilter) -> Vec<CategoryCount> {
    top_categories(records, filter, None, |r| &r.source)
}

/// Request counts per exact status value, descending.
#[must_use]
pub fn status_breakdown(records: &[ServiceRequest], filter: &RequestFilter) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for record in matching(records, filter) {
        *counts.entry(&record.status).or_insert(0) += 1;
    }

    let mut ranked: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_owned(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// On-time versus overdue counts, by exact flag equality.
#[must_use]
pub fn on_time_breakdown(records: &[ServiceRequest], filter: &RequestFilter) -> OnTimeBreakdown {
    let mut breakdown = OnTimeBreakdown::default();
    for record in matching(records, filter) {
        match record.on_time.as_deref() {
            Some(ON_TIME) => breakdown.on_time += 1,
            Some(OVERDUE) => breakdown.overdue += 1,
            _ => {}
        }
    }
    breakdown
}

/// Mean days-to-close across records that have one. `average_days` is
/// `None` (rendered `"N/A"`) when no record qualifies.
#[must_use]
pub fn average_resolution(
    records: &[ServiceRequest],
    filter: &RequestFilter,
) -> ResolutionSummary {
    let mut sum = 0.0;
    let mut count: u64 = 0;
    for record in matching(records, filter) {
        if let Some(days) = record.days_to_close {
            sum += days;
            count += 1;
        }
    }

    ResolutionSummary {
        #[allow(clippy::cast_precision_loss)]
        average_days: (count > 0).then(|| sum / count as f64),
    }
}

/// Percentage of flagged records that were on time. `percent` is `None`
/// (rendered `"N/A"`) when no record carries the flag.
#[must_use]
pub fn on_time_rate(records: &[ServiceRequest], filter: &RequestFilter) -> OnTimeRate {
    let mut flagged: u64 = 0;
    let mut on_time: u64 = 0;
    for record in matching(records, filter) {
        if let Some(flag) = record.on_time.as_deref() {
            flagged += 1;
            if flag == ON_TIME {
                on_time += 1;
            }
        }
    }

    OnTimeRate {
        #[allow(clippy::cast_precision_loss)]
        percent: (flagged > 0).then(|| on_time as f64 / flagged as f64 * 100.0),
    }
}

/// Mean resolution time per topic, slowest first, capped at
/// [`RESOLUTION_TOPIC_LIMIT`]. Topics with fewer than
/// [`MIN_TOPIC_SAMPLES`] contributing records are suppressed.
#[must_use]
pub fn resolution_by_topic(
    records: &[ServiceRequest],
    filter: &RequestFilter,
) -> Vec<TopicResolution> {
    let mut sums: BTreeMap<&str, (f64, u64)> = BTreeMap::new();
    for record in matching(records, filter) {
        if let Some(days) = record.days_to_close {
            let entry = sums.entry(&record.topic).or_insert((0.0, 0));
            entry.0 += days;
            entry.1 += 1;
        }
    }

    let mut ranked: Vec<TopicResolution> = sums
        .into_iter()
        .filter(|(_, (_, samples))| *samples >= MIN_TOPIC_SAMPLES)
        .map(|(topic, (sum, samples))| TopicResolution {
            topic: topic.to_owned(),
            #[allow(clippy::cast_precision_loss)]
            average_days: sum / samples as f64,
            samples,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.average_days
            .partial_cmp(&a.average_days)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(RESOLUTION_TOPIC_LIMIT);
    ranked
}

/// Request counts per hour of day.
#[must_use]
pub fn hourly_distribution(
    records: &[ServiceRequest],
    filter: &RequestFilter,
) -> HourlyDistribution {
    let mut distribution = HourlyDistribution::default();
    for record in matching(records, filter) {
        if let Some(slot) = record
            .hour
            .and_then(|hour| distribution.counts.get_mut(hour as usize))
        {
            *slot += 1;
        }
    }
    distribution
}

/// Request counts per day of week (0 = Sunday).
#[must_use]
pub fn weekday_distribution(
    records: &[ServiceRequest],
    filter: &RequestFilter,
) -> WeekdayDistribution {
    let mut distribution = WeekdayDistribution::default();
    for record in matching(records, filter) {
        if let Some(slot) = record
            .weekday
            .and_then(|weekday| distribution.counts.get_mut(weekday as usize))
        {
            *slot += 1;
        }
    }
    distribution
}

/// Computes every aggregate the dashboard renders in one call.
#[must_use]
pub fn compute_views(records: &[ServiceRequest], filter: &RequestFilter) -> AggregateViews {
    let total = matching(records, filter).count() as u64;
    log::debug!("Recomputing aggregates over {total} filtered records");

    AggregateViews {
        total,
        monthly: monthly_volume(records, filter),
        by_neighborhood: by_neighborhood(records, filter),
        by_topic: by_topic(records, filter),
        by_department: by_department(records, filter),
        by_source: by_source(records, filter),
        statuses: status_breakdown(records, filter),
        on_time: on_time_breakdown(records, filter),
        resolution: average_resolution(records, filter),
        on_time_rate: on_time_rate(records, filter),
        resolution_by_topic: resolution_by_topic(records, filter),
        hourly: hourly_distribution(records, filter),
        weekday: weekday_distribution(records, filter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Raw<'a> {
        topic: &'a str,
        neighborhood: &'a str,
        status: &'a str,
        on_time: Option<&'a str>,
        month: Option<u32>,
        hour: Option<u32>,
        weekday: Option<u32>,
        days_to_close: Option<f64>,
    }

    impl Default for Raw<'_> {
        fn default() -> Self {
            Self {
                topic: "Street Cleaning",
                neighborhood: "Dorchester",
                status: "Open",
                on_time: None,
                month: Some(0),
                hour: Some(9),
                weekday: Some(1),
                days_to_close: None,
            }
        }
    }

    fn request(raw: &Raw<'_>) -> ServiceRequest {
        ServiceRequest {
            id: "1".to_string(),
            topic: raw.topic.to_string(),
            service: "Unknown".to_string(),
            department: "PWDx".to_string(),
            team: "Unknown".to_string(),
            status: raw.status.to_string(),
            source: "Constituent Call".to_string(),
            neighborhood: raw.neighborhood.to_string(),
            closure_reason: None,
            on_time: raw.on_time.map(str::to_string),
            zip_code: String::new(),
            address: String::new(),
            opened_at: None,
            closed_at: None,
            target_closed_at: None,
            month: raw.month,
            year: raw.month.map(|_| 2024),
            day: raw.month.map(|_| 15),
            weekday: raw.weekday,
            hour: raw.hour,
            days_to_close: raw.days_to_close,
            lat: None,
            lng: None,
        }
    }

    fn no_filter() -> RequestFilter {
        RequestFilter::all()
    }

    #[test]
    fn monthly_buckets_sum_to_dated_record_count() {
        let records: Vec<ServiceRequest> = [
            Raw {
                month: Some(0),
                status: "Closed",
                ..Raw::default()
            },
            Raw {
                month: Some(0),
                on_time: Some(OVERDUE),
                ..Raw::default()
            },
            Raw {
                month: Some(5),
                ..Raw::default()
            },
            Raw {
                month: None,
                ..Raw::default()
            },
        ]
        .iter()
        .map(request)
        .collect();

        let monthly = monthly_volume(&records, &no_filter());
        let total: u64 = monthly.iter().map(|m| m.requests).sum();
        let dated = records.iter().filter(|r| r.month.is_some()).count() as u64;
        assert_eq!(total, dated);

        // Calendar order, nonzero months only.
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].month, 0);
        assert_eq!(monthly[0].month_name, "Jan");
        assert_eq!(monthly[0].closed, 1);
        assert_eq!(monthly[0].overdue, 1);
        assert_eq!(monthly[1].month, 5);
    }

    #[test]
    fn top_categories_rank_descending_and_truncate() {
        let mut raws = Vec::new();
        for _ in 0..3 {
            raws.push(Raw {
                topic: "Sanitation",
                ..Raw::default()
            });
        }
        for _ in 0..5 {
            raws.push(Raw {
                topic: "Enforcement & Abandoned Vehicles",
                ..Raw::default()
            });
        }
        raws.push(Raw {
            topic: "Trees",
            ..Raw::default()
        });
        let records: Vec<ServiceRequest> = raws.iter().map(request).collect();

        let topics = by_topic(&records, &no_filter());
        assert_eq!(topics[0].full_label, "Enforcement & Abandoned Vehicles");
        assert_eq!(topics[0].count, 5);
        assert!(topics[0].label.ends_with('…'));
        assert_eq!(topics[1].full_label, "Sanitation");
        assert_eq!(topics[1].label, "Sanitation");
    }

    #[test]
    fn filter_constrains_every_aggregate() {
        let records: Vec<ServiceRequest> = [
            Raw {
                neighborhood: "Dorchester",
                ..Raw::default()
            },
            Raw {
                neighborhood: "Roxbury",
                ..Raw::default()
            },
        ]
        .iter()
        .map(request)
        .collect();

        let filter = RequestFilter {
            neighborhood: Some("Roxbury".to_string()),
            department: None,
        };
        let views = compute_views(&records, &filter);
        assert_eq!(views.total, 1);
        assert_eq!(views.by_neighborhood.len(), 1);
        assert_eq!(views.by_neighborhood[0].full_label, "Roxbury");
    }

    #[test]
    fn average_resolution_is_not_available_without_closures() {
        let records = vec![request(&Raw::default())];
        let summary = average_resolution(&records, &no_filter());
        assert_eq!(summary.average_days, None);
        assert_eq!(summary.to_string(), "N/A");
    }

    #[test]
    fn average_resolution_means_present_durations() {
        let records: Vec<ServiceRequest> = [
            Raw {
                days_to_close: Some(2.0),
                ..Raw::default()
            },
            Raw {
                days_to_close: Some(4.0),
                ..Raw::default()
            },
            Raw {
                days_to_close: None,
                ..Raw::default()
            },
        ]
        .iter()
        .map(request)
        .collect();

        let summary = average_resolution(&records, &no_filter());
        assert!((summary.average_days.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn on_time_rate_ignores_unflagged_records() {
        let records: Vec<ServiceRequest> = [
            Raw {
                on_time: Some(ON_TIME),
                ..Raw::default()
            },
            Raw {
                on_time: Some(ON_TIME),
                ..Raw::default()
            },
            Raw {
                on_time: Some(OVERDUE),
                ..Raw::default()
            },
            Raw {
                on_time: None,
                ..Raw::default()
            },
        ]
        .iter()
        .map(request)
        .collect();

        let rate = on_time_rate(&records, &no_filter());
        assert!((rate.percent.unwrap() - 200.0 / 3.0).abs() < 1e-9);

        let unflagged = vec![request(&Raw::default())];
        assert_eq!(on_time_rate(&unflagged, &no_filter()).percent, None);
    }

    #[test]
    fn small_sample_topics_are_suppressed() {
        let mut raws = Vec::new();
        for _ in 0..3 {
            raws.push(Raw {
                topic: "Sanitation",
                days_to_close: Some(10.0),
                ..Raw::default()
            });
        }
        for _ in 0..2 {
            raws.push(Raw {
                topic: "Trees",
                days_to_close: Some(50.0),
                ..Raw::default()
            });
        }
        let records: Vec<ServiceRequest> = raws.iter().map(request).collect();

        let ranked = resolution_by_topic(&records, &no_filter());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].topic, "Sanitation");
        assert!(ranked.iter().all(|t| t.samples >= MIN_TOPIC_SAMPLES));
    }

    #[test]
    fn histograms_have_fixed_bucket_counts() {
        let records: Vec<ServiceRequest> = [
            Raw {
                hour: Some(9),
                weekday: Some(1),
                ..Raw::default()
            },
            Raw {
                hour: Some(9),
                weekday: Some(6),
                ..Raw::default()
            },
            Raw {
                hour: None,
                weekday: None,
                ..Raw::default()
            },
        ]
        .iter()
        .map(request)
        .collect();

        let hourly = hourly_distribution(&records, &no_filter());
        assert_eq!(hourly.counts.len(), 24);
        assert_eq!(hourly.counts[9], 2);
        assert_eq!(hourly.counts.iter().sum::<u64>(), 2);

        let weekday = weekday_distribution(&records, &no_filter());
        assert_eq!(weekday.counts[1], 1);
        assert_eq!(weekday.counts[6], 1);
    }

    #[test]
    fn source_breakdown_is_unbounded() {
        let records: Vec<ServiceRequest> = (0..20)
            .map(|i| {
                let mut r = request(&Raw::default());
                r.source = format!("Source {i:02}");
                r
            })
            .collect();

        assert_eq!(by_source(&records, &no_filter()).len(), 20);
    }
}
