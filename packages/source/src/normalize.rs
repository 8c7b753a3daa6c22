//! Raw record normalization.
//!
//! Maps one raw record (a JSON object from either the CSV decoder or the
//! datastore API) into the canonical [`ServiceRequest`]. Normalization
//! never fails: malformed input degrades individual fields to
//! `None`/`"Unknown"` rather than rejecting the record.
//!
//! Sources disagree on field names (`lat` vs `latitude`, `open_date` vs
//! `open_dt`), so every lookup goes through an alias chain tried in
//! order, first non-empty value wins. New source schemas extend the
//! chains here, in one place.

use boston311_request_models::{ServiceRequest, UNKNOWN};
use chrono::{DateTime, Datelike as _, Timelike as _, Utc};

use crate::parsing::{parse_coordinate, parse_datetime};

const ID_FIELDS: &[&str] = &["case_id", "case_enquiry_id", "id", "_id"];
const TOPIC_FIELDS: &[&str] = &["case_topic", "subject"];
const SERVICE_FIELDS: &[&str] = &["service_name", "case_title"];
const DEPARTMENT_FIELDS: &[&str] = &["assigned_department", "department"];
const TEAM_FIELDS: &[&str] = &["assigned_team", "team"];
const STATUS_FIELDS: &[&str] = &["case_status", "status"];
const CLOSURE_REASON_FIELDS: &[&str] = &["closure_reason"];
const ON_TIME_FIELDS: &[&str] = &["on_time", "ontime"];
const SOURCE_FIELDS: &[&str] = &["report_source", "source"];
const NEIGHBORHOOD_FIELDS: &[&str] = &["neighborhood"];
const ZIP_FIELDS: &[&str] = &["zip_code", "location_zipcode"];
const ADDRESS_FIELDS: &[&str] = &["full_address", "address"];
const OPEN_DATE_FIELDS: &[&str] = &["open_date", "open_dt"];
const CLOSE_DATE_FIELDS: &[&str] = &["close_date", "closed_dt"];
const TARGET_DATE_FIELDS: &[&str] = &["target_close_date", "target_dt"];
const LAT_FIELDS: &[&str] = &["lat", "latitude"];
const LNG_FIELDS: &[&str] = &["lng", "longitude", "long"];

/// Seconds per day, for duration-to-days conversion.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Resolves the first alias with a non-empty string (or numeric) value.
fn field_str(record: &serde_json::Value, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        match record.get(*key) {
            Some(serde_json::Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_owned());
                }
            }
            Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Resolves the first alias that parses to a float. Empty, missing, and
/// non-numeric values yield `None`, never zero.
fn field_f64(record: &serde_json::Value, aliases: &[&str]) -> Option<f64> {
    for key in aliases {
        match record.get(*key) {
            Some(serde_json::Value::Number(n)) => {
                if let Some(value) = n.as_f64() {
                    return Some(value);
                }
            }
            Some(serde_json::Value::String(s)) => {
                if let Some(value) = parse_coordinate(s) {
                    return Some(value);
                }
            }
            _ => {}
        }
    }
    None
}

fn field_datetime(record: &serde_json::Value, aliases: &[&str]) -> Option<DateTime<Utc>> {
    field_str(record, aliases)
        .as_deref()
        .and_then(parse_datetime)
}

fn categorical(record: &serde_json::Value, aliases: &[&str]) -> String {
    field_str(record, aliases).unwrap_or_else(|| UNKNOWN.to_owned())
}

/// Normalizes one raw record. Returns the record plus whether its
/// resolution duration had to be clamped from a negative value.
fn normalize_inner(record: &serde_json::Value) -> (ServiceRequest, bool) {
    let opened_at = field_datetime(record, OPEN_DATE_FIELDS);
    let closed_at = field_datetime(record, CLOSE_DATE_FIELDS);
    let target_closed_at = field_datetime(record, TARGET_DATE_FIELDS);

    let (month, year, day, weekday, hour) = opened_at.map_or((None, None, None, None, None), |dt| {
        (
            Some(dt.month0()),
            Some(dt.year()),
            Some(dt.day()),
            Some(dt.weekday().num_days_from_sunday()),
            Some(dt.hour()),
        )
    });

    let mut clamped = false;
    let days_to_close = match (opened_at, closed_at) {
        (Some(opened), Some(closed)) => {
            #[allow(clippy::cast_precision_loss)]
            let days = (closed - opened).num_seconds() as f64 / SECONDS_PER_DAY;
            if days < 0.0 {
                clamped = true;
                Some(0.0)
            } else {
                Some(days)
            }
        }
        _ => None,
    };

    let request = ServiceRequest {
        id: field_str(record, ID_FIELDS).unwrap_or_default(),
        topic: categorical(record, TOPIC_FIELDS),
        service: categorical(record, SERVICE_FIELDS),
        department: categorical(record, DEPARTMENT_FIELDS),
        team: categorical(record, TEAM_FIELDS),
        status: categorical(record, STATUS_FIELDS),
        source: categorical(record, SOURCE_FIELDS),
        neighborhood: categorical(record, NEIGHBORHOOD_FIELDS),
        closure_reason: field_str(record, CLOSURE_REASON_FIELDS),
        on_time: field_str(record, ON_TIME_FIELDS),
        zip_code: field_str(record, ZIP_FIELDS).unwrap_or_default(),
        address: field_str(record, ADDRESS_FIELDS).unwrap_or_default(),
        opened_at,
        closed_at,
        target_closed_at,
        month,
        year,
        day,
        weekday,
        hour,
        days_to_close,
        lat: field_f64(record, LAT_FIELDS),
        lng: field_f64(record, LNG_FIELDS),
    };

    (request, clamped)
}

/// Normalizes one raw record into a [`ServiceRequest`].
#[must_use]
pub fn normalize_record(record: &serde_json::Value) -> ServiceRequest {
    normalize_inner(record).0
}

/// Normalizes a batch of raw records.
///
/// Records whose close timestamp precedes their open timestamp keep the
/// observed clamp-to-zero contract for `days_to_close`; the count of
/// clamped records is logged so the data-quality anomaly stays visible.
#[must_use]
pub fn normalize_all(records: &[serde_json::Value]) -> Vec<ServiceRequest> {
    let mut clamped_count: u64 = 0;

    let normalized = records
        .iter()
        .map(|record| {
            let (request, clamped) = normalize_inner(record);
            if clamped {
                clamped_count += 1;
            }
            request
        })
        .collect();

    if clamped_count > 0 {
        log::warn!(
            "{clamped_count} of {} records closed before they opened; durations clamped to 0",
            records.len()
        );
    }

    normalized
}
