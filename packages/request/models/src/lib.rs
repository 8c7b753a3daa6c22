#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical normalized service request record and shared filter types.
//!
//! Every data source (CSV snapshot, CKAN datastore API) produces
//! [`ServiceRequest`] records after normalization. Aggregation and map
//! rendering only ever see this shape, never raw source fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Sentinel for categorical fields whose source value is absent or empty.
pub const UNKNOWN: &str = "Unknown";

/// Status value counted as resolved in monthly volume buckets.
pub const STATUS_CLOSED: &str = "Closed";

/// `on_time` value for requests closed within their target window.
pub const ON_TIME: &str = "ONTIME";

/// `on_time` value for requests that blew their target window.
pub const OVERDUE: &str = "OVERDUE";

/// Three-letter month abbreviations, indexed by zero-based month.
pub const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Which source the current record set was loaded from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LoadedFrom {
    /// The static CSV snapshot resource.
    Snapshot,
    /// The paginated CKAN datastore API fallback.
    Api,
}

/// A 311 service request normalized to the canonical schema.
///
/// Categorical fields are never empty; absent source values become
/// [`UNKNOWN`]. Date-derived fields are all `None` together when the open
/// timestamp is missing or unparseable. Coordinates are `None` (never zero)
/// when missing or unparseable; such records still participate in every
/// non-geographic aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    /// Case identifier from the source. A display key, not guaranteed
    /// unique across sources.
    pub id: String,
    /// Case topic (e.g., "Street Cleaning").
    pub topic: String,
    /// Specific service name within the topic.
    pub service: String,
    /// Department the case is assigned to.
    pub department: String,
    /// Team within the department.
    pub team: String,
    /// Case status (e.g., "Open", "Closed").
    pub status: String,
    /// How the request was reported (e.g., "Citizens Connect App").
    pub source: String,
    /// Neighborhood name.
    pub neighborhood: String,
    /// Reason the case was closed. Absent while the case is open.
    pub closure_reason: Option<String>,
    /// [`ON_TIME`]/[`OVERDUE`] flag. Absent when the source lacks it.
    pub on_time: Option<String>,
    /// ZIP code, empty string when absent.
    pub zip_code: String,
    /// Full street address, empty string when absent.
    pub address: String,
    /// When the request was opened. `None` if missing or unparseable.
    pub opened_at: Option<DateTime<Utc>>,
    /// When the request was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// The target close date the department committed to.
    pub target_closed_at: Option<DateTime<Utc>>,
    /// Zero-based calendar month (0 = January) of `opened_at`.
    pub month: Option<u32>,
    /// Calendar year of `opened_at`.
    pub year: Option<i32>,
    /// Day of month of `opened_at`.
    pub day: Option<u32>,
    /// Day of week of `opened_at`, 0 = Sunday.
    pub weekday: Option<u32>,
    /// Hour of day (0-23) of `opened_at`.
    pub hour: Option<u32>,
    /// Days between open and close, clamped to be non-negative. `None`
    /// when either timestamp is missing.
    pub days_to_close: Option<f64>,
    /// Latitude (WGS84). `None` when missing or unparseable, never zero.
    pub lat: Option<f64>,
    /// Longitude (WGS84). `None` when missing or unparseable, never zero.
    pub lng: Option<f64>,
}

impl ServiceRequest {
    /// Three-letter abbreviation of the open month, or `"?"` when the
    /// open date did not parse.
    #[must_use]
    pub fn month_name(&self) -> &'static str {
        self.month
            .and_then(|m| MONTH_ABBREV.get(m as usize).copied())
            .unwrap_or("?")
    }

    /// Whether both coordinates are present.
    #[must_use]
    pub const fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

/// The active dashboard filter. `None` in a field means "All".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    /// Restrict to a single neighborhood by exact name.
    pub neighborhood: Option<String>,
    /// Restrict to a single department by exact name.
    pub department: Option<String>,
}

impl RequestFilter {
    /// A filter with no constraints.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            neighborhood: None,
            department: None,
        }
    }

    /// Returns `true` when the record passes every active constraint.
    #[must_use]
    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.neighborhood
            .as_deref()
            .is_none_or(|n| request.neighborhood == n)
            && self
                .department
                .as_deref()
                .is_none_or(|d| request.department == d)
    }

    /// Returns `true` when no constraint is active.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.neighborhood.is_none() && self.department.is_none()
    }
}
