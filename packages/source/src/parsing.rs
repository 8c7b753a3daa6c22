//! Shared parsing utilities for raw record fields.
//!
//! Date and coordinate parsing used by the normalizer. Both sources
//! (CSV snapshot, CKAN datastore) carry timestamps as ISO-8601-ish
//! strings and coordinates as either strings or numbers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parses a datastore datetime string.
///
/// Accepts ISO 8601 with a `T` separator (with or without fractional
/// seconds), the space-separated variant, and a bare date.
#[must_use]
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Parses a coordinate string, tolerating surrounding whitespace.
///
/// Empty or non-numeric input yields `None`, never zero.
#[must_use]
pub fn parse_coordinate(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_datetime_with_fractional() {
        let dt = parse_datetime("2024-01-15T14:30:00.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_iso_datetime_without_fractional() {
        let dt = parse_datetime("2024-01-15T14:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_space_separated_datetime() {
        let dt = parse_datetime("2024-01-15 14:30:00").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 14:30:00 UTC");
    }

    #[test]
    fn parses_bare_date_at_midnight() {
        let dt = parse_datetime("2024-01-15").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 00:00:00 UTC");
    }

    #[test]
    fn rejects_invalid_datetime() {
        assert!(parse_datetime("not-a-date").is_none());
        assert!(parse_datetime("").is_none());
    }

    #[test]
    fn parses_coordinate_with_whitespace() {
        let lat = parse_coordinate("  42.3601 ").unwrap();
        assert!((lat - 42.3601).abs() < f64::EPSILON);
    }

    #[test]
    fn coordinate_is_none_not_zero_when_unparseable() {
        assert!(parse_coordinate("").is_none());
        assert!(parse_coordinate("   ").is_none());
        assert!(parse_coordinate("null").is_none());
    }
}
