//! Dataset registry — the embedded TOML dataset definition.
//!
//! Everything deployment-specific about a dataset (endpoints, resource
//! id, page size, hard caps, politeness delay, map bounding box, render
//! point cap) lives in a TOML file baked into the binary at compile time
//! via [`include_str!`]. Pointing the dashboard at a different city is a
//! config edit, not a code change.

use boston311_geo::{BoundingBox, CanvasSize};
use serde::Deserialize;

/// The Boston 311 dataset config, embedded at compile time.
const BOSTON_311_TOML: &str = include_str!("../datasets/boston_311.toml");

/// A complete dataset definition: where the data lives and how the map
/// layer is configured for it.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"boston_311"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The static CSV snapshot resource.
    pub snapshot: SnapshotConfig,
    /// The paginated datastore API fallback.
    pub datastore: DatastoreConfig,
    /// Map rendering configuration.
    pub map: MapConfig,
}

/// Where the CSV snapshot and its companion metadata live.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// URL of the CSV snapshot.
    pub csv_url: String,
    /// URL of the companion metadata JSON. Optional; failures to read it
    /// are always non-fatal.
    #[serde(default)]
    pub metadata_url: Option<String>,
    /// Compression format: `"gzip"` or omitted for plain text.
    #[serde(default)]
    pub compressed: Option<String>,
    /// Hard cap on decoded records.
    #[serde(default = "default_max_records")]
    pub max_records: u64,
}

/// How to page through the CKAN `datastore_search` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DatastoreConfig {
    /// Base API URL.
    pub api_url: String,
    /// CKAN resource ID for the dataset.
    pub resource_id: String,
    /// Records per page.
    pub page_size: u64,
    /// Hard cap on fetched records, independent of the server total.
    #[serde(default = "default_max_records")]
    pub max_records: u64,
    /// Delay between page fetches in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// Map layer configuration for this deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Geographic rectangle admitting points onto the map.
    pub bounds: BoundingBox,
    /// Render cap: at most this many points are plotted, stable first-N.
    pub max_points: usize,
    /// Hover hit-test radius in canvas pixels.
    pub hover_radius_px: f64,
    /// Canvas dimensions for planar (non-tile) rendering.
    pub canvas: CanvasSize,
}

const fn default_max_records() -> u64 {
    50_000
}

const fn default_delay_ms() -> u64 {
    500
}

/// Parses a dataset definition from TOML text.
///
/// # Errors
///
/// Returns a `toml` deserialization error when the config is malformed.
pub fn parse_dataset_toml(text: &str) -> Result<DatasetDefinition, toml::de::Error> {
    toml::from_str(text)
}

/// Returns the embedded Boston 311 dataset definition.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (a compile-time guarantee,
/// since the config is baked into the binary).
#[must_use]
pub fn boston_311() -> DatasetDefinition {
    parse_dataset_toml(BOSTON_311_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse boston_311.toml: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_dataset_parses() {
        let dataset = boston_311();
        assert_eq!(dataset.id, "boston_311");
        assert!(!dataset.name.is_empty());
    }

    #[test]
    fn datastore_config_has_sane_paging() {
        let dataset = boston_311();
        assert!(dataset.datastore.page_size > 0);
        assert!(dataset.datastore.max_records >= dataset.datastore.page_size);
        assert!(!dataset.datastore.resource_id.is_empty());
    }

    #[test]
    fn map_bounds_are_ordered() {
        let map = boston_311().map;
        assert!(map.bounds.min_lat < map.bounds.max_lat);
        assert!(map.bounds.min_lng < map.bounds.max_lng);
        assert!(map.max_points > 0);
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let dataset = parse_dataset_toml(
            r#"
            id = "test"
            name = "Test"

            [snapshot]
            csv_url = "https://example.org/data.csv"

            [datastore]
            api_url = "https://example.org/api"
            resource_id = "abc"
            page_size = 100

            [map]
            max_points = 2000
            hover_radius_px = 10.0
            bounds = { min_lat = 0.0, max_lat = 1.0, min_lng = 0.0, max_lng = 1.0 }
            canvas = { width = 800.0, height = 600.0 }
            "#,
        )
        .unwrap();
        assert_eq!(dataset.snapshot.max_records, 50_000);
        assert_eq!(dataset.datastore.delay_ms, 500);
        assert!(dataset.snapshot.metadata_url.is_none());
    }
}
