#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Data source fetching and normalization for the 311 dashboard.
//!
//! Two sources produce raw records: the static CSV snapshot
//! ([`csv::SnapshotSource`]) and the paginated CKAN datastore API
//! ([`ckan::DatastoreSource`]). Both yield rows as [`serde_json::Value`]
//! objects that [`normalize`] maps into the canonical
//! [`boston311_request_models::ServiceRequest`] shape.

pub mod ckan;
pub mod csv;
pub mod normalize;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::progress::ProgressCallback;

/// User agent sent with every outbound request, identifying the
/// dashboard to the open-data portal.
pub const USER_AGENT: &str = "Boston311-Dashboard/1.0";

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The API reported a failure in its response body.
    #[error("API reported failure: {message}")]
    Api {
        /// Description of what the API reported.
        message: String,
    },

    /// The CSV snapshot was readable but held no data rows. Treated as a
    /// fallback trigger by the loader, not a terminal error.
    #[error("snapshot contains no data rows")]
    EmptySnapshot,
}

/// Configuration for a fetch operation.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Maximum number of records to fetch, overriding the dataset's
    /// configured hard cap when smaller.
    pub limit: Option<u64>,
}

/// The companion metadata document published next to the CSV snapshot.
///
/// Every field is optional; the loader treats any read failure as
/// non-fatal and simply carries on without a timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetMetadata {
    /// When the snapshot was produced (ISO 8601).
    #[serde(default)]
    pub last_updated: Option<String>,
    /// Record count the snapshot was produced from.
    #[serde(default)]
    pub total_records: Option<u64>,
    /// CKAN resource the snapshot was fetched from.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Publishing portal name.
    #[serde(default)]
    pub source: Option<String>,
}

/// Trait for anything that can produce raw 311 records.
///
/// The loader orchestrates sources through this seam, which also lets
/// tests substitute in-memory stubs for the HTTP-backed implementations.
#[async_trait]
pub trait RequestSource: Send + Sync {
    /// Returns a short identifier for log messages (e.g. `"snapshot"`).
    fn id(&self) -> &str;

    /// Fetches all raw records this source can provide.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if fetching or decoding fails. An empty
    /// snapshot surfaces as [`SourceError::EmptySnapshot`].
    async fn fetch(
        &self,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Vec<serde_json::Value>, SourceError>;

    /// Fetches the companion metadata document, if this source has one.
    ///
    /// The default implementation returns `None`.
    async fn metadata(&self) -> Option<DatasetMetadata> {
        None
    }
}
