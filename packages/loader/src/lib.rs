#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Two-stage data loader for the 311 dashboard.
//!
//! Tries the static CSV snapshot first; if it is unreadable or holds no
//! data rows, silently falls back to the paginated datastore API. Only a
//! fallback failure is user-visible, as a terminal [`LoadState::Failed`]
//! with a human-readable message and an idempotent [`Loader::retry`].
//!
//! One load cycle may be in flight at a time in practice, but the loader
//! tolerates overlap: each load takes a generation number and results
//! are committed only while their generation is still current, so a
//! stale in-flight load can never overwrite fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use boston311_request_models::{LoadedFrom, ServiceRequest};
use boston311_source::ckan::DatastoreSource;
use boston311_source::csv::SnapshotSource;
use boston311_source::progress::ProgressCallback;
use boston311_source::registry::DatasetDefinition;
use boston311_source::{FetchOptions, RequestSource, SourceError, normalize};

/// Where the loader currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// No load attempted yet.
    Idle,
    /// A load is in flight against the given source.
    Loading {
        /// Which source is being read.
        source: LoadedFrom,
    },
    /// A full normalized record set is available.
    Ready {
        /// Which source produced the records.
        source: LoadedFrom,
        /// Number of normalized records.
        count: usize,
        /// Snapshot production timestamp, when the companion metadata
        /// document was readable.
        last_updated: Option<String>,
    },
    /// Both stages failed.
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

impl LoadState {
    /// Returns `true` when a record set is available.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// The source the current record set was loaded from, if any.
    #[must_use]
    pub const fn data_source(&self) -> Option<LoadedFrom> {
        match self {
            Self::Ready { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Forwards progress updates while mirroring the `(loaded, total)` pair
/// into shared state the dashboard can poll.
struct TrackingProgress {
    pair: Arc<Mutex<(u64, Option<u64>)>>,
    inner: Arc<dyn ProgressCallback>,
}

impl ProgressCallback for TrackingProgress {
    fn set_total(&self, total: u64) {
        if let Ok(mut pair) = self.pair.lock() {
            pair.1 = Some(total);
        }
        self.inner.set_total(total);
    }

    fn set_position(&self, loaded: u64) {
        if let Ok(mut pair) = self.pair.lock() {
            pair.0 = loaded;
        }
        self.inner.set_position(loaded);
    }

    fn inc(&self, delta: u64) {
        if let Ok(mut pair) = self.pair.lock() {
            pair.0 += delta;
        }
        self.inner.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.inner.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.inner.finish(msg);
    }
}

/// The two-stage loader.
pub struct Loader {
    snapshot: Arc<dyn RequestSource>,
    fallback: Arc<dyn RequestSource>,
    state: Mutex<LoadState>,
    records: Mutex<Arc<Vec<ServiceRequest>>>,
    progress_pair: Arc<Mutex<(u64, Option<u64>)>>,
    generation: AtomicU64,
}

impl Loader {
    /// Builds a loader for the given dataset definition.
    #[must_use]
    pub fn new(dataset: &DatasetDefinition) -> Self {
        Self::with_sources(
            Arc::new(SnapshotSource::new(dataset.snapshot.clone())),
            Arc::new(DatastoreSource::new(dataset.datastore.clone())),
        )
    }

    /// Builds a loader over explicit sources. Tests use this to
    /// substitute in-memory stubs for the HTTP-backed implementations.
    #[must_use]
    pub fn with_sources(
        snapshot: Arc<dyn RequestSource>,
        fallback: Arc<dyn RequestSource>,
    ) -> Self {
        Self {
            snapshot,
            fallback,
            state: Mutex::new(LoadState::Idle),
            records: Mutex::new(Arc::new(Vec::new())),
            progress_pair: Arc::new(Mutex::new((0, None))),
            generation: AtomicU64::new(0),
        }
    }

    /// Current loader state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state
            .lock()
            .map_or(LoadState::Idle, |state| state.clone())
    }

    /// Current `(loaded, total)` progress pair. During snapshot mode
    /// this holds an indeterminate midpoint, since true per-row progress
    /// is unavailable for a single-file download.
    #[must_use]
    pub fn progress(&self) -> (u64, Option<u64>) {
        self.progress_pair.lock().map_or((0, None), |pair| *pair)
    }

    /// The current record snapshot. Replaced atomically (from the
    /// consumer's perspective) on each successful load.
    #[must_use]
    pub fn records(&self) -> Arc<Vec<ServiceRequest>> {
        self.records
            .lock()
            .map_or_else(|_| Arc::new(Vec::new()), |records| Arc::clone(&records))
    }

    /// Runs the two-stage load. Returns the terminal state.
    pub async fn load(
        &self,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> LoadState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let tracking: Arc<dyn ProgressCallback> = Arc::new(TrackingProgress {
            pair: Arc::clone(&self.progress_pair),
            inner: Arc::clone(progress),
        });

        self.set_state_if_current(
            generation,
            LoadState::Loading {
                source: LoadedFrom::Snapshot,
            },
        );
        // Indeterminate midpoint while the snapshot downloads; the real
        // count is unknown until the whole file is decoded.
        tracking.set_total(2);
        tracking.set_position(1);

        match self.try_snapshot(options, &tracking).await {
            Ok((records, last_updated)) => {
                self.commit(generation, LoadedFrom::Snapshot, records, last_updated)
            }
            Err(snapshot_err) => {
                log::info!("Snapshot unavailable ({snapshot_err}); falling back to datastore API");
                self.set_state_if_current(
                    generation,
                    LoadState::Loading {
                        source: LoadedFrom::Api,
                    },
                );
                tracking.set_position(0);

                match self.fallback.fetch(options, &tracking).await {
                    Ok(raw) => {
                        let records = normalize::normalize_all(&raw);
                        self.commit(generation, LoadedFrom::Api, records, None)
                    }
                    Err(fallback_err) => self.fail(generation, &fallback_err),
                }
            }
        }
    }

    /// Re-runs the full two-stage load from the beginning. Safe to call
    /// from a `Failed` (or any other) state.
    pub async fn retry(
        &self,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> LoadState {
        self.load(options, progress).await
    }

    async fn try_snapshot(
        &self,
        options: &FetchOptions,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<(Vec<ServiceRequest>, Option<String>), SourceError> {
        let raw = self.snapshot.fetch(options, progress).await?;
        let records = normalize::normalize_all(&raw);

        // The companion metadata is a nicety; ignore every failure.
        let last_updated = self
            .snapshot
            .metadata()
            .await
            .and_then(|metadata| metadata.last_updated);

        Ok((records, last_updated))
    }

    fn commit(
        &self,
        generation: u64,
        source: LoadedFrom,
        records: Vec<ServiceRequest>,
        last_updated: Option<String>,
    ) -> LoadState {
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Discarding stale load result from generation {generation}");
            return self.state();
        }

        let count = records.len();
        if let Ok(mut slot) = self.records.lock() {
            *slot = Arc::new(records);
        }

        let state = LoadState::Ready {
            source,
            count,
            last_updated,
        };
        self.set_state_if_current(generation, state.clone());
        log::info!("Load complete: {count} records from {source}");
        state
    }

    fn fail(&self, generation: u64, error: &SourceError) -> LoadState {
        let state = LoadState::Failed {
            message: format!("Unable to load service requests: {error}"),
        };
        self.set_state_if_current(generation, state.clone());
        log::error!("Load failed: {error}");
        state
    }

    fn set_state_if_current(&self, generation: u64, state: LoadState) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if let Ok(mut slot) = self.state.lock() {
            *slot = state;
        }
    }
}
