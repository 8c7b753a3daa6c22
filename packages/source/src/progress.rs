//! Progress reporting for the load pipeline.
//!
//! Fetchers report `(records_loaded, expected_total)` through a
//! [`ProgressCallback`] so the rendering choice (an `indicatif` bar, a
//! log line, or nothing at all) stays out of this crate. Implementations
//! live upstream in crates that pick a rendering strategy.

use std::sync::Arc;

/// Trait for reporting load progress.
///
/// Implementations must be `Send + Sync`; callbacks are shared across
/// async tasks behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Set the expected total once it becomes known (e.g. from the
    /// server-reported record count).
    fn set_total(&self, total: u64);

    /// Set the absolute number of records loaded so far.
    fn set_position(&self, loaded: u64);

    /// Advance by `delta` records.
    fn inc(&self, delta: u64);

    /// Update the message shown alongside the indicator.
    fn set_message(&self, msg: String);

    /// Mark the load finished with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
///
/// Used by tests and callers that do not render progress.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _loaded: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
