#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dashboard session state: the pull-based query surface the
//! presentation layer reads.
//!
//! Holds the current record snapshot, the active filter, the computed
//! aggregate views, and the map layer (plotted points, projected
//! positions, hover state). Everything recomputes wholesale when its
//! inputs change; consumers only ever see complete snapshots, never
//! partial updates.

use std::collections::BTreeSet;
use std::sync::Arc;

use boston311_analytics::compute_views;
use boston311_analytics_models::AggregateViews;
use boston311_geo::palette::{ColorMode, Palette};
use boston311_geo::{PlotPoint, RenderProjection, nearest_within, plottable_points};
use boston311_request_models::{RequestFilter, ServiceRequest};
use boston311_source::registry::MapConfig;

/// The dashboard session.
///
/// Charts read [`views`](Self::views); the map reads
/// [`points`](Self::points)/[`positions`](Self::positions) and drives
/// hover through [`hover`](Self::hover).
pub struct Dashboard {
    map: MapConfig,
    projection: RenderProjection,
    color_mode: ColorMode,
    palette: Palette,
    records: Arc<Vec<ServiceRequest>>,
    filter: RequestFilter,
    views: AggregateViews,
    points: Vec<PlotPoint>,
    positions: Vec<(f64, f64)>,
    hovered: Option<usize>,
}

impl Dashboard {
    /// Creates an empty session for the given map configuration,
    /// defaulting to planar rendering on the configured canvas.
    #[must_use]
    pub fn new(map: MapConfig) -> Self {
        let projection = RenderProjection::Planar { canvas: map.canvas };
        let records: Arc<Vec<ServiceRequest>> = Arc::new(Vec::new());
        let filter = RequestFilter::all();
        let views = compute_views(&records, &filter);

        Self {
            map,
            projection,
            color_mode: ColorMode::default(),
            palette: Palette::for_mode(ColorMode::default()),
            records,
            filter,
            views,
            points: Vec::new(),
            positions: Vec::new(),
            hovered: None,
        }
    }

    /// Replaces the record snapshot (after a successful load) and
    /// recomputes every derived view.
    pub fn set_records(&mut self, records: Arc<Vec<ServiceRequest>>) {
        self.records = records;
        self.recompute_views();
        self.recompute_map();
    }

    /// The current record snapshot.
    #[must_use]
    pub fn records(&self) -> &Arc<Vec<ServiceRequest>> {
        &self.records
    }

    /// Updates the active filter and recomputes the aggregate views.
    pub fn set_filter(&mut self, filter: RequestFilter) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        self.recompute_views();
    }

    /// The active filter.
    #[must_use]
    pub const fn filter(&self) -> &RequestFilter {
        &self.filter
    }

    /// The current aggregate views snapshot.
    #[must_use]
    pub const fn views(&self) -> &AggregateViews {
        &self.views
    }

    /// Distinct neighborhood names, sorted, for the filter dropdown.
    #[must_use]
    pub fn neighborhoods(&self) -> Vec<String> {
        self.distinct(|r| r.neighborhood.as_str())
    }

    /// Distinct department names, sorted, for the filter dropdown.
    #[must_use]
    pub fn departments(&self) -> Vec<String> {
        self.distinct(|r| r.department.as_str())
    }

    /// Switches the rendering strategy (planar canvas or tiles) and
    /// reprojects the plotted points.
    pub fn set_projection(&mut self, projection: RenderProjection) {
        self.projection = projection;
        self.recompute_map();
    }

    /// Switches the categorical field driving point colors.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
        self.palette = Palette::for_mode(mode);
    }

    /// The color for one plotted point under the active color mode.
    #[must_use]
    pub fn color_of(&self, point: &PlotPoint) -> &str {
        let record = &self.records[point.index];
        let category = match self.color_mode {
            ColorMode::Status => &record.status,
            ColorMode::Topic => &record.topic,
        };
        self.palette.color_for(category)
    }

    /// Points admitted to the map layer (stable first-N under the
    /// configured cap).
    #[must_use]
    pub fn points(&self) -> &[PlotPoint] {
        &self.points
    }

    /// Projected positions, parallel to [`points`](Self::points).
    #[must_use]
    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }

    /// Resolves a pointer position to the nearest plotted record within
    /// the configured hover radius, updating hover state. Beyond the
    /// radius the hover clears.
    pub fn hover(&mut self, x: f64, y: f64) -> Option<&ServiceRequest> {
        self.hovered = nearest_within(&self.positions, x, y, self.map.hover_radius_px);
        self.hovered_record()
    }

    /// Clears hover state.
    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// The currently hovered record, if any.
    #[must_use]
    pub fn hovered_record(&self) -> Option<&ServiceRequest> {
        self.hovered
            .and_then(|i| self.points.get(i))
            .map(|point| &self.records[point.index])
    }

    fn recompute_views(&mut self) {
        self.views = compute_views(&self.records, &self.filter);
    }

    fn recompute_map(&mut self) {
        self.points = plottable_points(&self.records, &self.map.bounds, self.map.max_points);
        self.positions = self.projection.positions(&self.map.bounds, &self.points);
        self.hovered = None;
        log::debug!("Map layer rebuilt with {} points", self.points.len());
    }

    fn distinct<F>(&self, key: F) -> Vec<String>
    where
        F: Fn(&ServiceRequest) -> &str,
    {
        let set: BTreeSet<&str> = self.records.iter().map(|r| key(r)).collect();
        set.into_iter().map(str::to_owned).collect()
    }
}
