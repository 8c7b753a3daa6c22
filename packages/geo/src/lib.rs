#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geographic filtering, projection, and hit-testing for the request map.
//!
//! Admits records into the map layer via a configured [`BoundingBox`],
//! projects coordinates onto a pixel canvas for planar rendering (tile
//! renderers receive raw coordinates instead), and resolves pointer
//! positions to the nearest plotted record for hover tooltips.
//!
//! Everything here is pure computation over immutable snapshots; callers
//! may recompute freely whenever the record set or filter changes.

pub mod palette;

use boston311_request_models::ServiceRequest;
use serde::{Deserialize, Serialize};

/// A geographic rectangle used to admit or reject points for map display.
///
/// Deployments use slightly different boxes, so this is configuration
/// (part of the embedded dataset definition), never a hardcoded constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Returns `true` when the point lies strictly inside the box.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat > self.min_lat && lat < self.max_lat && lng > self.min_lng && lng < self.max_lng
    }
}

/// Pixel dimensions of the planar rendering canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Canvas width in pixels.
    pub width: f64,
    /// Canvas height in pixels.
    pub height: f64,
}

/// A record admitted to the map layer.
///
/// `index` points back into the record slice the point was produced from,
/// so consumers can resolve the full [`ServiceRequest`] for tooltips.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    /// Index of the source record in the input slice.
    pub index: usize,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
}

/// Filters records to those plottable inside `bounds`, capped at
/// `max_points`.
///
/// A record qualifies only when both coordinates are present and fall
/// strictly within the box. The cap is a rendering-performance bound, not
/// a sampling strategy: truncation is stable "first N" in input order.
#[must_use]
pub fn plottable_points(
    records: &[ServiceRequest],
    bounds: &BoundingBox,
    max_points: usize,
) -> Vec<PlotPoint> {
    let mut points = Vec::new();
    let mut admitted: usize = 0;

    for (index, record) in records.iter().enumerate() {
        let (Some(lat), Some(lng)) = (record.lat, record.lng) else {
            continue;
        };
        if !bounds.contains(lat, lng) {
            continue;
        }
        admitted += 1;
        if points.len() < max_points {
            points.push(PlotPoint { index, lat, lng });
        }
    }

    if admitted > points.len() {
        log::debug!(
            "Map layer capped at {} of {admitted} in-bounds points",
            points.len()
        );
    }

    points
}

/// How plotted points are positioned for the active rendering technology.
///
/// The drawing backend (canvas, SVG, tiles) is decided once and swapped
/// behind this strategy; the rest of the pipeline never branches on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderProjection {
    /// Linear lat/lng projection onto a fixed pixel canvas.
    Planar {
        /// Target canvas dimensions.
        canvas: CanvasSize,
    },
    /// Tile-based rendering: coordinates pass through untransformed and
    /// the tile library performs its own projection.
    Tiles,
}

impl RenderProjection {
    /// Positions a coordinate pair for rendering.
    ///
    /// Planar mode returns canvas `(x, y)` pixels with the y axis
    /// inverted, since latitude increases northward while canvas rows
    /// increase downward. Tile mode returns raw `(lng, lat)`.
    #[must_use]
    pub fn position(&self, bounds: &BoundingBox, lat: f64, lng: f64) -> (f64, f64) {
        match self {
            Self::Planar { canvas } => {
                let x = (lng - bounds.min_lng) / (bounds.max_lng - bounds.min_lng) * canvas.width;
                let y = canvas.height
                    - (lat - bounds.min_lat) / (bounds.max_lat - bounds.min_lat) * canvas.height;
                (x, y)
            }
            Self::Tiles => (lng, lat),
        }
    }

    /// Positions every plot point, preserving order.
    #[must_use]
    pub fn positions(&self, bounds: &BoundingBox, points: &[PlotPoint]) -> Vec<(f64, f64)> {
        points
            .iter()
            .map(|p| self.position(bounds, p.lat, p.lng))
            .collect()
    }
}

/// Resolves a pointer position to the nearest plotted point within
/// `radius` pixels.
///
/// Returns the index into `positions` of the nearest qualifying point, or
/// `None` when every point is farther than the radius (hover clears).
/// Ties resolve to the earliest point, keeping hover stable.
#[must_use]
pub fn nearest_within(
    positions: &[(f64, f64)],
    pointer_x: f64,
    pointer_y: f64,
    radius: f64,
) -> Option<usize> {
    let radius_sq = radius * radius;
    let mut best: Option<(usize, f64)> = None;

    for (i, &(x, y)) in positions.iter().enumerate() {
        let dx = x - pointer_x;
        let dy = y - pointer_y;
        let dist_sq = dx.mul_add(dx, dy * dy);
        if dist_sq > radius_sq {
            continue;
        }
        match best {
            Some((_, best_sq)) if dist_sq >= best_sq => {}
            _ => best = Some((i, dist_sq)),
        }
    }

    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boston_box() -> BoundingBox {
        BoundingBox {
            min_lat: 42.2,
            max_lat: 42.4,
            min_lng: -71.2,
            max_lng: -70.9,
        }
    }

    fn located(id: &str, lat: Option<f64>, lng: Option<f64>) -> ServiceRequest {
        ServiceRequest {
            id: id.to_string(),
            topic: "Street Cleaning".to_string(),
            service: "Requests for Street Cleaning".to_string(),
            department: "PWDx".to_string(),
            team: "District 3".to_string(),
            status: "Open".to_string(),
            source: "Constituent Call".to_string(),
            neighborhood: "Dorchester".to_string(),
            closure_reason: None,
            on_time: None,
            zip_code: String::new(),
            address: String::new(),
            opened_at: None,
            closed_at: None,
            target_closed_at: None,
            month: None,
            year: None,
            day: None,
            weekday: None,
            hour: None,
            days_to_close: None,
            lat,
            lng,
        }
    }

    #[test]
    fn excludes_missing_and_out_of_box_coordinates() {
        let records = vec![
            located("1", Some(42.35), Some(-71.05)),
            located("2", None, None),
            located("3", Some(99.0), Some(99.0)),
            located("4", Some(42.30), None),
        ];

        let points = plottable_points(&records, &boston_box(), 2000);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, 0);
    }

    #[test]
    fn containment_is_strict() {
        let bounds = boston_box();
        assert!(!bounds.contains(42.2, -71.0));
        assert!(!bounds.contains(42.3, -70.9));
        assert!(bounds.contains(42.3, -71.0));
    }

    #[test]
    fn cap_keeps_first_n_in_input_order() {
        let records: Vec<ServiceRequest> = (0..10)
            .map(|i| located(&i.to_string(), Some(42.3), Some(-71.0)))
            .collect();

        let points = plottable_points(&records, &boston_box(), 3);
        let indexes: Vec<usize> = points.iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn planar_projection_inverts_y() {
        let bounds = boston_box();
        let projection = RenderProjection::Planar {
            canvas: CanvasSize {
                width: 600.0,
                height: 400.0,
            },
        };

        // Southwest corner maps to the bottom-left of the canvas.
        let (x, y) = projection.position(&bounds, 42.2, -71.2);
        assert!((x - 0.0).abs() < 1e-9);
        assert!((y - 400.0).abs() < 1e-9);

        // Northeast corner maps to the top-right.
        let (x, y) = projection.position(&bounds, 42.4, -70.9);
        assert!((x - 600.0).abs() < 1e-9);
        assert!((y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn tile_projection_passes_coordinates_through() {
        let (x, y) = RenderProjection::Tiles.position(&boston_box(), 42.35, -71.05);
        assert!((x - -71.05).abs() < f64::EPSILON);
        assert!((y - 42.35).abs() < f64::EPSILON);
    }

    #[test]
    fn hover_picks_nearest_point_within_radius() {
        let positions = vec![(100.0, 100.0), (104.0, 103.0), (300.0, 300.0)];
        assert_eq!(nearest_within(&positions, 103.0, 103.0, 10.0), Some(1));
    }

    #[test]
    fn hover_clears_beyond_radius() {
        let positions = vec![(100.0, 100.0)];
        assert_eq!(nearest_within(&positions, 150.0, 100.0, 10.0), None);
    }

    #[test]
    fn hover_tie_resolves_to_earliest_point() {
        let positions = vec![(100.0, 100.0), (100.0, 100.0)];
        assert_eq!(nearest_within(&positions, 101.0, 100.0, 10.0), Some(0));
    }
}
