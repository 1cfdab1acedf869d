//! Exact coverage by intersecting each polygon with the voxel footprint.

use geo::{Area, Coord, Polygon, Rect};
use geo_clipper::Clipper;

use dose_common::IndexBounds;

use super::CoverageEstimator;
use crate::topology::SlicePolygon;

/// Fixed-point scale for the integer clipper. Coordinates are in voxel
/// units, so this resolves 1e-9 of a voxel.
const CLIPPER_SCALE: f64 = 1e9;

/// Coverage as the exact area of footprint ∩ polygon. Holes are part of
/// the polygon and never count as covered.
///
/// Overlapping polygons (lenient mode only) add up; the engine clamps the
/// resulting fraction to 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClippingCoverage;

fn footprint(cell: &IndexBounds) -> Polygon<f64> {
    Rect::new(
        Coord {
            x: cell.min_x,
            y: cell.min_y,
        },
        Coord {
            x: cell.max_x,
            y: cell.max_y,
        },
    )
    .to_polygon()
}

impl CoverageEstimator for ClippingCoverage {
    fn name(&self) -> &'static str {
        "clipping"
    }

    fn covered_area(&self, polygons: &[SlicePolygon], cell: &IndexBounds) -> f64 {
        let voxel = footprint(cell);
        polygons
            .iter()
            .filter(|p| p.bounds().map_or(false, |b| b.intersects(cell)))
            .map(|p| p.shape().intersection(&voxel, CLIPPER_SCALE).unsigned_area())
            .sum()
    }
}
