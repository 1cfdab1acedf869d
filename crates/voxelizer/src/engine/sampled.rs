//! Legacy coverage estimate by point sampling inside the voxel footprint.

use geo::{Contains, Coord};

use dose_common::IndexBounds;

use super::CoverageEstimator;
use crate::topology::SlicePolygon;

/// Coverage as the share of `resolution × resolution` sub-voxel sample
/// centres that fall inside any polygon of the slice.
///
/// A sample inside several overlapping polygons counts once. Boundary
/// voxels are only approximated; the error shrinks with the resolution.
#[derive(Debug, Clone, Copy)]
pub struct SampledCoverage {
    resolution: usize,
}

impl SampledCoverage {
    /// Create an estimator with `resolution` samples per voxel edge.
    /// A resolution of zero is treated as one.
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution: resolution.max(1),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }
}

impl Default for SampledCoverage {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CoverageEstimator for SampledCoverage {
    fn name(&self) -> &'static str {
        "sampled"
    }

    fn covered_area(&self, polygons: &[SlicePolygon], cell: &IndexBounds) -> f64 {
        let candidates: Vec<&SlicePolygon> = polygons
            .iter()
            .filter(|p| p.bounds().map_or(false, |b| b.intersects(cell)))
            .collect();
        if candidates.is_empty() {
            return 0.0;
        }

        let n = self.resolution;
        let step_x = cell.width() / n as f64;
        let step_y = cell.height() / n as f64;

        let mut hits = 0usize;
        for j in 0..n {
            let y = cell.min_y + (j as f64 + 0.5) * step_y;
            for i in 0..n {
                let sample = Coord {
                    x: cell.min_x + (i as f64 + 0.5) * step_x,
                    y,
                };
                if candidates.iter().any(|p| p.shape().contains(&sample)) {
                    hits += 1;
                }
            }
        }

        hits as f64 / (n * n) as f64 * cell.width() * cell.height()
    }
}
