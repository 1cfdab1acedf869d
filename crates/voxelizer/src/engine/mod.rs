//! Mask generation trait and the slice-wise voxelization pipeline.

mod clipping;
mod sampled;

pub use clipping::ClippingCoverage;
pub use sampled::SampledCoverage;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use dose_common::{
    ContourStructure, DoseEvalError, DoseEvalResult, GeometricGrid, IndexBounds, VoxelGridIndex3D,
};

use crate::config::VoxelizerConfig;
use crate::mask::{MaskVoxel, PartialVolumeMask};
use crate::topology::{analyze_slice, project_structure, SlicePolygon, SliceTopology, TopologyIssue};

/// Fractions at or below this are floating-point noise and not emitted.
///
/// A voxel that the contour only grazes can pick up a sliver of area from
/// rounding in the clipper, so "fraction > 0" is tested against this
/// tolerance rather than against exact zero.
pub const MIN_FRACTION: f64 = 1e-12;

/// Turns a contour structure into a partial-volume mask on a grid.
pub trait MaskGenerator: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Build the mask of `structure` on `grid`.
    ///
    /// # Errors
    /// * `StructuralValidity` if the structure has topology issues and the
    ///   generator runs in strict mode
    /// * `StructuralValidity` / `IndexOutOfRange` for an invalid grid
    fn produce_mask(
        &self,
        structure: &ContourStructure,
        grid: &GeometricGrid,
    ) -> DoseEvalResult<PartialVolumeMask>;
}

/// Estimates how much of one voxel footprint is covered by the polygons of
/// a slice.
pub trait CoverageEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Covered area of `cell` in index units (a voxel footprint has area 1).
    fn covered_area(&self, polygons: &[SlicePolygon], cell: &IndexBounds) -> f64;
}

/// Slice-wise voxelization driven by a coverage estimator.
///
/// Topology analysis of every slice finishes before any voxel is clipped,
/// so a strict-mode failure leaves no partial output.
#[derive(Debug, Clone)]
pub struct VoxelizationEngine<E> {
    estimator: E,
    strict: bool,
    parallel: bool,
}

/// Exact polygon clipping backend.
pub type ClippingMaskGenerator = VoxelizationEngine<ClippingCoverage>;

/// Legacy point-sampling backend.
pub type SampledMaskGenerator = VoxelizationEngine<SampledCoverage>;

impl<E: CoverageEstimator> VoxelizationEngine<E> {
    pub fn new(estimator: E, config: &VoxelizerConfig) -> Self {
        Self {
            estimator,
            strict: config.strict,
            parallel: config.parallel,
        }
    }

    fn analyze(&self, structure: &ContourStructure, grid: &GeometricGrid) -> Vec<SliceTopology> {
        let slices: Vec<_> = project_structure(structure, grid).into_iter().collect();
        if self.parallel {
            slices
                .into_par_iter()
                .map(|(slice, rings)| analyze_slice(slice, rings))
                .collect()
        } else {
            slices
                .into_iter()
                .map(|(slice, rings)| analyze_slice(slice, rings))
                .collect()
        }
    }

    fn check_topology(&self, label: &str, topologies: &[SliceTopology]) -> DoseEvalResult<()> {
        let issues: Vec<&TopologyIssue> = topologies.iter().flat_map(|t| &t.issues).collect();
        if issues.is_empty() {
            return Ok(());
        }

        if self.strict {
            let details: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
            return Err(DoseEvalError::structural(format!(
                "structure '{}' has {} topology issue(s): {}",
                label,
                issues.len(),
                details.join("; ")
            )));
        }

        for issue in issues {
            warn!(
                structure = label,
                slice = issue.slice(),
                issue = %issue,
                "Contour topology issue, using best-effort coverage"
            );
        }
        Ok(())
    }

    fn voxelize_slice(
        &self,
        topology: &SliceTopology,
        grid: &GeometricGrid,
    ) -> DoseEvalResult<Vec<MaskVoxel>> {
        let Some(bounds) = topology.bounds() else {
            return Ok(Vec::new());
        };
        let Some((xs, ys)) = bounds.voxel_ranges(grid.nx(), grid.ny()) else {
            return Ok(Vec::new());
        };

        let mut voxels = Vec::new();
        for y in ys {
            for x in xs.clone() {
                let (cx, cy) = (x as f64, y as f64);
                let cell = IndexBounds::new(cx - 0.5, cy - 0.5, cx + 0.5, cy + 0.5);
                let fraction = self
                    .estimator
                    .covered_area(&topology.polygons, &cell)
                    .clamp(0.0, 1.0);
                if fraction > MIN_FRACTION {
                    let id = grid.index_to_id(&VoxelGridIndex3D::new(x, y, topology.slice))?;
                    voxels.push(MaskVoxel::new(id, fraction));
                }
            }
        }

        debug!(
            slice = topology.slice,
            polygons = topology.polygons.len(),
            voxels = voxels.len(),
            "Voxelized slice"
        );
        Ok(voxels)
    }
}

impl<E: CoverageEstimator> MaskGenerator for VoxelizationEngine<E> {
    fn name(&self) -> &'static str {
        self.estimator.name()
    }

    fn produce_mask(
        &self,
        structure: &ContourStructure,
        grid: &GeometricGrid,
    ) -> DoseEvalResult<PartialVolumeMask> {
        grid.validate()?;

        info!(
            structure = structure.label(),
            backend = self.name(),
            rings = structure.ring_count(),
            strict = self.strict,
            "Voxelizing structure"
        );

        let topologies = self.analyze(structure, grid);
        self.check_topology(structure.label(), &topologies)?;

        let per_slice: Vec<Vec<MaskVoxel>> = if self.parallel {
            topologies
                .par_iter()
                .map(|t| self.voxelize_slice(t, grid))
                .collect::<DoseEvalResult<_>>()?
        } else {
            topologies
                .iter()
                .map(|t| self.voxelize_slice(t, grid))
                .collect::<DoseEvalResult<_>>()?
        };

        let voxels: Vec<MaskVoxel> = per_slice.into_iter().flatten().collect();
        let mask = PartialVolumeMask::from_voxels(grid.clone(), voxels)?;

        info!(
            structure = structure.label(),
            slices = topologies.len(),
            voxels = mask.len(),
            volume_mm3 = mask.volume(),
            "Structure voxelized"
        );

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dose_common::Ring;

    /// Reports the same covered area for every voxel.
    struct ConstantCoverage(f64);

    impl CoverageEstimator for ConstantCoverage {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn covered_area(&self, _polygons: &[SlicePolygon], _cell: &IndexBounds) -> f64 {
            self.0
        }
    }

    fn voxelize(area: f64) -> PartialVolumeMask {
        let grid = GeometricGrid::new([0.0; 3], [1.0; 3], [4, 4, 1]).unwrap();
        let structure =
            ContourStructure::new("square").with_ring(0.0, Ring::rectangle(0.5, 0.5, 2.5, 2.5));
        VoxelizationEngine::new(ConstantCoverage(area), &VoxelizerConfig::default())
            .produce_mask(&structure, &grid)
            .unwrap()
    }

    #[test]
    fn test_noise_fractions_are_dropped() {
        assert!(voxelize(0.0).is_empty());
        assert!(voxelize(MIN_FRACTION).is_empty());
        assert!(voxelize(1e-13).is_empty());
    }

    #[test]
    fn test_small_fractions_are_kept() {
        let mask = voxelize(1e-6);
        assert!(!mask.is_empty());
        assert!(mask.iter().all(|v| v.fraction == 1e-6));
    }

    #[test]
    fn test_fractions_are_clamped_to_one() {
        let mask = voxelize(1.7);
        assert!(mask.iter().all(|v| v.fraction == 1.0));
    }
}
