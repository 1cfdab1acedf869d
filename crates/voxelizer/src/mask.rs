//! Sparse partial-volume mask.

use serde::{Deserialize, Serialize};

use dose_common::{DoseEvalError, DoseEvalResult, GeometricGrid, VoxelGridId, VoxelGridIndex3D};

/// One voxel of a mask together with the fraction of its footprint covered
/// by the structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskVoxel {
    pub id: VoxelGridId,
    /// Covered fraction in `(0, 1]`.
    pub fraction: f64,
}

impl MaskVoxel {
    pub fn new(id: VoxelGridId, fraction: f64) -> Self {
        Self { id, fraction }
    }
}

/// Sparse set of voxels overlapping a structure, keyed by unique voxel id.
///
/// Voxels are kept sorted by id; voxels with zero coverage are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialVolumeMask {
    grid: GeometricGrid,
    voxels: Vec<MaskVoxel>,
}

impl PartialVolumeMask {
    /// Build a mask from voxels on `grid`.
    ///
    /// Zero-fraction voxels are dropped. Ids outside the grid, duplicate ids
    /// and fractions outside `[0, 1]` are rejected.
    pub fn from_voxels(grid: GeometricGrid, mut voxels: Vec<MaskVoxel>) -> DoseEvalResult<Self> {
        voxels.retain(|v| v.fraction != 0.0);
        voxels.sort_unstable_by_key(|v| v.id);

        for pair in voxels.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(DoseEvalError::invalid_parameter(format!(
                    "duplicate mask voxel id {}",
                    pair[0].id
                )));
            }
        }

        for voxel in &voxels {
            if !grid.contains_id(voxel.id) {
                return Err(DoseEvalError::out_of_range(
                    format!("id {}", voxel.id),
                    format!("{} voxels", grid.num_voxels()),
                ));
            }
            if !(voxel.fraction > 0.0 && voxel.fraction <= 1.0) {
                return Err(DoseEvalError::invalid_parameter(format!(
                    "mask fraction {} of voxel {} is outside [0, 1]",
                    voxel.fraction, voxel.id
                )));
            }
        }

        Ok(Self { grid, voxels })
    }

    /// Empty mask on `grid`.
    pub fn empty(grid: GeometricGrid) -> Self {
        Self {
            grid,
            voxels: Vec::new(),
        }
    }

    /// Grid the mask was built on.
    pub fn grid(&self) -> &GeometricGrid {
        &self.grid
    }

    /// Voxels sorted by id.
    pub fn voxels(&self) -> &[MaskVoxel] {
        &self.voxels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MaskVoxel> {
        self.voxels.iter()
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Mask entry of a voxel, if the structure overlaps it.
    pub fn get(&self, id: VoxelGridId) -> Option<&MaskVoxel> {
        self.voxels
            .binary_search_by_key(&id, |v| v.id)
            .ok()
            .map(|i| &self.voxels[i])
    }

    pub fn contains(&self, id: VoxelGridId) -> bool {
        self.get(id).is_some()
    }

    /// Covered fraction of a voxel; zero for voxels outside the structure.
    pub fn fraction_at(&self, id: VoxelGridId) -> f64 {
        self.get(id).map_or(0.0, |v| v.fraction)
    }

    /// Covered fraction of the voxel at `index`.
    pub fn fraction_at_index(&self, index: &VoxelGridIndex3D) -> DoseEvalResult<f64> {
        let id = self.grid.index_to_id(index)?;
        Ok(self.fraction_at(id))
    }

    /// Sum of all fractions (fraction-weighted voxel count).
    pub fn total_fraction(&self) -> f64 {
        self.voxels.iter().map(|v| v.fraction).sum()
    }

    /// Structure volume in mm³.
    pub fn volume(&self) -> f64 {
        self.total_fraction() * self.grid.voxel_volume()
    }
}

impl<'a> IntoIterator for &'a PartialVolumeMask {
    type Item = &'a MaskVoxel;
    type IntoIter = std::slice::Iter<'a, MaskVoxel>;

    fn into_iter(self) -> Self::IntoIter {
        self.voxels.iter()
    }
}
