//! Dose lookup on a voxel grid.

use serde::{Deserialize, Serialize};

use dose_common::{DoseEvalError, DoseEvalResult, GeometricGrid, VoxelGridId, VoxelGridIndex3D};

/// Read access to dose values by voxel.
pub trait DoseSampler: Send + Sync {
    /// Grid the dose is defined on.
    fn grid(&self) -> &GeometricGrid;

    /// True if the voxel lies inside the grid and carries a dose value.
    fn has_value(&self, id: VoxelGridId) -> bool;

    /// Dose in Gy at a voxel.
    ///
    /// # Errors
    /// * `IndexOutOfRange` if the id is outside the grid
    /// * `DataUnavailable` if the voxel has no dose value
    fn dose_at(&self, id: VoxelGridId) -> DoseEvalResult<f64>;

    /// Dose at a voxel index.
    fn dose_at_index(&self, index: &VoxelGridIndex3D) -> DoseEvalResult<f64> {
        let id = self.grid().index_to_id(index)?;
        self.dose_at(id)
    }
}

/// Dense in-memory dose grid. `NaN` marks voxels without a dose value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseGrid {
    grid: GeometricGrid,
    values: Vec<f64>,
}

impl DoseGrid {
    /// Wrap dose values given in voxel id order.
    pub fn new(grid: GeometricGrid, values: Vec<f64>) -> DoseEvalResult<Self> {
        if values.len() != grid.num_voxels() {
            return Err(DoseEvalError::invalid_parameter(format!(
                "dose grid holds {} values, grid has {} voxels",
                values.len(),
                grid.num_voxels()
            )));
        }
        Ok(Self { grid, values })
    }

    /// Constant dose everywhere.
    pub fn uniform(grid: GeometricGrid, dose: f64) -> Self {
        let values = vec![dose; grid.num_voxels()];
        Self { grid, values }
    }

    /// Dose computed per voxel index.
    pub fn from_fn<F>(grid: GeometricGrid, f: F) -> Self
    where
        F: Fn(&VoxelGridIndex3D) -> f64,
    {
        let [nx, ny, nz] = grid.size();
        let mut values = Vec::with_capacity(grid.num_voxels());
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    values.push(f(&VoxelGridIndex3D::new(x, y, z)));
                }
            }
        }
        Self { grid, values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl DoseSampler for DoseGrid {
    fn grid(&self) -> &GeometricGrid {
        &self.grid
    }

    fn has_value(&self, id: VoxelGridId) -> bool {
        self.values
            .get(id as usize)
            .map_or(false, |d| !d.is_nan())
    }

    fn dose_at(&self, id: VoxelGridId) -> DoseEvalResult<f64> {
        let dose = self.values.get(id as usize).copied().ok_or_else(|| {
            DoseEvalError::out_of_range(
                format!("id {}", id),
                format!("{} voxels", self.grid.num_voxels()),
            )
        })?;
        if dose.is_nan() {
            return Err(DoseEvalError::data_unavailable(format!(
                "no dose value at voxel {}",
                id
            )));
        }
        Ok(dose)
    }
}
