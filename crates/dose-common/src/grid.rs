//! Regular 3D grid geometry shared by dose and mask data.
//!
//! Voxel centres sit at `origin + R * (index * spacing)` where `R` is the
//! orthonormal orientation matrix whose columns are the row, column and slice
//! directions. In continuous index space a voxel with index `i` spans
//! `[i - 0.5, i + 0.5)` along every axis.

use std::fmt;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{DoseEvalError, DoseEvalResult};

/// Linear voxel id: `x + y * nx + z * nx * ny`.
pub type VoxelGridId = u64;

/// Tolerance used when checking the orientation matrix for orthonormality.
const ORIENTATION_TOLERANCE: f64 = 1e-6;

/// Integer voxel position inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelGridIndex3D {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl VoxelGridIndex3D {
    /// Create a new index.
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for VoxelGridIndex3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Geometry of a regular voxel grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricGrid {
    origin: Vector3<f64>,
    spacing: Vector3<f64>,
    size: [usize; 3],
    orientation: Matrix3<f64>,
}

impl GeometricGrid {
    /// Create an axis-aligned grid.
    ///
    /// # Arguments
    /// * `origin` - World position of the centre of voxel `(0, 0, 0)` in mm
    /// * `spacing` - Voxel size along each axis in mm
    /// * `size` - Number of voxels along each axis
    pub fn new(origin: [f64; 3], spacing: [f64; 3], size: [usize; 3]) -> DoseEvalResult<Self> {
        let grid = Self {
            origin: Vector3::from(origin),
            spacing: Vector3::from(spacing),
            size,
            orientation: Matrix3::identity(),
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Replace the orientation matrix.
    ///
    /// The columns of `orientation` are the world directions of the row,
    /// column and slice axes. Non-orthonormal matrices are rejected.
    pub fn with_orientation(mut self, orientation: Matrix3<f64>) -> DoseEvalResult<Self> {
        let gram = orientation.transpose() * orientation;
        if (gram - Matrix3::identity()).abs().max() > ORIENTATION_TOLERANCE {
            return Err(DoseEvalError::invalid_parameter(
                "orientation matrix must be orthonormal",
            ));
        }
        self.orientation = orientation;
        Ok(self)
    }

    /// Validate spacing and extents.
    pub fn validate(&self) -> DoseEvalResult<()> {
        if self.spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(DoseEvalError::invalid_parameter(format!(
                "grid spacing must be positive, got {:?}",
                self.spacing.as_slice()
            )));
        }
        if self.size.iter().any(|n| *n == 0) {
            return Err(DoseEvalError::invalid_parameter(format!(
                "grid extent must be non-zero, got {:?}",
                self.size
            )));
        }
        if self.origin.iter().any(|o| !o.is_finite()) {
            return Err(DoseEvalError::invalid_parameter("grid origin must be finite"));
        }
        Ok(())
    }

    pub fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub fn spacing(&self) -> &Vector3<f64> {
        &self.spacing
    }

    pub fn orientation(&self) -> &Matrix3<f64> {
        &self.orientation
    }

    /// Number of voxels along (x, y, z).
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn nx(&self) -> usize {
        self.size[0]
    }

    pub fn ny(&self) -> usize {
        self.size[1]
    }

    /// Number of slices (voxels along z).
    pub fn slice_count(&self) -> usize {
        self.size[2]
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.size[0] * self.size[1] * self.size[2]
    }

    /// Volume of one voxel in mm³.
    pub fn voxel_volume(&self) -> f64 {
        self.spacing.x * self.spacing.y * self.spacing.z
    }

    /// Check whether two grids describe the same voxel lattice.
    pub fn matches(&self, other: &GeometricGrid) -> bool {
        self.size == other.size
            && (self.spacing - other.spacing).abs().max() < 1e-9
            && (self.origin - other.origin).abs().max() < 1e-9
            && (self.orientation - other.orientation).abs().max() < ORIENTATION_TOLERANCE
    }

    /// Check if an index lies inside the grid.
    pub fn contains_index(&self, index: &VoxelGridIndex3D) -> bool {
        index.x < self.size[0] && index.y < self.size[1] && index.z < self.size[2]
    }

    /// Check if a linear id lies inside the grid.
    pub fn contains_id(&self, id: VoxelGridId) -> bool {
        id < self.num_voxels() as VoxelGridId
    }

    /// Convert a 3D index to its linear id.
    pub fn index_to_id(&self, index: &VoxelGridIndex3D) -> DoseEvalResult<VoxelGridId> {
        if !self.contains_index(index) {
            return Err(self.out_of_range(index));
        }
        let [nx, ny, _] = self.size;
        Ok((index.x + index.y * nx + index.z * nx * ny) as VoxelGridId)
    }

    /// Convert a linear id back to its 3D index.
    pub fn id_to_index(&self, id: VoxelGridId) -> DoseEvalResult<VoxelGridIndex3D> {
        if !self.contains_id(id) {
            return Err(DoseEvalError::out_of_range(
                format!("id {}", id),
                format!("{} voxels", self.num_voxels()),
            ));
        }
        let [nx, ny, _] = self.size;
        let id = id as usize;
        Ok(VoxelGridIndex3D::new(id % nx, (id / nx) % ny, id / (nx * ny)))
    }

    /// World position (mm) of a voxel centre.
    pub fn index_to_world(&self, index: &VoxelGridIndex3D) -> DoseEvalResult<Vector3<f64>> {
        if !self.contains_index(index) {
            return Err(self.out_of_range(index));
        }
        Ok(self.continuous_index_to_world(&Vector3::new(
            index.x as f64,
            index.y as f64,
            index.z as f64,
        )))
    }

    /// World position of a continuous index.
    pub fn continuous_index_to_world(&self, index: &Vector3<f64>) -> Vector3<f64> {
        self.origin + self.orientation * index.component_mul(&self.spacing)
    }

    /// Continuous index of a world position. Never fails; the result may lie
    /// outside the grid.
    pub fn world_to_continuous_index(&self, world: &Vector3<f64>) -> Vector3<f64> {
        (self.orientation.transpose() * (world - self.origin)).component_div(&self.spacing)
    }

    /// Index of the voxel containing a world position.
    pub fn world_to_index(&self, world: &Vector3<f64>) -> DoseEvalResult<VoxelGridIndex3D> {
        let c = self.world_to_continuous_index(world);
        let x = self.axis_index(c.x, 0);
        let y = self.axis_index(c.y, 1);
        let z = self.axis_index(c.z, 2);
        match (x, y, z) {
            (Some(x), Some(y), Some(z)) => Ok(VoxelGridIndex3D::new(x, y, z)),
            _ => Err(DoseEvalError::out_of_range(
                format!("world ({:.3}, {:.3}, {:.3})", world.x, world.y, world.z),
                self.extent_string(),
            )),
        }
    }

    /// Slice containing a continuous z index.
    pub fn slice_for_continuous_z(&self, z: f64) -> DoseEvalResult<usize> {
        self.axis_index(z, 2).ok_or_else(|| {
            DoseEvalError::out_of_range(format!("slice {:.3}", z), self.extent_string())
        })
    }

    /// Slice containing the axial plane at world `z`, evaluated at the
    /// in-plane position of the grid origin.
    pub fn slice_for_z(&self, z: f64) -> DoseEvalResult<usize> {
        let c = self.world_to_continuous_index(&Vector3::new(self.origin.x, self.origin.y, z));
        self.slice_for_continuous_z(c.z)
    }

    /// Voxel along one axis whose footprint contains continuous coordinate `c`.
    fn axis_index(&self, c: f64, axis: usize) -> Option<usize> {
        if !c.is_finite() {
            return None;
        }
        let i = (c + 0.5).floor();
        if i < 0.0 || i >= self.size[axis] as f64 {
            None
        } else {
            Some(i as usize)
        }
    }

    fn out_of_range(&self, index: &VoxelGridIndex3D) -> DoseEvalError {
        DoseEvalError::out_of_range(index.to_string(), self.extent_string())
    }

    fn extent_string(&self) -> String {
        format!("({}, {}, {})", self.size[0], self.size[1], self.size[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn grid_10x10x3() -> GeometricGrid {
        GeometricGrid::new([-5.0, 10.0, 0.0], [2.0, 2.0, 3.0], [10, 10, 3]).unwrap()
    }

    #[test]
    fn test_id_roundtrip() {
        let grid = grid_10x10x3();
        let index = VoxelGridIndex3D::new(3, 7, 2);
        let id = grid.index_to_id(&index).unwrap();
        assert_eq!(id, 3 + 7 * 10 + 2 * 100);
        assert_eq!(grid.id_to_index(id).unwrap(), index);
    }

    #[test]
    fn test_out_of_range_index() {
        let grid = grid_10x10x3();
        let err = grid.index_to_id(&VoxelGridIndex3D::new(10, 0, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralValidity);
        assert!(grid.id_to_index(300).is_err());
        assert!(grid.index_to_world(&VoxelGridIndex3D::new(0, 0, 3)).is_err());
    }

    #[test]
    fn test_world_conversion() {
        let grid = grid_10x10x3();
        let world = grid.index_to_world(&VoxelGridIndex3D::new(1, 2, 1)).unwrap();
        assert!((world - Vector3::new(-3.0, 14.0, 3.0)).norm() < 1e-12);

        let index = grid.world_to_index(&Vector3::new(-2.1, 14.9, 4.4)).unwrap();
        assert_eq!(index, VoxelGridIndex3D::new(1, 2, 1));

        assert!(grid.world_to_index(&Vector3::new(-6.5, 10.0, 0.0)).is_err());
    }

    #[test]
    fn test_voxel_footprint_boundaries() {
        let grid = GeometricGrid::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [4, 4, 4]).unwrap();
        assert_eq!(grid.slice_for_continuous_z(-0.5).unwrap(), 0);
        assert_eq!(grid.slice_for_continuous_z(0.49).unwrap(), 0);
        assert_eq!(grid.slice_for_continuous_z(0.5).unwrap(), 1);
        assert!(grid.slice_for_continuous_z(3.5).is_err());
        assert!(grid.slice_for_continuous_z(-0.51).is_err());
    }

    #[test]
    fn test_slice_for_world_z() {
        let grid = grid_10x10x3();
        // Slice thickness 3 mm starting at z = 0.
        assert_eq!(grid.slice_for_z(0.0).unwrap(), 0);
        assert_eq!(grid.slice_for_z(4.4).unwrap(), 1);
        assert_eq!(grid.slice_for_z(6.0).unwrap(), 2);
        assert!(grid.slice_for_z(7.5).is_err());
    }

    #[test]
    fn test_rotated_orientation() {
        // Row direction along world +y, column direction along world -x.
        let rotation = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let grid = GeometricGrid::new([0.0, 0.0, 0.0], [1.0, 2.0, 1.0], [5, 5, 1])
            .unwrap()
            .with_orientation(rotation)
            .unwrap();

        let world = grid.index_to_world(&VoxelGridIndex3D::new(2, 1, 0)).unwrap();
        assert!((world - Vector3::new(-2.0, 2.0, 0.0)).norm() < 1e-12);

        let back = grid.world_to_continuous_index(&world);
        assert!((back - Vector3::new(2.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid_geometry() {
        assert!(GeometricGrid::new([0.0; 3], [1.0, 0.0, 1.0], [2, 2, 2]).is_err());
        assert!(GeometricGrid::new([0.0; 3], [1.0, 1.0, 1.0], [2, 0, 2]).is_err());

        let skew = Matrix3::new(1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let grid = GeometricGrid::new([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        assert!(grid.with_orientation(skew).is_err());
    }

    #[test]
    fn test_volumes() {
        let grid = grid_10x10x3();
        assert_eq!(grid.num_voxels(), 300);
        assert!((grid.voxel_volume() - 12.0).abs() < f64::EPSILON);
        assert!(grid.matches(&grid.clone()));
    }
}
