//! Common test fixtures for voxelization and dose statistics tests.
//!
//! Grids use 1 mm voxels unless noted otherwise so that mask volumes in mm³
//! equal fraction sums.

/// Common grid definitions for testing.
pub mod grids {
    use dose_common::GeometricGrid;

    /// 10 x 10 x 1 grid, 1 mm spacing, origin at the centre of voxel (0, 0, 0).
    pub fn grid_10x10x1() -> GeometricGrid {
        cube_grid(10, 10, 1)
    }

    /// 10 x 10 x 5 grid, 1 mm in-plane spacing, 2 mm slices.
    pub fn grid_10x10x5() -> GeometricGrid {
        GeometricGrid::new([0.0, 0.0, 0.0], [1.0, 1.0, 2.0], [10, 10, 5])
            .expect("fixture grid is valid")
    }

    /// Grid with 1 mm isotropic voxels anchored at the world origin.
    pub fn cube_grid(nx: usize, ny: usize, nz: usize) -> GeometricGrid {
        GeometricGrid::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [nx, ny, nz])
            .expect("fixture grid is valid")
    }
}

/// Common contour structures for testing.
pub mod structures {
    use dose_common::{ContourStructure, Ring};

    /// Square whose edges lie on voxel boundaries, covering voxels
    /// `first..=last` in x and y on slice `z = 0`.
    pub fn voxel_aligned_square(first: usize, last: usize) -> ContourStructure {
        let min = first as f64 - 0.5;
        let max = last as f64 + 0.5;
        ContourStructure::new("aligned square").with_ring(0.0, Ring::rectangle(min, min, max, max))
    }

    /// Square with edges through voxel centres: inner voxels are fully
    /// covered, edge voxels half and corner voxels a quarter.
    pub fn centred_square(min: f64, max: f64) -> ContourStructure {
        ContourStructure::new("centred square").with_ring(0.0, Ring::rectangle(min, min, max, max))
    }

    /// Outer square `[0.5, 8.5]²` with a reversed inner square `[3.5, 5.5]²`.
    pub fn donut() -> ContourStructure {
        ContourStructure::new("donut")
            .with_ring(0.0, Ring::rectangle(0.5, 0.5, 8.5, 8.5))
            .with_ring(0.0, Ring::rectangle(3.5, 3.5, 5.5, 5.5).reversed())
    }

    /// Two crossing squares on one slice; invalid in strict mode.
    pub fn overlapping_squares() -> ContourStructure {
        ContourStructure::new("overlap")
            .with_ring(0.0, Ring::rectangle(0.5, 0.5, 4.5, 4.5))
            .with_ring(0.0, Ring::rectangle(2.5, 2.5, 6.5, 6.5))
    }

    /// The same voxel-aligned square on `slices` planes spaced `thickness`
    /// apart, starting at `z = 0`.
    pub fn square_column(first: usize, last: usize, slices: usize, thickness: f64) -> ContourStructure {
        let min = first as f64 - 0.5;
        let max = last as f64 + 0.5;
        (0..slices).fold(ContourStructure::new("column"), |s, k| {
            s.with_ring(k as f64 * thickness, Ring::rectangle(min, min, max, max))
        })
    }
}
