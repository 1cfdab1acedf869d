//! Dose field generators for creating synthetic test data.
//!
//! Every generator returns one value per voxel in grid id order
//! (`x` fastest, then `y`, then `z`), ready to wrap in a dose grid.

use dose_common::GeometricGrid;

/// Dose field filled with a constant value.
pub fn uniform_dose(grid: &GeometricGrid, value: f64) -> Vec<f64> {
    vec![value; grid.num_voxels()]
}

/// Dose field computed from the voxel index.
///
/// # Example
///
/// ```
/// use dose_common::GeometricGrid;
/// use test_utils::dose_from_index;
///
/// let grid = GeometricGrid::new([0.0; 3], [1.0; 3], [3, 2, 1]).unwrap();
/// let dose = dose_from_index(&grid, |x, y, _| (x + 10 * y) as f64);
/// assert_eq!(dose, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
/// ```
pub fn dose_from_index<F>(grid: &GeometricGrid, f: F) -> Vec<f64>
where
    F: Fn(usize, usize, usize) -> f64,
{
    let [nx, ny, nz] = grid.size();
    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                data.push(f(x, y, z));
            }
        }
    }
    data
}

/// Dose rising linearly along x: `base + step * x`.
///
/// Every column of voxels has its own dose, which makes threshold measures
/// easy to verify by hand.
pub fn gradient_dose_x(grid: &GeometricGrid, base: f64, step: f64) -> Vec<f64> {
    dose_from_index(grid, |x, _, _| base + step * x as f64)
}

/// Deterministic pseudo-random dose in `[0, max)`.
pub fn hashed_dose(grid: &GeometricGrid, max: f64, seed: u32) -> Vec<f64> {
    dose_from_index(grid, |x, y, z| {
        let h = simple_hash(x as u32, y as u32, z as u32 ^ seed);
        (h % 10_000) as f64 / 10_000.0 * max
    })
}

/// Dose field with undefined (NaN) values at the given voxel indices.
pub fn dose_with_gaps(
    grid: &GeometricGrid,
    value: f64,
    gaps: &[(usize, usize, usize)],
) -> Vec<f64> {
    let [nx, ny, nz] = grid.size();
    let mut data = uniform_dose(grid, value);
    for &(x, y, z) in gaps {
        if x < nx && y < ny && z < nz {
            data[x + y * nx + z * nx * ny] = f64::NAN;
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
