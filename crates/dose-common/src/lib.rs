//! Common types shared by the voxelization and dose statistics crates.
//!
//! - [`GeometricGrid`]: voxel lattice geometry and index/world conversion
//! - [`ContourStructure`]: per-slice contour rings of a delineated structure
//! - [`DoseEvalError`]: error taxonomy used across the workspace

pub mod bounds;
pub mod contour;
pub mod error;
pub mod grid;

pub use bounds::IndexBounds;
pub use contour::{ContourSlice, ContourStructure, Point2, Ring};
pub use error::{DoseEvalError, DoseEvalResult, ErrorKind};
pub use grid::{GeometricGrid, VoxelGridId, VoxelGridIndex3D};
