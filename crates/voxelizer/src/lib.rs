//! Partial-volume voxelization of contour structures.
//!
//! Converts the per-slice contour rings of a delineated structure into a
//! sparse [`PartialVolumeMask`]: every voxel the structure overlaps, with the
//! fraction of its footprint that is covered.
//!
//! # Architecture
//!
//! ```text
//! ContourStructure + GeometricGrid
//!      │
//!      ▼
//! project_structure()      rings -> continuous index space, grouped by slice
//!      │
//!      ▼
//! analyze_slice()          per slice (rayon): validity checks, donut merge
//!      │
//!      ├─► strict + issues ──► StructuralValidity error
//!      │
//!      ▼
//! CoverageEstimator        per candidate voxel in the slice bounds
//!      │    ├─ ClippingCoverage  (exact area)
//!      │    └─ SampledCoverage   (legacy point sampling)
//!      ▼
//! PartialVolumeMask        sorted by voxel id
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use voxelizer::{mask_generator, VoxelizerConfig};
//!
//! let generator = mask_generator(&VoxelizerConfig::default())?;
//! let mask = generator.produce_mask(&structure, &grid)?;
//! println!("{} voxels, {:.1} mm³", mask.len(), mask.volume());
//! ```

pub mod config;
pub mod engine;
pub mod factory;
pub mod mask;
pub mod request;
pub mod topology;

pub use config::{MaskBackend, VoxelizerConfig};
pub use engine::{
    ClippingCoverage, ClippingMaskGenerator, CoverageEstimator, MaskGenerator,
    SampledCoverage, SampledMaskGenerator, VoxelizationEngine, MIN_FRACTION,
};
pub use factory::mask_generator;
pub use mask::{MaskVoxel, PartialVolumeMask};
pub use request::MaskRequest;
pub use topology::{validate_structure, RingId, TopologyIssue};
