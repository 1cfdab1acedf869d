//! Builder for a single mask generation request.
//!
//! Inputs are optional references so a caller assembling a request from
//! loosely coupled sources gets a `NullInput` error instead of a panic when
//! one of them is missing.
//!
//! ```rust,ignore
//! use voxelizer::{mask_generator, MaskRequest, VoxelizerConfig};
//!
//! let generator = mask_generator(&VoxelizerConfig::from_env())?;
//! let mask = MaskRequest::new()
//!     .structure(&structure)
//!     .grid(&dose_grid)
//!     .produce(generator.as_ref())?;
//! ```

use dose_common::{ContourStructure, DoseEvalError, DoseEvalResult, GeometricGrid};

use crate::engine::MaskGenerator;
use crate::mask::PartialVolumeMask;

/// Inputs of one mask generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskRequest<'a> {
    structure: Option<&'a ContourStructure>,
    grid: Option<&'a GeometricGrid>,
}

impl<'a> MaskRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the structure to voxelize.
    pub fn structure(mut self, structure: &'a ContourStructure) -> Self {
        self.structure = Some(structure);
        self
    }

    /// Set the target grid.
    pub fn grid(mut self, grid: &'a GeometricGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Run `generator` on the request inputs.
    ///
    /// Fails with `NullInput` if the structure or the grid was not set.
    pub fn produce(&self, generator: &dyn MaskGenerator) -> DoseEvalResult<PartialVolumeMask> {
        let structure = self
            .structure
            .ok_or_else(|| DoseEvalError::null_input("contour structure"))?;
        let grid = self
            .grid
            .ok_or_else(|| DoseEvalError::null_input("geometric grid"))?;
        generator.produce_mask(structure, grid)
    }
}
