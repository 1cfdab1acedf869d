//! Structure-to-statistics pipeline.

use tracing::info;

use dose_common::{ContourStructure, DoseEvalResult};
use voxelizer::{mask_generator, MaskGenerator, PartialVolumeMask, VoxelizerConfig};

use crate::calculator::DoseStatisticsCalculator;
use crate::config::StatisticsConfig;
use crate::sampler::DoseSampler;
use crate::statistics::DoseStatistics;

/// Voxelize `structure` on the dose grid of `sampler` and aggregate the dose
/// inside it.
///
/// Returns the mask together with the statistics so callers can reuse it
/// for further dose distributions on the same grid.
pub fn evaluate_structure<S>(
    structure: &ContourStructure,
    sampler: &S,
    voxelizer_config: &VoxelizerConfig,
    statistics_config: &StatisticsConfig,
) -> DoseEvalResult<(PartialVolumeMask, DoseStatistics)>
where
    S: DoseSampler + ?Sized,
{
    let generator = mask_generator(voxelizer_config)?;
    let mask = generator.produce_mask(structure, sampler.grid())?;
    let statistics = DoseStatisticsCalculator::new(&mask, sampler)?.calculate(statistics_config)?;

    info!(
        structure = structure.label(),
        volume_mm3 = statistics.volume(),
        mean = statistics.mean(),
        max = statistics.maximum(),
        "Structure evaluated"
    );

    Ok((mask, statistics))
}
