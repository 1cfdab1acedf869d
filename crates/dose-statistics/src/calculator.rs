//! Aggregation of dose values over a partial-volume mask.
//!
//! Mask fractions act as weights: a voxel covered to 40 % contributes 40 %
//! of its volume to every volume-based quantity and to the mean. Extrema are
//! unweighted.

use tracing::{debug, warn};

use dose_common::{DoseEvalError, DoseEvalResult, GeometricGrid, VoxelGridId, VoxelGridIndex3D};
use voxelizer::PartialVolumeMask;

use crate::config::StatisticsConfig;
use crate::measure::FunctionalMeasureStore;
use crate::sampler::DoseSampler;
use crate::statistics::{DoseStatistics, Measure};

/// A mask voxel with a defined dose.
#[derive(Debug, Clone, Copy)]
struct DoseVoxel {
    id: VoxelGridId,
    dose: f64,
    /// Covered volume in mm³.
    volume: f64,
}

/// Computes [`DoseStatistics`] for one mask and dose distribution.
pub struct DoseStatisticsCalculator<'a, S: DoseSampler + ?Sized> {
    mask: &'a PartialVolumeMask,
    sampler: &'a S,
}

impl<'a, S: DoseSampler + ?Sized> DoseStatisticsCalculator<'a, S> {
    /// Pair a mask with a dose sampler.
    ///
    /// Fails with `StructuralValidity` if they are defined on different grids.
    pub fn new(mask: &'a PartialVolumeMask, sampler: &'a S) -> DoseEvalResult<Self> {
        if !mask.grid().matches(sampler.grid()) {
            return Err(DoseEvalError::structural(format!(
                "mask grid {:?} does not match dose grid {:?}",
                mask.grid().size(),
                sampler.grid().size()
            )));
        }
        Ok(Self { mask, sampler })
    }

    /// Compute scalar statistics and, if enabled, the functional measures.
    ///
    /// # Errors
    /// * `ConfigError` if `config` does not validate
    /// * `DataUnavailable` if no mask voxel has a defined dose
    pub fn calculate(&self, config: &StatisticsConfig) -> DoseEvalResult<DoseStatistics> {
        config.validate().map_err(DoseEvalError::ConfigError)?;

        let voxels = self.collect_voxels()?;
        let grid = self.mask.grid();

        let volume: f64 = voxels.iter().map(|v| v.volume).sum();
        let weight = volume / grid.voxel_volume();
        let mean = voxels.iter().map(|v| v.dose * v.volume).sum::<f64>() / volume;
        let variance = voxels
            .iter()
            .map(|v| v.volume * (v.dose - mean).powi(2))
            .sum::<f64>()
            / volume;
        let std_deviation = variance.max(0.0).sqrt();

        let minimum = voxels.iter().map(|v| v.dose).fold(f64::INFINITY, f64::min);
        let maximum = voxels.iter().map(|v| v.dose).fold(f64::NEG_INFINITY, f64::max);
        let cap = config.max_extrema_positions;
        let minimum_positions = positions_at(grid, &voxels, minimum, cap)?;
        let maximum_positions = positions_at(grid, &voxels, maximum, cap)?;

        debug!(
            voxels = voxels.len(),
            volume_mm3 = volume,
            mean = mean,
            min = minimum,
            max = maximum,
            "Scalar dose statistics computed"
        );

        let mut builder = DoseStatistics::builder()
            .extrema(minimum, maximum)
            .mean(mean)
            .std_deviation(std_deviation)
            .voxels(weight, volume)
            .reference_dose(config.reference_dose)
            .minimum_positions(minimum_positions)
            .maximum_positions(maximum_positions);

        if config.compute_complex_statistics {
            let reference = match config.reference_dose {
                Some(dose) if dose > 0.0 => dose,
                _ => maximum,
            };
            let profile = VolumeProfile::new(&voxels);

            let mut vx = FunctionalMeasureStore::new();
            for threshold in &config.dose_thresholds {
                let dose = threshold.resolve(reference);
                vx.insert(dose, profile.vx(dose))?;
            }
            builder = builder.store(Measure::Vx, vx);

            for measure in [
                Measure::Dx,
                Measure::Moh,
                Measure::Moc,
                Measure::MaxOh,
                Measure::MinOc,
            ] {
                let mut store = FunctionalMeasureStore::new();
                for threshold in &config.volume_thresholds {
                    let x = threshold.resolve(volume);
                    store.insert(x, profile.measure(measure, x))?;
                }
                builder = builder.store(measure, store);
            }

            debug!(
                dose_thresholds = config.dose_thresholds.len(),
                volume_thresholds = config.volume_thresholds.len(),
                reference_dose = reference,
                "Functional dose measures computed"
            );
        }

        Ok(builder.build())
    }

    fn collect_voxels(&self) -> DoseEvalResult<Vec<DoseVoxel>> {
        if self.mask.is_empty() {
            return Err(DoseEvalError::data_unavailable("mask contains no voxels"));
        }

        let voxel_volume = self.mask.grid().voxel_volume();
        let mut voxels = Vec::with_capacity(self.mask.len());
        let mut undefined = 0usize;
        for mask_voxel in self.mask {
            if !self.sampler.has_value(mask_voxel.id) {
                undefined += 1;
                continue;
            }
            voxels.push(DoseVoxel {
                id: mask_voxel.id,
                dose: self.sampler.dose_at(mask_voxel.id)?,
                volume: mask_voxel.fraction * voxel_volume,
            });
        }

        if undefined > 0 {
            warn!(
                skipped = undefined,
                total = self.mask.len(),
                "Mask voxels without dose value skipped"
            );
        }
        if voxels.is_empty() {
            return Err(DoseEvalError::data_unavailable(
                "no mask voxel has a defined dose value",
            ));
        }
        Ok(voxels)
    }
}

/// Grid positions of voxels whose dose equals `dose`, in id order.
fn positions_at(
    grid: &GeometricGrid,
    voxels: &[DoseVoxel],
    dose: f64,
    cap: Option<usize>,
) -> DoseEvalResult<Vec<VoxelGridIndex3D>> {
    voxels
        .iter()
        .filter(|v| v.dose == dose)
        .take(cap.unwrap_or(usize::MAX))
        .map(|v| grid.id_to_index(v.id))
        .collect()
}

/// Voxels ordered hottest first with cumulative volume and dose·volume.
struct VolumeProfile {
    /// `(dose, volume)` by descending dose.
    hottest: Vec<(f64, f64)>,
    /// Cumulative volume along `hottest`.
    cumulative: Vec<f64>,
    /// Cumulative dose·volume along `hottest`.
    integral: Vec<f64>,
    total_volume: f64,
    total_integral: f64,
}

impl VolumeProfile {
    fn new(voxels: &[DoseVoxel]) -> Self {
        let mut hottest: Vec<(f64, f64)> = voxels.iter().map(|v| (v.dose, v.volume)).collect();
        hottest.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut cumulative = Vec::with_capacity(hottest.len());
        let mut integral = Vec::with_capacity(hottest.len());
        let (mut v, mut i) = (0.0, 0.0);
        for &(dose, volume) in &hottest {
            v += volume;
            i += dose * volume;
            cumulative.push(v);
            integral.push(i);
        }

        Self {
            hottest,
            cumulative,
            integral,
            total_volume: v,
            total_integral: i,
        }
    }

    fn max_dose(&self) -> f64 {
        self.hottest.first().map_or(0.0, |h| h.0)
    }

    fn min_dose(&self) -> f64 {
        self.hottest.last().map_or(0.0, |h| h.0)
    }

    fn measure(&self, measure: Measure, x: f64) -> f64 {
        match measure {
            Measure::Dx => self.dx(x),
            Measure::Vx => self.vx(x),
            Measure::Moh => self.moh(x),
            Measure::Moc => self.moc(x),
            Measure::MaxOh => self.max_oh(x),
            Measure::MinOc => self.min_oc(x),
        }
    }

    /// Volume receiving at least `dose`.
    fn vx(&self, dose: f64) -> f64 {
        let k = self.hottest.partition_point(|h| h.0 >= dose);
        if k == 0 {
            0.0
        } else {
            self.cumulative[k - 1]
        }
    }

    /// Dose at which the hottest-first cumulative volume reaches `volume`.
    fn dx(&self, volume: f64) -> f64 {
        let k = self.cumulative.partition_point(|&c| c < volume);
        self.hottest.get(k).map_or(self.min_dose(), |h| h.0)
    }

    /// Mean dose of the hottest `volume`.
    fn moh(&self, volume: f64) -> f64 {
        if volume <= 0.0 {
            return self.max_dose();
        }
        let k = self.cumulative.partition_point(|&c| c < volume);
        if k >= self.hottest.len() {
            return self.total_integral / self.total_volume;
        }
        let (before_volume, before_integral) = if k == 0 {
            (0.0, 0.0)
        } else {
            (self.cumulative[k - 1], self.integral[k - 1])
        };
        (before_integral + (volume - before_volume) * self.hottest[k].0) / volume
    }

    /// Mean dose of the coldest `volume`.
    fn moc(&self, volume: f64) -> f64 {
        if volume <= 0.0 {
            return self.min_dose();
        }
        if volume >= self.total_volume {
            return self.total_integral / self.total_volume;
        }
        // The coldest `volume` is everything except the hottest remainder.
        let hot = self.total_volume - volume;
        let hot_integral = self.moh(hot) * hot;
        (self.total_integral - hot_integral) / volume
    }

    /// Maximum dose outside the hottest `volume`.
    fn max_oh(&self, volume: f64) -> f64 {
        let k = self.cumulative.partition_point(|&c| c <= volume);
        self.hottest.get(k).map_or(self.min_dose(), |h| h.0)
    }

    /// Minimum dose outside the coldest `volume`.
    fn min_oc(&self, volume: f64) -> f64 {
        // Outside the coldest `volume` lies the hottest `hot` volume; its
        // coldest voxel is the last one that starts before `hot` is reached.
        let hot = self.total_volume - volume;
        if hot <= 0.0 {
            return self.max_dose();
        }
        let k = self
            .cumulative
            .partition_point(|&c| c < hot)
            .min(self.hottest.len().saturating_sub(1));
        self.hottest.get(k).map_or(self.max_dose(), |h| h.0)
    }
}
