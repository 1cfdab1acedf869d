//! Dose statistics of one structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use dose_common::{DoseEvalError, DoseEvalResult, VoxelGridIndex3D};

use crate::measure::{FunctionalMeasureStore, MeasureValue};

/// Functional dose-volume measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    /// Minimum dose received by the hottest `x` volume.
    Dx,
    /// Volume receiving at least dose `x`.
    Vx,
    /// Mean dose of the hottest `x` volume.
    Moh,
    /// Mean dose of the coldest `x` volume.
    Moc,
    /// Maximum dose outside the hottest `x` volume.
    MaxOh,
    /// Minimum dose outside the coldest `x` volume.
    MinOc,
}

impl Measure {
    pub const ALL: [Measure; 6] = [
        Measure::Dx,
        Measure::Vx,
        Measure::Moh,
        Measure::Moc,
        Measure::MaxOh,
        Measure::MinOc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dx => "Dx",
            Self::Vx => "Vx",
            Self::Moh => "MOHx",
            Self::Moc => "MOCx",
            Self::MaxOh => "MaxOHx",
            Self::MinOc => "MinOCx",
        }
    }

    /// True if the parameter is a dose (Vx); all other measures take a volume.
    pub fn is_dose_parametrized(&self) -> bool {
        matches!(self, Self::Vx)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated dose statistics.
///
/// Doses are in Gy, volumes in mm³. Built once by [`DoseStatisticsBuilder`];
/// `with_*` methods return a copy with one part replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseStatistics {
    minimum: f64,
    maximum: f64,
    mean: f64,
    std_deviation: f64,
    number_of_voxels: f64,
    volume: f64,
    reference_dose: f64,
    minimum_positions: Vec<VoxelGridIndex3D>,
    maximum_positions: Vec<VoxelGridIndex3D>,
    dx: FunctionalMeasureStore,
    vx: FunctionalMeasureStore,
    moh: FunctionalMeasureStore,
    moc: FunctionalMeasureStore,
    max_oh: FunctionalMeasureStore,
    min_oc: FunctionalMeasureStore,
}

impl DoseStatistics {
    pub fn builder() -> DoseStatisticsBuilder {
        DoseStatisticsBuilder::default()
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_deviation(&self) -> f64 {
        self.std_deviation
    }

    pub fn variance(&self) -> f64 {
        self.std_deviation * self.std_deviation
    }

    /// Fraction-weighted voxel count.
    pub fn number_of_voxels(&self) -> f64 {
        self.number_of_voxels
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn reference_dose(&self) -> f64 {
        self.reference_dose
    }

    /// Voxels at the minimum dose, in voxel id order.
    pub fn minimum_voxel_positions(&self) -> &[VoxelGridIndex3D] {
        &self.minimum_positions
    }

    /// Voxels at the maximum dose, in voxel id order.
    pub fn maximum_voxel_positions(&self) -> &[VoxelGridIndex3D] {
        &self.maximum_positions
    }

    /// Store backing a measure.
    pub fn store(&self, measure: Measure) -> &FunctionalMeasureStore {
        match measure {
            Measure::Dx => &self.dx,
            Measure::Vx => &self.vx,
            Measure::Moh => &self.moh,
            Measure::Moc => &self.moc,
            Measure::MaxOh => &self.max_oh,
            Measure::MinOc => &self.min_oc,
        }
    }

    fn store_mut(&mut self, measure: Measure) -> &mut FunctionalMeasureStore {
        match measure {
            Measure::Dx => &mut self.dx,
            Measure::Vx => &mut self.vx,
            Measure::Moh => &mut self.moh,
            Measure::Moc => &mut self.moc,
            Measure::MaxOh => &mut self.max_oh,
            Measure::MinOc => &mut self.min_oc,
        }
    }

    /// Look up a measure at an absolute parameter.
    pub fn query(&self, measure: Measure, x: f64, find_nearest: bool) -> DoseEvalResult<MeasureValue> {
        self.store(measure).query(x, find_nearest).map_err(|e| match e {
            DoseEvalError::DataUnavailable(msg) => {
                DoseEvalError::data_unavailable(format!("{}: {}", measure, msg))
            }
            other => other,
        })
    }

    /// Look up a measure at a parameter relative to the reference dose (Vx)
    /// or to the structure volume (all other measures).
    ///
    /// # Errors
    /// * `InvalidParameter` if `relative` is outside `[0, 1]`, or for Vx if
    ///   the reference dose is not positive
    /// * `DataUnavailable` as for [`query`](Self::query)
    pub fn query_relative(
        &self,
        measure: Measure,
        relative: f64,
        find_nearest: bool,
    ) -> DoseEvalResult<MeasureValue> {
        if !(0.0..=1.0).contains(&relative) {
            return Err(DoseEvalError::invalid_parameter(format!(
                "relative {} parameter {} must be within [0, 1]",
                measure, relative
            )));
        }
        let scale = if measure.is_dose_parametrized() {
            if !(self.reference_dose > 0.0) {
                return Err(DoseEvalError::invalid_parameter(format!(
                    "relative {} requires a positive reference dose, got {}",
                    measure, self.reference_dose
                )));
            }
            self.reference_dose
        } else {
            self.volume
        };
        self.query(measure, relative * scale, find_nearest)
    }

    pub fn dx(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query(Measure::Dx, volume, false).map(|m| m.value)
    }

    pub fn dx_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query(Measure::Dx, volume, true)
    }

    pub fn dx_relative(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query_relative(Measure::Dx, volume, false).map(|m| m.value)
    }

    pub fn dx_relative_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query_relative(Measure::Dx, volume, true)
    }

    pub fn vx(&self, dose: f64) -> DoseEvalResult<f64> {
        self.query(Measure::Vx, dose, false).map(|m| m.value)
    }

    pub fn vx_nearest(&self, dose: f64) -> DoseEvalResult<MeasureValue> {
        self.query(Measure::Vx, dose, true)
    }

    pub fn vx_relative(&self, dose: f64) -> DoseEvalResult<f64> {
        self.query_relative(Measure::Vx, dose, false).map(|m| m.value)
    }

    pub fn vx_relative_nearest(&self, dose: f64) -> DoseEvalResult<MeasureValue> {
        self.query_relative(Measure::Vx, dose, true)
    }

    pub fn moh(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query(Measure::Moh, volume, false).map(|m| m.value)
    }

    pub fn moh_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query(Measure::Moh, volume, true)
    }

    pub fn moh_relative(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query_relative(Measure::Moh, volume, false).map(|m| m.value)
    }

    pub fn moh_relative_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query_relative(Measure::Moh, volume, true)
    }

    pub fn moc(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query(Measure::Moc, volume, false).map(|m| m.value)
    }

    pub fn moc_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query(Measure::Moc, volume, true)
    }

    pub fn moc_relative(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query_relative(Measure::Moc, volume, false).map(|m| m.value)
    }

    pub fn moc_relative_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query_relative(Measure::Moc, volume, true)
    }

    pub fn max_oh(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query(Measure::MaxOh, volume, false).map(|m| m.value)
    }

    pub fn max_oh_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query(Measure::MaxOh, volume, true)
    }

    pub fn max_oh_relative(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query_relative(Measure::MaxOh, volume, false).map(|m| m.value)
    }

    pub fn max_oh_relative_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query_relative(Measure::MaxOh, volume, true)
    }

    pub fn min_oc(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query(Measure::MinOc, volume, false).map(|m| m.value)
    }

    pub fn min_oc_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query(Measure::MinOc, volume, true)
    }

    pub fn min_oc_relative(&self, volume: f64) -> DoseEvalResult<f64> {
        self.query_relative(Measure::MinOc, volume, false).map(|m| m.value)
    }

    pub fn min_oc_relative_nearest(&self, volume: f64) -> DoseEvalResult<MeasureValue> {
        self.query_relative(Measure::MinOc, volume, true)
    }

    pub fn all_dx(&self) -> &FunctionalMeasureStore {
        &self.dx
    }

    pub fn all_vx(&self) -> &FunctionalMeasureStore {
        &self.vx
    }

    pub fn all_moh(&self) -> &FunctionalMeasureStore {
        &self.moh
    }

    pub fn all_moc(&self) -> &FunctionalMeasureStore {
        &self.moc
    }

    pub fn all_max_oh(&self) -> &FunctionalMeasureStore {
        &self.max_oh
    }

    pub fn all_min_oc(&self) -> &FunctionalMeasureStore {
        &self.min_oc
    }

    /// Replace the reference dose; non-positive values fall back to the
    /// maximum dose. Stored Vx keys are not recomputed.
    pub fn with_reference_dose(mut self, reference_dose: f64) -> Self {
        self.reference_dose = effective_reference(Some(reference_dose), self.maximum);
        self
    }

    /// Replace the whole store of one measure.
    pub fn with_store(mut self, measure: Measure, store: FunctionalMeasureStore) -> Self {
        *self.store_mut(measure) = store;
        self
    }

    pub fn with_dx(self, store: FunctionalMeasureStore) -> Self {
        self.with_store(Measure::Dx, store)
    }

    pub fn with_vx(self, store: FunctionalMeasureStore) -> Self {
        self.with_store(Measure::Vx, store)
    }

    pub fn with_moh(self, store: FunctionalMeasureStore) -> Self {
        self.with_store(Measure::Moh, store)
    }

    pub fn with_moc(self, store: FunctionalMeasureStore) -> Self {
        self.with_store(Measure::Moc, store)
    }

    pub fn with_max_oh(self, store: FunctionalMeasureStore) -> Self {
        self.with_store(Measure::MaxOh, store)
    }

    pub fn with_min_oc(self, store: FunctionalMeasureStore) -> Self {
        self.with_store(Measure::MinOc, store)
    }
}

fn effective_reference(reference_dose: Option<f64>, maximum: f64) -> f64 {
    match reference_dose {
        Some(dose) if dose > 0.0 => dose,
        _ => maximum,
    }
}

/// Accumulates statistics before sealing them into a [`DoseStatistics`].
///
/// ```rust,ignore
/// let stats = DoseStatistics::builder()
///     .extrema(1.0, 4.0)
///     .mean(2.5)
///     .std_deviation(0.8)
///     .voxels(36.0, 36.0)
///     .store(Measure::Vx, vx_store)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DoseStatisticsBuilder {
    minimum: f64,
    maximum: f64,
    mean: f64,
    std_deviation: f64,
    number_of_voxels: f64,
    volume: f64,
    reference_dose: Option<f64>,
    minimum_positions: Vec<VoxelGridIndex3D>,
    maximum_positions: Vec<VoxelGridIndex3D>,
    dx: FunctionalMeasureStore,
    vx: FunctionalMeasureStore,
    moh: FunctionalMeasureStore,
    moc: FunctionalMeasureStore,
    max_oh: FunctionalMeasureStore,
    min_oc: FunctionalMeasureStore,
}

impl DoseStatisticsBuilder {
    pub fn extrema(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn mean(mut self, mean: f64) -> Self {
        self.mean = mean;
        self
    }

    pub fn std_deviation(mut self, std_deviation: f64) -> Self {
        self.std_deviation = std_deviation;
        self
    }

    /// Fraction-weighted voxel count and volume in mm³.
    pub fn voxels(mut self, number_of_voxels: f64, volume: f64) -> Self {
        self.number_of_voxels = number_of_voxels;
        self.volume = volume;
        self
    }

    pub fn reference_dose(mut self, reference_dose: Option<f64>) -> Self {
        self.reference_dose = reference_dose;
        self
    }

    pub fn minimum_positions(mut self, positions: Vec<VoxelGridIndex3D>) -> Self {
        self.minimum_positions = positions;
        self
    }

    pub fn maximum_positions(mut self, positions: Vec<VoxelGridIndex3D>) -> Self {
        self.maximum_positions = positions;
        self
    }

    pub fn store(mut self, measure: Measure, store: FunctionalMeasureStore) -> Self {
        match measure {
            Measure::Dx => self.dx = store,
            Measure::Vx => self.vx = store,
            Measure::Moh => self.moh = store,
            Measure::Moc => self.moc = store,
            Measure::MaxOh => self.max_oh = store,
            Measure::MinOc => self.min_oc = store,
        }
        self
    }

    /// Seal the statistics. The reference dose defaults to the maximum dose.
    pub fn build(self) -> DoseStatistics {
        DoseStatistics {
            reference_dose: effective_reference(self.reference_dose, self.maximum),
            minimum: self.minimum,
            maximum: self.maximum,
            mean: self.mean,
            std_deviation: self.std_deviation,
            number_of_voxels: self.number_of_voxels,
            volume: self.volume,
            minimum_positions: self.minimum_positions,
            maximum_positions: self.maximum_positions,
            dx: self.dx,
            vx: self.vx,
            moh: self.moh,
            moc: self.moc,
            max_oh: self.max_oh,
            min_oc: self.min_oc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dose_common::ErrorKind;

    fn stats() -> DoseStatistics {
        let vx = FunctionalMeasureStore::from_entries([(10.0, 100.0), (20.0, 40.0)]).unwrap();
        let moh = FunctionalMeasureStore::from_entries([(50.0, 30.0), (100.0, 25.0)]).unwrap();
        DoseStatistics::builder()
            .extrema(5.0, 40.0)
            .mean(25.0)
            .std_deviation(3.0)
            .voxels(100.0, 100.0)
            .store(Measure::Vx, vx)
            .store(Measure::Moh, moh)
            .build()
    }

    #[test]
    fn test_reference_dose_defaults_to_maximum() {
        assert_eq!(stats().reference_dose(), 40.0);
        assert_eq!(stats().with_reference_dose(50.0).reference_dose(), 50.0);
        assert_eq!(stats().with_reference_dose(-1.0).reference_dose(), 40.0);
        let explicit = DoseStatistics::builder()
            .extrema(0.0, 10.0)
            .reference_dose(Some(0.0))
            .build();
        assert_eq!(explicit.reference_dose(), 10.0);
    }

    #[test]
    fn test_variance() {
        assert_eq!(stats().variance(), 9.0);
    }

    #[test]
    fn test_relative_queries() {
        let stats = stats();
        // 0.25 * reference dose 40 = 10
        assert_eq!(stats.vx_relative(0.25).unwrap(), 100.0);
        // 0.5 * volume 100 = 50
        assert_eq!(stats.moh_relative(0.5).unwrap(), 30.0);
        assert_eq!(stats.moh_relative_nearest(0.9).unwrap().key, 100.0);

        assert_eq!(stats.vx_relative(1.2).unwrap_err().kind(), ErrorKind::InvalidParameter);
        assert_eq!(stats.moh_relative(-0.1).unwrap_err().kind(), ErrorKind::InvalidParameter);
        assert_eq!(stats.moc_relative(f64::NAN).unwrap_err().kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_relative_vx_needs_positive_reference() {
        let zero = DoseStatistics::builder().extrema(0.0, 0.0).build();
        assert_eq!(zero.vx_relative(0.5).unwrap_err().kind(), ErrorKind::InvalidParameter);
        // Volume-relative measures do not depend on the reference dose.
        assert_eq!(zero.dx_relative(0.5).unwrap_err().kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_empty_store_is_unavailable() {
        let stats = stats();
        let err = stats.dx(10.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.to_string().contains("Dx"));
        assert_eq!(stats.min_oc_nearest(10.0).unwrap_err().kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn test_store_replacement() {
        let replacement = FunctionalMeasureStore::from_entries([(1.0, 7.0)]).unwrap();
        let stats = stats().with_dx(replacement.clone());
        assert_eq!(stats.dx(1.0).unwrap(), 7.0);
        assert_eq!(stats.all_dx(), &replacement);
        assert_eq!(stats.all_vx().len(), 2);

        let cleared = stats.with_vx(FunctionalMeasureStore::new());
        assert!(cleared.vx(10.0).is_err());
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(stats()).unwrap();
        assert_eq!(json["maximum"], 40.0);
        assert_eq!(json["vx"]["entries"][0][0], 10.0);
        let back: DoseStatistics = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats());
    }
}
