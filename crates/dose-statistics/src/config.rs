//! Configuration for dose statistics calculation.

use serde::{Deserialize, Serialize};

/// Default relative thresholds for both dose and volume measures.
const DEFAULT_THRESHOLDS: [f64; 6] = [0.02, 0.05, 0.1, 0.9, 0.95, 0.98];

/// A requested measure parameter.
///
/// Relative values are fractions in `[0, 1]` of the reference dose (dose
/// thresholds) or of the structure volume (volume thresholds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    Relative(f64),
    Absolute(f64),
}

impl Threshold {
    /// Parse from string: `abs:<value>` is absolute, `rel:<value>` or a bare
    /// number is relative.
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(v) = s.strip_prefix("abs:") {
            v.trim().parse().ok().map(Self::Absolute)
        } else if let Some(v) = s.strip_prefix("rel:") {
            v.trim().parse().ok().map(Self::Relative)
        } else {
            s.parse().ok().map(Self::Relative)
        }
    }

    /// Absolute value for a given reference (`reference dose` or `volume`).
    pub fn resolve(&self, scale: f64) -> f64 {
        match *self {
            Self::Relative(x) => x * scale,
            Self::Absolute(x) => x,
        }
    }

    fn check(&self) -> Result<(), String> {
        match *self {
            Self::Relative(x) if !(0.0..=1.0).contains(&x) => {
                Err(format!("relative threshold {} must be within [0, 1]", x))
            }
            Self::Absolute(x) if !x.is_finite() || x < 0.0 => {
                Err(format!("absolute threshold {} must be finite and >= 0", x))
            }
            _ => Ok(()),
        }
    }
}

/// Configuration for the statistics calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Compute the functional measures (Dx, Vx, MOHx, MOCx, MaxOHx, MinOCx).
    pub compute_complex_statistics: bool,

    /// Normalisation dose for relative dose queries. Unset or non-positive
    /// falls back to the maximum dose.
    pub reference_dose: Option<f64>,

    /// Vx parameters, relative to the reference dose.
    pub dose_thresholds: Vec<Threshold>,

    /// Dx, MOHx, MOCx, MaxOHx and MinOCx parameters, relative to the
    /// structure volume.
    pub volume_thresholds: Vec<Threshold>,

    /// Cap on stored minimum/maximum voxel positions (`None` keeps all).
    pub max_extrema_positions: Option<usize>,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            compute_complex_statistics: false,
            reference_dose: None,
            dose_thresholds: DEFAULT_THRESHOLDS.iter().map(|&x| Threshold::Relative(x)).collect(),
            volume_thresholds: DEFAULT_THRESHOLDS.iter().map(|&x| Threshold::Relative(x)).collect(),
            max_extrema_positions: None,
        }
    }
}

impl StatisticsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DOSE_STATS_COMPLEX") {
            config.compute_complex_statistics = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("DOSE_STATS_REFERENCE_DOSE") {
            config.reference_dose = val.parse().ok();
        }

        if let Ok(val) = std::env::var("DOSE_STATS_DOSE_THRESHOLDS") {
            config.dose_thresholds = parse_thresholds(&val);
        }

        if let Ok(val) = std::env::var("DOSE_STATS_VOLUME_THRESHOLDS") {
            config.volume_thresholds = parse_thresholds(&val);
        }

        if let Ok(val) = std::env::var("DOSE_STATS_MAX_EXTREMA_POSITIONS") {
            config.max_extrema_positions = val.parse().ok();
        }

        config
    }

    /// Default configuration with functional measures enabled.
    pub fn complex() -> Self {
        Self {
            compute_complex_statistics: true,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dose) = self.reference_dose {
            if !dose.is_finite() {
                return Err(format!("reference_dose must be finite, got {}", dose));
            }
        }

        for threshold in self.dose_thresholds.iter().chain(&self.volume_thresholds) {
            threshold.check()?;
        }

        Ok(())
    }
}

/// Parse a comma-separated threshold list, skipping unparsable entries.
fn parse_thresholds(s: &str) -> Vec<Threshold> {
    s.split(',')
        .filter(|t| !t.trim().is_empty())
        .filter_map(Threshold::from_str)
        .collect()
}
