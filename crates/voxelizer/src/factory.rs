//! Construction of a mask generator from configuration.

use dose_common::{DoseEvalError, DoseEvalResult};

use crate::config::{MaskBackend, VoxelizerConfig};
use crate::engine::{ClippingCoverage, MaskGenerator, SampledCoverage, VoxelizationEngine};

/// Create the mask generator selected by `config.backend`.
///
/// Fails with `ConfigError` if the configuration does not validate.
pub fn mask_generator(config: &VoxelizerConfig) -> DoseEvalResult<Box<dyn MaskGenerator>> {
    config.validate().map_err(DoseEvalError::ConfigError)?;

    let generator: Box<dyn MaskGenerator> = match config.backend {
        MaskBackend::Clipping => Box::new(VoxelizationEngine::new(ClippingCoverage, config)),
        MaskBackend::Sampled => Box::new(VoxelizationEngine::new(
            SampledCoverage::new(config.sample_resolution),
            config,
        )),
    };

    tracing::debug!(
        backend = generator.name(),
        strict = config.strict,
        parallel = config.parallel,
        "Created mask generator"
    );

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dose_common::ErrorKind;

    #[test]
    fn test_backend_selection() {
        let clipping = mask_generator(&VoxelizerConfig::default()).unwrap();
        assert_eq!(clipping.name(), "clipping");

        let config = VoxelizerConfig {
            backend: MaskBackend::Sampled,
            ..VoxelizerConfig::default()
        };
        assert_eq!(mask_generator(&config).unwrap().name(), "sampled");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VoxelizerConfig {
            sample_resolution: 0,
            ..VoxelizerConfig::default()
        };
        let err = mask_generator(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
