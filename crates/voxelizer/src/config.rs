//! Configuration for the voxelization engine.

use serde::{Deserialize, Serialize};

/// Configuration for mask generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelizerConfig {
    /// Reject structures with self-intersecting or overlapping contours.
    /// When false, topology problems are logged and voxelization proceeds.
    pub strict: bool,

    /// Coverage backend used to compute per-voxel fractions.
    pub backend: MaskBackend,

    /// Sub-samples per voxel edge for the sampled backend.
    pub sample_resolution: usize,

    /// Voxelize slices on the rayon thread pool.
    pub parallel: bool,
}

impl Default for VoxelizerConfig {
    fn default() -> Self {
        Self {
            strict: true,
            backend: MaskBackend::Clipping,
            sample_resolution: 10,
            parallel: true,
        }
    }
}

impl VoxelizerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VOXELIZER_STRICT") {
            config.strict = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("VOXELIZER_BACKEND") {
            config.backend = MaskBackend::from_str(&val);
        }

        if let Ok(val) = std::env::var("VOXELIZER_SAMPLE_RESOLUTION") {
            if let Ok(n) = val.parse() {
                config.sample_resolution = n;
            }
        }

        if let Ok(val) = std::env::var("VOXELIZER_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Lenient variant of the default configuration.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_resolution == 0 {
            return Err("sample_resolution must be > 0".to_string());
        }

        if self.sample_resolution > 1000 {
            return Err("sample_resolution must be <= 1000".to_string());
        }

        Ok(())
    }
}

/// Coverage backend for mask generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskBackend {
    /// Exact polygon clipping against each voxel footprint.
    #[default]
    Clipping,
    /// Legacy point sampling on a regular sub-voxel lattice.
    Sampled,
}

impl MaskBackend {
    /// Parse from string (case-insensitive). Unknown values select clipping.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sampled" | "legacy" => Self::Sampled,
            _ => Self::Clipping,
        }
    }

    /// Get the backend name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clipping => "clipping",
            Self::Sampled => "sampled",
        }
    }
}

impl std::fmt::Display for MaskBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VoxelizerConfig::default();
        assert!(config.strict);
        assert_eq!(config.backend, MaskBackend::Clipping);
        assert_eq!(config.sample_resolution, 10);
        assert!(config.parallel);
        assert!(!VoxelizerConfig::lenient().strict);
    }

    #[test]
    fn test_config_validation() {
        let mut config = VoxelizerConfig::default();
        assert!(config.validate().is_ok());

        config.sample_resolution = 0;
        assert!(config.validate().is_err());

        config.sample_resolution = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(MaskBackend::from_str("clipping"), MaskBackend::Clipping);
        assert_eq!(MaskBackend::from_str("SAMPLED"), MaskBackend::Sampled);
        assert_eq!(MaskBackend::from_str("legacy"), MaskBackend::Sampled);
        assert_eq!(MaskBackend::from_str("bogus"), MaskBackend::Clipping);
        assert_eq!(MaskBackend::Sampled.to_string(), "sampled");
    }

    #[test]
    fn test_config_from_json() {
        let config: VoxelizerConfig =
            serde_json::from_str(r#"{"strict": false, "backend": "sampled"}"#).unwrap();
        assert!(!config.strict);
        assert_eq!(config.backend, MaskBackend::Sampled);
        assert_eq!(config.sample_resolution, 10);
    }
}
