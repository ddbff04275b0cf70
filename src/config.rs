use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::circles::{DedupParams, ExtractionParams, InnerCircleParams};
use crate::detection::classifier::MarkerCatalog;
use crate::detection::preprocessing::PreprocessingParams;
use crate::error::ConfigError;
use crate::spatial::SpatialParams;
use crate::stabilizer::{StabilizerParams, MAX_COOLDOWN_SECS};

/// Every tunable of the pipeline. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocessing: PreprocessingParams,
    pub extraction: ExtractionParams,
    pub dedup: DedupParams,
    pub inner_circles: InnerCircleParams,
    pub spatial: SpatialParams,
    pub stabilizer: StabilizerParams,
    pub catalog: MarkerCatalog,
}

impl Config {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.preprocessing;
        if !(p.blur_sigma > 0.0) {
            return Err(ConfigError::invalid("preprocessing.blur_sigma", "must be positive"));
        }
        if p.canny_low > p.canny_high {
            return Err(ConfigError::invalid(
                "preprocessing.canny_low",
                format!("{} exceeds canny_high {}", p.canny_low, p.canny_high),
            ));
        }

        let e = &self.extraction;
        if e.min_area < 0.0 || e.min_perimeter < 0.0 {
            return Err(ConfigError::invalid("extraction", "minimum area and perimeter must be >= 0"));
        }
        if !(0.0..=1.0).contains(&e.min_circularity) {
            return Err(ConfigError::invalid("extraction.min_circularity", "must lie in [0, 1]"));
        }
        if e.min_axis_ratio > e.max_axis_ratio {
            return Err(ConfigError::invalid(
                "extraction.min_axis_ratio",
                format!("{} exceeds max_axis_ratio {}", e.min_axis_ratio, e.max_axis_ratio),
            ));
        }

        if !(self.dedup.center_tolerance > 0.0) || !(self.dedup.size_tolerance > 0.0) {
            return Err(ConfigError::invalid("dedup", "tolerances must be positive"));
        }

        let c = &self.inner_circles;
        if c.min_radius > c.max_radius {
            return Err(ConfigError::invalid(
                "inner_circles.min_radius",
                format!("{} exceeds max_radius {}", c.min_radius, c.max_radius),
            ));
        }

        let s = &self.spatial;
        if !(s.max_distance_m > 0.0) || s.min_distance_m > s.max_distance_m {
            return Err(ConfigError::invalid(
                "spatial",
                format!("bad distance range [{}, {}]", s.min_distance_m, s.max_distance_m),
            ));
        }

        let cooldown = self.stabilizer.cooldown_secs;
        if !(0.0..=MAX_COOLDOWN_SECS).contains(&cooldown) {
            return Err(ConfigError::invalid(
                "stabilizer.cooldown_secs",
                format!("{} is outside [0, {}]", cooldown, MAX_COOLDOWN_SECS),
            ));
        }

        Ok(())
    }
}
