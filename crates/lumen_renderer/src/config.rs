//! Render configuration.
//!
//! Read once at render start. The sampling and execution strategies chosen
//! here are turned into strategy objects before the first pixel.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default recursion depth for each camera ray.
pub const MAX_RAY_DEPTH_PER_PIXEL: u32 = 4;
/// Default camera rays per pixel in stochastic mode.
pub const INITIAL_RAYS_PER_PIXEL: u32 = 4;
/// Default stratification factor.
pub const GRID_SIZE: u32 = 3;
/// Default run seed.
pub const DEFAULT_SEED: u64 = 32_743_290;
/// Default tile edge for data-parallel rendering.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;
/// Largest accepted stratification factor. `G^2` rays per pixel stays in `u32`.
pub const MAX_GRID_SIZE: u32 = 256;
/// Largest accepted bounce depth. Paths recurse once per level on the stack.
pub const MAX_BOUNCE_DEPTH: u32 = 64;

/// How the rendering integral is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Jittered camera rays, one random bounce or shadow ray per level
    #[default]
    StochasticPath,
    /// Grid-stratified camera rays, light samples and reflection fan-out
    StratifiedDistributed,
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SamplingStrategy::StochasticPath => "stochastic path",
            SamplingStrategy::StratifiedDistributed => "stratified distributed",
        })
    }
}

/// Where per-pixel sampling runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Sequential,
    #[default]
    DataParallel,
    GpuOffload,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStrategy::Sequential => "sequential",
            ExecutionStrategy::DataParallel => "data parallel",
            ExecutionStrategy::GpuOffload => "gpu offload",
        })
    }
}

/// Errors from loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse render config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),

    #[error("{name} must be at most {max}, got {value}")]
    TooLarge {
        name: &'static str,
        max: u32,
        value: u32,
    },

    #[error("{name} must be {requirement}, got {value}")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Maximum ray bounce depth
    pub max_bounce_depth: u32,
    /// Camera rays per pixel in stochastic mode
    pub samples_per_pixel: u32,
    /// Stratification factor G; distributed mode uses G*G samples everywhere
    pub grid_size: u32,
    /// Vertical field of view in degrees
    pub field_of_view_degrees: f64,
    pub sampling: SamplingStrategy,
    pub execution: ExecutionStrategy,
    /// Run seed every random stream is derived from
    pub seed: u64,
    /// Worker threads for data-parallel rendering (None = one per core)
    pub threads: Option<usize>,
    /// Tile edge in pixels for data-parallel rendering
    pub bucket_size: u32,
    /// Also fan each pixel's samples out to the thread pool
    pub parallel_samples: bool,
    /// Hits closer than this are ignored for shading
    pub hit_epsilon: f64,
    /// Offset of shadow-ray origins along the surface normal
    pub shadow_bias: f64,
    /// Random perturbation of the mirror direction
    pub fuzz: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            max_bounce_depth: MAX_RAY_DEPTH_PER_PIXEL,
            samples_per_pixel: INITIAL_RAYS_PER_PIXEL,
            grid_size: GRID_SIZE,
            field_of_view_degrees: 90.0,
            sampling: SamplingStrategy::default(),
            execution: ExecutionStrategy::default(),
            seed: DEFAULT_SEED,
            threads: None,
            bucket_size: DEFAULT_BUCKET_SIZE,
            parallel_samples: false,
            hit_epsilon: 0.001,
            shadow_bias: 0.01,
            fuzz: 0.8,
        }
    }
}

impl RenderConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Camera rays traced per pixel under the configured sampling strategy.
    pub fn rays_per_pixel(&self) -> u32 {
        match self.sampling {
            SamplingStrategy::StochasticPath => self.samples_per_pixel,
            SamplingStrategy::StratifiedDistributed => self.grid_size * self.grid_size,
        }
    }

    /// Check the configuration before any work is done.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroCount("samples_per_pixel"));
        }
        if self.grid_size == 0 {
            return Err(ConfigError::ZeroCount("grid_size"));
        }
        if self.bucket_size == 0 {
            return Err(ConfigError::ZeroCount("bucket_size"));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroCount("threads"));
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::TooLarge {
                name: "grid_size",
                max: MAX_GRID_SIZE,
                value: self.grid_size,
            });
        }
        if self.max_bounce_depth > MAX_BOUNCE_DEPTH {
            return Err(ConfigError::TooLarge {
                name: "max_bounce_depth",
                max: MAX_BOUNCE_DEPTH,
                value: self.max_bounce_depth,
            });
        }

        let out_of_range = |name, requirement, value| ConfigError::OutOfRange {
            name,
            requirement,
            value,
        };
        let fov = self.field_of_view_degrees;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(out_of_range("field_of_view_degrees", "in (0, 180)", fov));
        }
        if !(self.hit_epsilon > 0.0 && self.hit_epsilon.is_finite()) {
            return Err(out_of_range("hit_epsilon", "positive", self.hit_epsilon));
        }
        if !(self.shadow_bias >= 0.0 && self.shadow_bias.is_finite()) {
            return Err(out_of_range("shadow_bias", "non-negative", self.shadow_bias));
        }
        if !(self.fuzz >= 0.0 && self.fuzz.is_finite()) {
            return Err(out_of_range("fuzz", "non-negative", self.fuzz));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RenderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_bounce_depth, 4);
        assert_eq!(config.samples_per_pixel, 4);
        assert_eq!(config.field_of_view_degrees, 90.0);
        assert_eq!(config.hit_epsilon, 0.001);
        assert_eq!(config.fuzz, 0.8);
    }

    #[test]
    fn test_rays_per_pixel() {
        let mut config = RenderConfig {
            samples_per_pixel: 6,
            grid_size: 3,
            ..Default::default()
        };
        assert_eq!(config.rays_per_pixel(), 6);

        config.sampling = SamplingStrategy::StratifiedDistributed;
        assert_eq!(config.rays_per_pixel(), 9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RenderConfig::from_json_str(
            r#"{"width": 64, "sampling": "stratified_distributed", "execution": "sequential", "threads": 2}"#,
        )
        .unwrap();

        assert_eq!(config.width, 64);
        assert_eq!(config.height, 512);
        assert_eq!(config.sampling, SamplingStrategy::StratifiedDistributed);
        assert_eq!(config.execution, ExecutionStrategy::Sequential);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.grid_size, GRID_SIZE);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{"execution": "quantum"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = |config: RenderConfig| config.validate().unwrap_err();

        assert!(matches!(
            bad(RenderConfig { width: 0, ..Default::default() }),
            ConfigError::EmptyImage { width: 0, .. }
        ));
        assert!(matches!(
            bad(RenderConfig { grid_size: 0, ..Default::default() }),
            ConfigError::ZeroCount("grid_size")
        ));
        assert!(matches!(
            bad(RenderConfig { samples_per_pixel: 0, ..Default::default() }),
            ConfigError::ZeroCount("samples_per_pixel")
        ));
        assert!(matches!(
            bad(RenderConfig { field_of_view_degrees: 180.0, ..Default::default() }),
            ConfigError::OutOfRange { name: "field_of_view_degrees", .. }
        ));
        assert!(matches!(
            bad(RenderConfig { hit_epsilon: 0.0, ..Default::default() }),
            ConfigError::OutOfRange { name: "hit_epsilon", .. }
        ));
        assert!(matches!(
            bad(RenderConfig { fuzz: f64::NAN, ..Default::default() }),
            ConfigError::OutOfRange { name: "fuzz", .. }
        ));
    }

    #[test]
    fn test_validate_bounds_grid_size() {
        let config = RenderConfig {
            grid_size: 70_000,
            sampling: SamplingStrategy::StratifiedDistributed,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge { name: "grid_size", max: MAX_GRID_SIZE, value: 70_000 })
        ));

        let largest = RenderConfig {
            grid_size: MAX_GRID_SIZE,
            sampling: SamplingStrategy::StratifiedDistributed,
            ..Default::default()
        };
        largest.validate().unwrap();
        assert_eq!(largest.rays_per_pixel(), MAX_GRID_SIZE * MAX_GRID_SIZE);
    }

    #[test]
    fn test_validate_bounds_bounce_depth() {
        let deep = RenderConfig {
            max_bounce_depth: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            deep.validate(),
            Err(ConfigError::TooLarge { name: "max_bounce_depth", .. })
        ));

        RenderConfig {
            max_bounce_depth: MAX_BOUNCE_DEPTH,
            ..Default::default()
        }
        .validate()
        .unwrap();
    }
}
