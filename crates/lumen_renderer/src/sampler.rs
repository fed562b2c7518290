//! Sub-pixel sample placement.

use crate::config::{RenderConfig, SamplingStrategy};
use crate::random::gen_f64;
use lumen_math::grid_cell;
use rand::RngCore;

/// Chooses where inside a pixel each camera ray goes.
pub trait PixelSampler: Send + Sync {
    /// Camera rays per pixel.
    fn samples_per_pixel(&self) -> u32;

    /// Offset in `[0, 1)^2` for sample `sample` of a pixel.
    fn offset(&self, sample: u32, rng: &mut dyn RngCore) -> (f64, f64);
}

/// Uniformly random offsets.
#[derive(Debug, Clone, Copy)]
pub struct JitteredSampler {
    pub samples: u32,
}

impl PixelSampler for JitteredSampler {
    fn samples_per_pixel(&self) -> u32 {
        self.samples
    }

    fn offset(&self, _sample: u32, rng: &mut dyn RngCore) -> (f64, f64) {
        (gen_f64(rng), gen_f64(rng))
    }
}

/// Centre of each cell of a `grid_size x grid_size` grid over the pixel.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSampler {
    pub grid_size: u32,
}

impl PixelSampler for StratifiedSampler {
    fn samples_per_pixel(&self) -> u32 {
        self.grid_size * self.grid_size
    }

    fn offset(&self, sample: u32, _rng: &mut dyn RngCore) -> (f64, f64) {
        let half_cell = 0.5 / self.grid_size as f64;
        let (u, v) = grid_cell(sample, self.grid_size);
        (u + half_cell, v + half_cell)
    }
}

/// Pixel sampler for the configured sampling strategy.
pub fn build_sampler(config: &RenderConfig) -> Box<dyn PixelSampler> {
    match config.sampling {
        SamplingStrategy::StochasticPath => Box::new(JitteredSampler {
            samples: config.samples_per_pixel,
        }),
        SamplingStrategy::StratifiedDistributed => Box::new(StratifiedSampler {
            grid_size: config.grid_size,
        }),
    }
}
