//! Render driver.
//!
//! A [`RenderContext`] is built once per render from the scene and the
//! configuration. It owns the camera and the strategy objects, and turns a
//! pixel coordinate into a finalized colour. Backends decide which pixels
//! run where.

use crate::camera::Camera;
use crate::config::{ConfigError, RenderConfig};
use crate::integrator::{build_integrator, Integrator, Shaded};
use crate::random::sample_rng;
use crate::sampler::{build_sampler, PixelSampler};
use lumen_core::Scene;
use lumen_math::{Color, Interval};
use rayon::prelude::*;
use thiserror::Error;

/// Errors that stop a render before or during execution.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid render config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{backend} backend failed: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Running sum of one pixel's samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelAccumulator {
    sum: Color,
    samples: u32,
    rays: u64,
}

impl PixelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one camera sample.
    pub fn add(&mut self, shaded: Shaded) {
        self.sum += shaded.colour;
        self.samples += 1;
        self.rays += shaded.rays;
    }

    /// Combine two partial sums of the same pixel.
    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            samples: self.samples + other.samples,
            rays: self.rays + other.rays,
        }
    }

    /// Mean colour on the 0-255 scale. Black if nothing was added.
    pub fn finalize(&self) -> Color {
        if self.samples == 0 {
            return Color::ZERO;
        }
        self.sum / self.samples as f64 * 255.0
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn rays(&self) -> u64 {
        self.rays
    }
}

const CHANNEL_RANGE: Interval = Interval::new(0.0, 255.0);

/// Clamp a 0-255 channel value and round it to a byte.
#[inline]
pub fn quantize(channel: f64) -> u8 {
    // NaN clamps to NaN, which `as` maps to 0
    CHANNEL_RANGE.clamp(channel).round() as u8
}

/// Row-major image of finalized colours on the 0-255 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Convert to packed RGB bytes, top row first.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for color in &self.pixels {
            bytes.extend_from_slice(&[quantize(color.x), quantize(color.y), quantize(color.z)]);
        }
        bytes
    }

    /// Mean of all pixel values.
    pub fn mean(&self) -> Color {
        if self.pixels.is_empty() {
            return Color::ZERO;
        }
        self.pixels.iter().sum::<Color>() / self.pixels.len() as f64
    }
}

/// Everything needed to shade pixels of one render.
pub struct RenderContext<'a> {
    scene: &'a Scene,
    config: &'a RenderConfig,
    camera: Camera,
    integrator: Box<dyn Integrator>,
    sampler: Box<dyn PixelSampler>,
}

impl<'a> RenderContext<'a> {
    /// Validate the configuration and build the strategy objects.
    pub fn new(scene: &'a Scene, config: &'a RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;

        let integrator = build_integrator(config);
        let sampler = build_sampler(config);
        log::debug!(
            "{} integrator, {} samples per pixel, depth {}",
            integrator.name(),
            sampler.samples_per_pixel(),
            config.max_bounce_depth
        );

        Ok(Self {
            scene,
            config,
            camera: Camera::from_config(config),
            integrator,
            sampler,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.sampler.samples_per_pixel()
    }

    /// Trace camera sample `sample` of pixel (x, y).
    pub fn trace_sample(&self, x: u32, y: u32, sample: u32) -> Shaded {
        let pixel_index = y as u64 * self.config.width as u64 + x as u64;
        let mut rng = sample_rng(self.config.seed, pixel_index, sample);

        let offset = self.sampler.offset(sample, &mut rng);
        let ray = self.camera.get_ray(x, y, offset);
        self.integrator
            .shade(&ray, self.scene, self.config.max_bounce_depth, &mut rng)
    }

    /// All samples of pixel (x, y), traced in order.
    pub fn render_pixel(&self, x: u32, y: u32) -> PixelAccumulator {
        let mut pixel = PixelAccumulator::new();
        for sample in 0..self.samples_per_pixel() {
            pixel.add(self.trace_sample(x, y, sample));
        }
        pixel
    }

    /// All samples of pixel (x, y), spread over the rayon pool.
    pub fn render_pixel_parallel(&self, x: u32, y: u32) -> PixelAccumulator {
        (0..self.samples_per_pixel())
            .into_par_iter()
            .map(|sample| {
                let mut pixel = PixelAccumulator::new();
                pixel.add(self.trace_sample(x, y, sample));
                pixel
            })
            .reduce(PixelAccumulator::new, PixelAccumulator::merge)
    }
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub image: ImageBuffer,
    /// Total rays traced, when the backend counts them
    pub rays: Option<u64>,
}

/// An execution strategy for a whole image.
pub trait RenderBackend {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn render(&self, scene: &Scene, config: &RenderConfig) -> Result<RenderOutput, RenderError>;
}

/// Every pixel on the calling thread, row by row.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBackend;

impl RenderBackend for SequentialBackend {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn render(&self, scene: &Scene, config: &RenderConfig) -> Result<RenderOutput, RenderError> {
        let context = RenderContext::new(scene, config)?;
        let mut image = ImageBuffer::new(config.width, config.height);
        let mut rays = 0;

        for y in 0..config.height {
            for x in 0..config.width {
                let pixel = context.render_pixel(x, y);
                rays += pixel.rays();
                image.set(x, y, pixel.finalize());
            }
            log::trace!("row {}/{} done", y + 1, config.height);
        }

        Ok(RenderOutput {
            image,
            rays: Some(rays),
        })
    }
}

/// Render the whole scene on the calling thread.
pub fn render(scene: &Scene, config: &RenderConfig) -> Result<RenderOutput, RenderError> {
    SequentialBackend.render(scene, config)
}
