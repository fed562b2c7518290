//! Lumen CPU renderer.
//!
//! Two integrators over the same scene model:
//! - a stochastic path tracer with jittered camera samples
//! - a stratified distributed ray tracer with grid-sampled light and
//!   reflections
//!
//! Images are rendered either on the calling thread or bucket by bucket
//! on a rayon pool. Both produce identical results for the same seed.

mod bucket;
mod camera;
mod config;
mod integrator;
mod light;
mod random;
mod renderer;
mod sampler;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DataParallelBackend};
pub use camera::Camera;
pub use config::{
    ConfigError, ExecutionStrategy, RenderConfig, SamplingStrategy, DEFAULT_BUCKET_SIZE,
    DEFAULT_SEED, GRID_SIZE, INITIAL_RAYS_PER_PIXEL, MAX_BOUNCE_DEPTH, MAX_GRID_SIZE,
    MAX_RAY_DEPTH_PER_PIXEL,
};
pub use integrator::{
    build_integrator, DistributedIntegrator, Integrator, PathIntegrator, Shaded, ShadingParams,
    AMBIENT_LIGHT, BACKGROUND, SKY,
};
pub use light::{AreaLight, LightSampler, LightSampling};
pub use random::{gen_f64, random_unit_vector, sample_rng, stream_seed};
pub use renderer::{
    quantize, render, ImageBuffer, PixelAccumulator, RenderBackend, RenderContext, RenderError,
    RenderOutput, SequentialBackend,
};
pub use sampler::{build_sampler, JitteredSampler, PixelSampler, StratifiedSampler};

/// Re-export the math and scene types renderers work with
pub use lumen_core::{Material, Scene};
pub use lumen_math::{Color, Ray, Vec3};
