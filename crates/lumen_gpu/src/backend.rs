//! GPU render backend.
//!
//! Camera rays are generated on the host with the same camera and random
//! streams the CPU backends use. Paths are uploaded in batches and the
//! bounce kernel is dispatched once per depth before reading them back.

use rand::RngCore;
use wgpu::util::DeviceExt;

use crate::kernel::{TraceKernel, TRACE_SHADER, WORKGROUP_SIZE};
use crate::marshal::{
    accumulate, pack_scene, read_paths, resolve, GpuMaterial, GpuSurface, Params, PathState,
};
use crate::{GpuContext, GpuError};
use lumen_core::Scene;
use lumen_renderer::{
    sample_rng, Camera, ImageBuffer, JitteredSampler, PixelAccumulator, PixelSampler,
    RenderBackend, RenderConfig, RenderError, RenderOutput, SamplingStrategy,
};

const PATH_STATE_SIZE: u64 = std::mem::size_of::<PathState>() as u64;

/// Paths that fit in one dispatch under the device limits.
pub fn batch_capacity(limits: &wgpu::Limits) -> usize {
    let by_binding = limits.max_storage_buffer_binding_size as u64 / PATH_STATE_SIZE;
    let by_buffer = limits.max_buffer_size / PATH_STATE_SIZE;
    let by_dispatch = limits.max_compute_workgroups_per_dimension as u64 * WORKGROUP_SIZE as u64;
    by_binding.min(by_buffer).min(by_dispatch).max(1) as usize
}

/// Fail early for configurations the kernel cannot render.
pub fn check_support(config: &RenderConfig) -> Result<(), GpuError> {
    match config.sampling {
        SamplingStrategy::StochasticPath => Ok(()),
        other => Err(GpuError::UnsupportedSampling(other)),
    }
}

/// Camera path `index` of the whole image, in pixel-major order.
fn primary_path(
    index: u64,
    camera: &Camera,
    sampler: &JitteredSampler,
    config: &RenderConfig,
) -> PathState {
    let samples = sampler.samples as u64;
    let pixel = index / samples;
    let sample = (index % samples) as u32;
    let (x, y) = (
        (pixel % config.width as u64) as u32,
        (pixel / config.width as u64) as u32,
    );

    let mut rng = sample_rng(config.seed, pixel, sample);
    let ray = camera.get_ray(x, y, sampler.offset(sample, &mut rng));
    PathState::primary(&ray, pixel as u32, rng.next_u32())
}

/// Stochastic path tracing on a wgpu compute device.
pub struct GpuBackend {
    context: GpuContext,
    kernel: TraceKernel,
}

impl GpuBackend {
    /// Open a device and build the kernel.
    pub fn new() -> Result<Self, GpuError> {
        let context = GpuContext::new()?;
        let kernel = TraceKernel::build(&context.device, TRACE_SHADER)?;
        Ok(Self { context, kernel })
    }

    /// Check `config` first so unsupported settings never touch the device.
    pub fn for_config(config: &RenderConfig) -> Result<Self, GpuError> {
        check_support(config)?;
        Self::new()
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Render the image, returning device errors unwrapped.
    pub fn render_image(
        &self,
        scene: &Scene,
        config: &RenderConfig,
    ) -> Result<ImageBuffer, GpuError> {
        check_support(config)?;

        let (surfaces, materials) = pack_scene(scene);
        let surface_count = scene.len() as u32;
        let camera = Camera::from_config(config);
        let sampler = JitteredSampler {
            samples: config.samples_per_pixel,
        };

        let pixel_count = config.width as u64 * config.height as u64;
        let total = pixel_count * config.samples_per_pixel as u64;
        let capacity = batch_capacity(&self.context.device.limits()) as u64;
        log::debug!(
            "Tracing {} paths in batches of up to {}, {} passes each",
            total,
            capacity,
            config.max_bounce_depth + 1
        );

        let device = &self.context.device;
        let surface_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("surfaces"),
            contents: bytemuck::cast_slice::<GpuSurface, u8>(&surfaces),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("materials"),
            contents: bytemuck::cast_slice::<GpuMaterial, u8>(&materials),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let mut pixels = vec![PixelAccumulator::new(); pixel_count as usize];
        let mut start = 0;
        while start < total {
            let end = (start + capacity).min(total);
            let paths: Vec<PathState> = (start..end)
                .map(|index| primary_path(index, &camera, &sampler, config))
                .collect();

            let traced = self.trace_batch(
                &paths,
                &surface_buffer,
                &material_buffer,
                surface_count,
                config,
            )?;
            accumulate(&mut pixels, &traced);
            log::debug!("Traced paths {}..{} of {}", start, end, total);
            start = end;
        }

        Ok(resolve(&pixels, config.width, config.height))
    }

    fn trace_batch(
        &self,
        paths: &[PathState],
        surfaces: &wgpu::Buffer,
        materials: &wgpu::Buffer,
        surface_count: u32,
        config: &RenderConfig,
    ) -> Result<Vec<PathState>, GpuError> {
        let device = &self.context.device;
        let queue = &self.context.queue;
        let ray_count = paths.len() as u32;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let path_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("paths"),
            contents: bytemuck::cast_slice(paths),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params"),
            size: std::mem::size_of::<Params>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("paths readback"),
            size: paths.len() as u64 * PATH_STATE_SIZE,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trace bind group"),
            layout: &self.kernel.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: surfaces.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: materials.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: path_buffer.as_entire_binding(),
                },
            ],
        });

        let workgroups = ray_count.div_ceil(WORKGROUP_SIZE);
        for depth in (0..=config.max_bounce_depth).rev() {
            let params = Params::new(config, surface_count, depth, ray_count);
            queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trace encoder"),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("trace pass"),
                    ..Default::default()
                });
                pass.set_pipeline(&self.kernel.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(workgroups, 1, 1);
            }
            queue.submit(Some(encoder.finish()));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
        encoder.copy_buffer_to_buffer(&path_buffer, 0, &readback, 0, readback.size());
        queue.submit(Some(encoder.finish()));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::Validation(error.to_string()));
        }

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::Readback("map_async channel closed".into()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let traced = read_paths(&slice.get_mapped_range());
        readback.unmap();
        Ok(traced)
    }
}

impl RenderBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn render(&self, scene: &Scene, config: &RenderConfig) -> Result<RenderOutput, RenderError> {
        config.validate()?;
        let image = self
            .render_image(scene, config)
            .map_err(|e| RenderError::Backend {
                backend: self.name(),
                source: Box::new(e),
            })?;

        // Rays are not counted on the device
        Ok(RenderOutput { image, rays: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Material, Plane};
    use lumen_renderer::{Color, RenderContext, SequentialBackend, Vec3};

    fn backend_or_skip() -> Option<GpuBackend> {
        let _ = env_logger::builder().is_test(true).try_init();
        match GpuBackend::new() {
            Ok(backend) => Some(backend),
            Err(e) => {
                log::warn!("Skipping GPU test: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_batch_capacity_respects_limits() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 64 * 1000,
            max_compute_workgroups_per_dimension: 65535,
            ..wgpu::Limits::default()
        };
        assert_eq!(batch_capacity(&limits), 1000);

        let limits = wgpu::Limits {
            max_compute_workgroups_per_dimension: 2,
            ..wgpu::Limits::default()
        };
        assert_eq!(batch_capacity(&limits), 128);
    }

    #[test]
    fn test_distributed_sampling_rejected() {
        let config = RenderConfig {
            sampling: SamplingStrategy::StratifiedDistributed,
            ..Default::default()
        };
        assert!(matches!(
            check_support(&config),
            Err(GpuError::UnsupportedSampling(SamplingStrategy::StratifiedDistributed))
        ));
        // Rejected before any adapter is requested
        assert!(matches!(
            GpuBackend::for_config(&config),
            Err(GpuError::UnsupportedSampling(_))
        ));
    }

    #[test]
    fn test_primary_paths_match_cpu_camera() {
        let config = RenderConfig {
            width: 5,
            height: 3,
            samples_per_pixel: 2,
            ..Default::default()
        };
        let camera = Camera::from_config(&config);
        let sampler = JitteredSampler { samples: 2 };
        let scene = Scene::new();
        let context = RenderContext::new(&scene, &config).unwrap();

        // Pixel (3, 2), sample 1
        let path = primary_path((2 * 5 + 3) * 2 + 1, &camera, &sampler, &config);
        assert_eq!(path.pixel, 13);
        assert_eq!(path.alive, 1);
        assert_eq!(path.weight, 1.0);

        let mut rng = sample_rng(config.seed, 13, 1);
        let expected = context
            .camera()
            .get_ray(3, 2, sampler.offset(1, &mut rng))
            .direction
            .as_vec3()
            .to_array();
        assert_eq!(path.direction, expected);
    }

    #[test]
    fn test_broken_kernel_reports_log() {
        let Some(backend) = backend_or_skip() else {
            return;
        };
        let result = TraceKernel::build(&backend.context().device, "fn broken( {");
        match result {
            Err(GpuError::KernelBuild { log }) => assert!(!log.is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("broken kernel compiled"),
        }
    }

    #[test]
    fn test_terminal_render_matches_cpu() {
        let Some(backend) = backend_or_skip() else {
            return;
        };
        let scene = Scene::new().with(Plane::new(
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::NEG_Y,
            Material::new(Color::new(0.2, 0.4, 0.6), 0.0, 1.0),
        ));
        let config = RenderConfig {
            width: 8,
            height: 8,
            max_bounce_depth: 0,
            ..Default::default()
        };

        let output = backend.render(&scene, &config).unwrap();
        assert_eq!(output.rays, None);
        let expected = Color::new(0.5, 0.6, 0.7) * 255.0;
        for pixel in &output.image.pixels {
            assert!((*pixel - expected).length() < 1e-3, "{pixel:?}");
        }
    }

    #[test]
    fn test_showcase_agrees_with_cpu_statistically() {
        let Some(backend) = backend_or_skip() else {
            return;
        };
        let scene = Scene::showcase();
        let config = RenderConfig {
            width: 16,
            height: 16,
            samples_per_pixel: 16,
            ..Default::default()
        };

        let gpu = backend.render(&scene, &config).unwrap();
        let cpu = SequentialBackend.render(&scene, &config).unwrap();

        let difference = (gpu.image.mean() - cpu.image.mean()).abs();
        assert!(difference.max_element() < 5.0, "mean difference {difference:?}");
    }
}
