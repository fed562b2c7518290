//! Host and device data layouts.
//!
//! Every struct here is `repr(C)` and mirrors a struct in `trace.wgsl`
//! field for field, padding included.

use bytemuck::{Pod, Zeroable};
use lumen_core::{Scene, Surface};
use lumen_renderer::{
    AreaLight, Color, ImageBuffer, PixelAccumulator, RenderConfig, Shaded, AMBIENT_LIGHT,
    BACKGROUND, SKY,
};
use lumen_math::{Ray, Vec3};

pub const SURFACE_PLANE: u32 = 0;
pub const SURFACE_SPHERE: u32 = 1;

/// A sphere or plane. `params` is the radius in `.x` for spheres and the
/// unit normal for planes.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct GpuSurface {
    pub position: [f32; 3],
    pub kind: u32,
    pub params: [f32; 3],
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct GpuMaterial {
    pub colour: [f32; 3],
    pub specular: f32,
    pub diffuse: f32,
    pub _pad: [f32; 3],
}

/// One camera sample in flight.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct PathState {
    pub origin: [f32; 3],
    /// 1 while the path still needs shading
    pub alive: u32,
    pub direction: [f32; 3],
    /// Device random state
    pub rng: u32,
    /// Colour gathered so far
    pub accum: [f32; 3],
    /// Row-major pixel index the sample belongs to
    pub pixel: u32,
    /// Product of specular coefficients along the path
    pub weight: f32,
    pub _pad: [u32; 3],
}

impl PathState {
    /// A fresh camera path.
    pub fn primary(ray: &Ray, pixel: u32, rng: u32) -> Self {
        Self {
            origin: ray.origin.as_vec3().to_array(),
            alive: 1,
            direction: ray.direction.as_vec3().to_array(),
            rng,
            accum: [0.0; 3],
            pixel,
            weight: 1.0,
            _pad: [0; 3],
        }
    }

    pub fn colour(&self) -> Color {
        Vec3::new(
            self.accum[0] as f64,
            self.accum[1] as f64,
            self.accum[2] as f64,
        )
    }
}

/// Per-dispatch uniforms.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Params {
    pub surface_count: u32,
    /// Bounces remaining for this pass
    pub depth: u32,
    pub max_depth: u32,
    pub ray_count: u32,
    pub background: [f32; 4],
    pub sky: [f32; 4],
    pub ambient: [f32; 4],
    pub light_min: [f32; 4],
    pub light_max: [f32; 4],
    pub light_colour: [f32; 4],
    pub hit_epsilon: f32,
    pub shadow_bias: f32,
    pub fuzz: f32,
    pub _pad: u32,
}

fn colour4(colour: Color) -> [f32; 4] {
    colour.as_vec3().extend(0.0).to_array()
}

impl Params {
    pub fn new(config: &RenderConfig, surface_count: u32, depth: u32, ray_count: u32) -> Self {
        let light = AreaLight::default();
        Self {
            surface_count,
            depth,
            max_depth: config.max_bounce_depth,
            ray_count,
            background: colour4(BACKGROUND),
            sky: colour4(SKY),
            ambient: colour4(AMBIENT_LIGHT),
            light_min: colour4(Vec3::new(light.x.min, light.y.min, light.z)),
            light_max: colour4(Vec3::new(light.x.max, light.y.max, light.z)),
            light_colour: colour4(light.colour),
            hit_epsilon: config.hit_epsilon as f32,
            shadow_bias: config.shadow_bias as f32,
            fuzz: config.fuzz as f32,
            _pad: 0,
        }
    }
}

/// Flatten the scene into surface and material arrays of equal length.
///
/// Storage bindings cannot be empty, so an empty scene yields one zeroed
/// entry of each. The real count is what goes into [`Params`].
pub fn pack_scene(scene: &Scene) -> (Vec<GpuSurface>, Vec<GpuMaterial>) {
    let mut surfaces = Vec::with_capacity(scene.len().max(1));
    let mut materials = Vec::with_capacity(scene.len().max(1));

    for surface in scene.surfaces() {
        let (position, kind, params) = match surface {
            Surface::Sphere(sphere) => (
                sphere.centre,
                SURFACE_SPHERE,
                Vec3::new(sphere.radius, 0.0, 0.0),
            ),
            Surface::Plane(plane) => (plane.point, SURFACE_PLANE, plane.normal),
        };
        surfaces.push(GpuSurface {
            position: position.as_vec3().to_array(),
            kind,
            params: params.as_vec3().to_array(),
            _pad: 0,
        });

        let material = surface.material();
        materials.push(GpuMaterial {
            colour: material.colour.as_vec3().to_array(),
            specular: material.specular as f32,
            diffuse: material.diffuse as f32,
            _pad: [0.0; 3],
        });
    }

    if surfaces.is_empty() {
        surfaces.push(GpuSurface::zeroed());
        materials.push(GpuMaterial::zeroed());
    }

    (surfaces, materials)
}

/// Decode path states from a mapped readback buffer.
///
/// Reads element by element so the byte slice needs no particular alignment.
/// A trailing partial element is ignored.
pub fn read_paths(bytes: &[u8]) -> Vec<PathState> {
    bytes
        .chunks_exact(std::mem::size_of::<PathState>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

/// Add finished paths into their pixels.
///
/// The device does not count rays, so the accumulators only track colour.
pub fn accumulate(pixels: &mut [PixelAccumulator], paths: &[PathState]) {
    for path in paths {
        if let Some(pixel) = pixels.get_mut(path.pixel as usize) {
            pixel.add(Shaded::new(path.colour(), 0));
        }
    }
}

/// Finalize accumulated pixels into an image.
pub fn resolve(pixels: &[PixelAccumulator], width: u32, height: u32) -> ImageBuffer {
    let mut image = ImageBuffer::new(width, height);
    for (color, pixel) in image.pixels.iter_mut().zip(pixels) {
        *color = pixel.finalize();
    }
    image
}
