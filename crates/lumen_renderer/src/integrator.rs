//! Shading integrators.
//!
//! Both integrators share the same surface response: a blend of a fuzzed
//! mirror direction and a diffuse direction, weighted by the material's
//! diffuse coefficient, with the recursive result mixed in by its specular
//! coefficient. They differ in how the light term and the reflected term
//! are sampled.
//!
//! - [`PathIntegrator`] follows one random path, splitting the first hit
//!   between a single shadow ray and a single bounce.
//! - [`DistributedIntegrator`] fans out over a stratified grid of shadow
//!   rays and reflection rays at every hit.

use std::ops::{Add, AddAssign};

use crate::config::{RenderConfig, SamplingStrategy};
use crate::light::{AreaLight, LightSampler, LightSampling};
use crate::random::random_unit_vector;
use lumen_core::{Material, Scene, SurfaceHit};
use lumen_math::{grid_cells, Color, Ray, Vec3, VectorExt};
use rand::{Rng, RngCore};

/// Colour of rays that leave the scene.
pub const BACKGROUND: Color = Color::new(0.1, 0.1, 0.2);
/// Ambient light mixed into a path's final hit.
pub const AMBIENT_LIGHT: Color = Color::new(0.8, 0.8, 0.8);
/// Sky colour blended with the background for escaping stochastic paths.
pub const SKY: Color = Color::new(0.5, 0.7, 1.0);

/// Colour returned by an integrator and the number of rays it cost.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shaded {
    pub colour: Color,
    /// Camera, bounce and shadow rays traced to produce `colour`
    pub rays: u64,
}

impl Shaded {
    #[inline]
    pub fn new(colour: Color, rays: u64) -> Self {
        Self { colour, rays }
    }
}

impl Add for Shaded {
    type Output = Shaded;

    fn add(self, rhs: Shaded) -> Shaded {
        Shaded::new(self.colour + rhs.colour, self.rays + rhs.rays)
    }
}

impl AddAssign for Shaded {
    fn add_assign(&mut self, rhs: Shaded) {
        *self = *self + rhs;
    }
}

/// Computes the colour carried back along a ray.
pub trait Integrator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Colour seen along `ray` with `depth` bounces remaining.
    ///
    /// Depth 0 never recurses. The camera ray itself counts as one ray.
    fn shade(&self, ray: &Ray, scene: &Scene, depth: u32, rng: &mut dyn RngCore) -> Shaded;
}

/// Tunables shared by both integrators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub max_depth: u32,
    pub grid_size: u32,
    pub hit_epsilon: f64,
    pub shadow_bias: f64,
    pub fuzz: f64,
}

impl From<&RenderConfig> for ShadingParams {
    fn from(config: &RenderConfig) -> Self {
        Self {
            max_depth: config.max_bounce_depth,
            grid_size: config.grid_size,
            hit_epsilon: config.hit_epsilon,
            shadow_bias: config.shadow_bias,
            fuzz: config.fuzz,
        }
    }
}

impl ShadingParams {
    /// Nearest hit that is far enough along the ray to shade.
    fn surface<'a>(&self, ray: &Ray, scene: &'a Scene) -> Option<(SurfaceHit, &'a Material)> {
        let hit = scene.nearest_hit(ray)?;
        if hit.hit.t < self.hit_epsilon {
            return None;
        }
        Some((hit, scene.material(&hit)))
    }

    /// Outgoing direction: fuzzed mirror and diffuse lobes mixed by `diffuse`.
    fn bounce_direction(
        &self,
        incoming: Vec3,
        normal: Vec3,
        material: &Material,
        rng: &mut dyn RngCore,
    ) -> Vec3 {
        let reflection = incoming.mirror(normal) + random_unit_vector(rng) * self.fuzz;
        let diffuse = normal + random_unit_vector(rng);
        reflection * (1.0 - material.diffuse) + diffuse * material.diffuse
    }

    /// Point shadow rays start from, lifted off the surface.
    #[inline]
    fn shadow_origin(&self, surface: &SurfaceHit) -> Vec3 {
        surface.hit.position + surface.hit.normal * self.shadow_bias
    }
}

/// Final colour when no bounces remain.
#[inline]
fn terminal(colour: Color) -> Color {
    (colour + AMBIENT_LIGHT) / 2.0
}

/// Surface colour with the reflected colour mixed in by `specular`.
#[inline]
fn blend_specular(colour: Color, reflected: Color, specular: f64) -> Color {
    colour * (1.0 - specular) + reflected * specular
}

/// Stochastic path tracer.
#[derive(Debug, Clone, Copy)]
pub struct PathIntegrator {
    params: ShadingParams,
    light: LightSampler,
}

impl PathIntegrator {
    pub fn new(params: ShadingParams) -> Self {
        Self {
            params,
            light: LightSampler::new(AreaLight::default(), LightSampling::Random),
        }
    }
}

impl Integrator for PathIntegrator {
    fn name(&self) -> &'static str {
        "path"
    }

    fn shade(&self, ray: &Ray, scene: &Scene, depth: u32, rng: &mut dyn RngCore) -> Shaded {
        let Some((surface, material)) = self.params.surface(ray, scene) else {
            return Shaded::new((BACKGROUND + SKY) / 2.0, 1);
        };

        if depth == 0 {
            return Shaded::new(terminal(material.colour), 1);
        }

        let bounce = self
            .params
            .bounce_direction(ray.direction, surface.hit.normal, material, rng);

        // The first hit flips a coin between a direct light estimate and a bounce
        if depth == self.params.max_depth && rng.gen_bool(0.5) {
            let light = self
                .light
                .visibility(self.params.shadow_origin(&surface), scene, 1, rng);
            return Shaded::new((material.colour + light.colour) / 2.0, 1 + light.rays);
        }

        let child = self.shade(
            &Ray::new(surface.hit.position, bounce),
            scene,
            depth - 1,
            rng,
        );
        Shaded::new(
            blend_specular(material.colour, child.colour, material.specular),
            1 + child.rays,
        )
    }
}

/// Stratified distributed ray tracer.
#[derive(Debug, Clone, Copy)]
pub struct DistributedIntegrator {
    params: ShadingParams,
    light: LightSampler,
}

impl DistributedIntegrator {
    pub fn new(params: ShadingParams) -> Self {
        Self {
            params,
            light: LightSampler::new(
                AreaLight::default(),
                LightSampling::Stratified {
                    grid_size: params.grid_size,
                },
            ),
        }
    }
}

impl Integrator for DistributedIntegrator {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn shade(&self, ray: &Ray, scene: &Scene, depth: u32, rng: &mut dyn RngCore) -> Shaded {
        let Some((surface, material)) = self.params.surface(ray, scene) else {
            return Shaded::new(BACKGROUND, 1);
        };

        // Same ambient blend as path mode, so both integrators end recursion alike
        if depth == 0 {
            return Shaded::new(terminal(material.colour), 1);
        }

        let light = self
            .light
            .visibility(self.params.shadow_origin(&surface), scene, depth + 1, rng);

        // One shared direction, origins spread over a unit square around the hit
        let bounce = self
            .params
            .bounce_direction(ray.direction, surface.hit.normal, material, rng);
        let mut reflected = Shaded::default();
        for (u, v) in grid_cells(self.params.grid_size) {
            let origin = surface.hit.position + Vec3::new(u - 0.5, v - 0.5, 0.0);
            reflected += self.shade(&Ray::new(origin, bounce), scene, 0, rng);
        }
        let cells = (self.params.grid_size * self.params.grid_size) as f64;
        let blended = blend_specular(material.colour, reflected.colour / cells, material.specular);

        Shaded::new(
            (material.colour + light.colour + blended) / 3.0,
            1 + light.rays + reflected.rays,
        )
    }
}

/// Integrator for the configured sampling strategy.
pub fn build_integrator(config: &RenderConfig) -> Box<dyn Integrator> {
    let params = ShadingParams::from(config);
    match config.sampling {
        SamplingStrategy::StochasticPath => Box::new(PathIntegrator::new(params)),
        SamplingStrategy::StratifiedDistributed => Box::new(DistributedIntegrator::new(params)),
    }
}
