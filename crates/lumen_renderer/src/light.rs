//! Area light visibility.
//!
//! The scene is lit by a single axis-aligned rectangular light above the
//! surfaces. A shading point's light term is the fraction of shadow rays
//! towards the light that reach it unblocked, times the light colour.

use crate::random::gen_f64;
use crate::Shaded;
use lumen_core::Scene;
use lumen_math::{grid_cell, Color, Interval, Ray, Vec3, VectorExt};
use rand::RngCore;

/// Rectangle at height `z` spanning `x` by `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLight {
    pub x: Interval,
    pub y: Interval,
    pub z: f64,
    pub colour: Color,
}

impl Default for AreaLight {
    fn default() -> Self {
        Self {
            x: Interval::new(-7.5, 7.5),
            y: Interval::new(0.0, 15.0),
            z: 40.0,
            colour: Color::splat(0.9),
        }
    }
}

impl AreaLight {
    /// Point on the light at unit coordinates `(u, v)`.
    #[inline]
    pub fn point_at(&self, u: f64, v: f64) -> Vec3 {
        Vec3::new(self.x.lerp(u), self.y.lerp(v), self.z)
    }
}

/// How shadow-ray targets are chosen on the light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightSampling {
    /// `max(n, 1)` uniformly random targets
    Random,
    /// Lower corner of every cell of a `grid_size x grid_size` grid
    Stratified { grid_size: u32 },
}

/// Estimates light visibility from a shading point.
#[derive(Debug, Clone, Copy)]
pub struct LightSampler {
    light: AreaLight,
    sampling: LightSampling,
}

impl LightSampler {
    pub fn new(light: AreaLight, sampling: LightSampling) -> Self {
        Self { light, sampling }
    }

    /// Shadow rays cast for a request of `requested` samples.
    ///
    /// Stratified sampling ignores the request and always covers the full grid.
    pub fn sample_count(&self, requested: u32) -> u32 {
        match self.sampling {
            LightSampling::Random => requested.max(1),
            LightSampling::Stratified { grid_size } => grid_size * grid_size,
        }
    }

    /// Light reaching `from`, averaged over the shadow rays.
    ///
    /// `from` should already be biased off the surface. Every shadow ray is
    /// counted in the returned ray total.
    pub fn visibility(
        &self,
        from: Vec3,
        scene: &Scene,
        requested: u32,
        rng: &mut dyn RngCore,
    ) -> Shaded {
        let count = self.sample_count(requested);
        let mut lit = 0u32;

        for index in 0..count {
            let (u, v) = match self.sampling {
                LightSampling::Random => (gen_f64(rng), gen_f64(rng)),
                LightSampling::Stratified { grid_size } => grid_cell(index, grid_size),
            };
            let target = self.light.point_at(u, v);
            let shadow_ray = Ray::new(from, (target - from).norm());
            if !scene.occluded(&shadow_ray) {
                lit += 1;
            }
        }

        Shaded::new(
            self.light.colour * (lit as f64 / count as f64),
            count as u64,
        )
    }
}
