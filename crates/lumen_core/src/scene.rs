//! Scene representation for lumen.
//!
//! A scene is an ordered list of surfaces built once before rendering and
//! only read while rendering. Surfaces are referred to by their index in
//! that list, so hits never borrow the surface they came from.

use std::path::Path;

use lumen_math::{Ray, Vec3, VectorExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::surface::{Hit, Intersect, Plane, Sphere, Surface};
use crate::Material;

/// Errors that can occur while loading or validating a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scene description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid {kind} at index {index}: {reason}")]
    InvalidSurface {
        index: usize,
        kind: &'static str,
        reason: String,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// The nearest intersection along a ray, tagged with the surface it hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Index of the surface in the scene
    pub index: usize,
    pub hit: Hit,
}

/// An ordered, owned collection of surfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    surfaces: Vec<Surface>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface, returning its index.
    pub fn add(&mut self, surface: impl Into<Surface>) -> usize {
        self.surfaces.push(surface.into());
        self.surfaces.len() - 1
    }

    /// Builder-style `add`.
    pub fn with(mut self, surface: impl Into<Surface>) -> Self {
        self.add(surface);
        self
    }

    /// All surfaces, in registration order.
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// The surface at `index`.
    pub fn get(&self, index: usize) -> Option<&Surface> {
        self.surfaces.get(index)
    }

    /// Material of the surface a hit refers to.
    ///
    /// Panics if the hit did not come from this scene.
    pub fn material(&self, hit: &SurfaceHit) -> &Material {
        self.surfaces[hit.index].material()
    }

    /// Get the number of surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Closest positive-distance intersection along the ray.
    ///
    /// The first hit found is kept and only replaced by a strictly smaller
    /// `t`, so for equal distances the earlier surface wins.
    pub fn nearest_hit(&self, ray: &Ray) -> Option<SurfaceHit> {
        let mut nearest: Option<SurfaceHit> = None;

        for (index, surface) in self.surfaces.iter().enumerate() {
            if let Some(hit) = surface.intersect(ray) {
                let closer = match &nearest {
                    Some(best) => hit.t < best.hit.t,
                    None => true,
                };
                if closer {
                    nearest = Some(SurfaceHit { index, hit });
                }
            }
        }

        nearest
    }

    /// True if any surface intersects the ray at all.
    ///
    /// Stops at the first hit; distance is not considered.
    pub fn occluded(&self, ray: &Ray) -> bool {
        self.surfaces.iter().any(|surface| surface.intersect(ray).is_some())
    }

    /// Check every surface and normalize plane normals.
    pub fn validate(&mut self) -> SceneResult<()> {
        for (index, surface) in self.surfaces.iter_mut().enumerate() {
            let kind = surface.kind();
            let invalid = |reason: &str| SceneError::InvalidSurface {
                index,
                kind,
                reason: reason.to_string(),
            };

            if !surface.material().is_valid() {
                return Err(invalid("material channels and weights must lie in [0, 1]"));
            }

            match surface {
                Surface::Sphere(sphere) => {
                    if !(sphere.radius > 0.0 && sphere.radius.is_finite()) {
                        return Err(invalid("radius must be positive and finite"));
                    }
                    if !sphere.centre.is_finite() {
                        return Err(invalid("centre must be finite"));
                    }
                }
                Surface::Plane(plane) => {
                    if !plane.point.is_finite() {
                        return Err(invalid("point must be finite"));
                    }
                    plane.normal = plane
                        .normal
                        .try_norm()
                        .ok_or_else(|| invalid("normal must be non-zero"))?;
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON scene description.
    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        let mut scene: Scene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Load and validate a JSON scene description from disk.
    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let scene = Self::from_json_str(&json)?;
        log::debug!("Loaded {} surfaces from {}", scene.len(), path.display());
        Ok(scene)
    }

    /// The default scene: a grey ground plane and eight coloured spheres.
    ///
    /// The camera sits at the origin looking along +y with +z up.
    pub fn showcase() -> Self {
        let sphere = |centre: [f64; 3], radius: f64, colour: [f64; 3], specular: f64, diffuse: f64| {
            Sphere::new(
                Vec3::from(centre),
                radius,
                Material::new(Vec3::from(colour), specular, diffuse),
            )
        };

        Scene::new()
            .with(Plane::new(
                Vec3::new(0.0, 0.0, -3.0),
                Vec3::Z,
                Material::new(Vec3::splat(0.5), 0.0, 1.0),
            ))
            .with(sphere([0.0, 12.0, 0.0], 5.0, [1.0, 0.0, 0.0], 0.5, 1.0))
            .with(sphere([15.0, 20.0, -1.0], 3.0, [0.0, 1.0, 0.0], 0.9, 0.5))
            .with(sphere([-10.0, 15.0, 0.0], 5.0, [0.0, 0.0, 1.0], 0.3, 0.5))
            .with(sphere([-5.0, 10.0, -2.0], 1.0, [0.3, 0.3, 1.0], 0.3, 1.0))
            .with(sphere([3.0, 5.0, -2.0], 1.0, [0.3, 1.0, 0.3], 0.3, 0.8))
            .with(sphere([-7.0, 8.0, -2.0], 1.0, [0.5, 0.7, 1.0], 0.8, 1.0))
            .with(sphere([-1.0, 3.0, -2.0], 1.0, [0.9, 0.3, 1.0], 0.3, 0.3))
            .with(sphere([13.0, 17.0, -2.0], 1.0, [0.6, 0.5, 1.0], 0.5, 1.0))
    }
}
