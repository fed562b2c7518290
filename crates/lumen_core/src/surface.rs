//! Surface primitives and ray intersection.
//!
//! Intersection never fails: a miss, a ray parallel to a plane, or a
//! degenerate direction all come back as `None`.

use crate::Material;
use lumen_math::{Ray, Vec3, VectorExt};
use serde::{Deserialize, Serialize};

/// Denominators below this magnitude are treated as a parallel ray.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Record of a ray-surface intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Parameter t where the intersection occurs (always > 0)
    pub t: f64,
    /// Point of intersection
    pub position: Vec3,
    /// Outward unit normal at the intersection
    pub normal: Vec3,
}

/// Anything a ray can be tested against.
pub trait Intersect {
    /// Intersect the ray, returning the hit if `t > 0`.
    fn intersect(&self, ray: &Ray) -> Option<Hit>;
}

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub centre: Vec3,
    pub radius: f64,
    #[serde(default)]
    pub material: Material,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(centre: Vec3, radius: f64, material: Material) -> Self {
        Self {
            centre,
            radius,
            material,
        }
    }
}

impl Intersect for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let oc = ray.origin - self.centre;
        let a = ray.direction.dot(ray.direction);
        if a <= 0.0 {
            return None;
        }
        let b = 2.0 * oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        // Only the nearer root counts, so a ray starting inside misses
        let t = (-b - discriminant.sqrt()) / (2.0 * a);
        if t.is_nan() || t <= 0.0 {
            return None;
        }

        let position = ray.at(t);
        Some(Hit {
            t,
            position,
            normal: (position - self.centre).norm(),
        })
    }
}

/// An infinite plane through `point`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: Vec3,
    /// Unit normal
    pub normal: Vec3,
    #[serde(default)]
    pub material: Material,
}

impl Plane {
    /// Create a new plane. The normal is normalized.
    pub fn new(point: Vec3, normal: Vec3, material: Material) -> Self {
        Self {
            point,
            normal: normal.norm(),
            material,
        }
    }
}

impl Intersect for Plane {
    fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let denom = ray.direction.dot(self.normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.point - ray.origin).dot(self.normal) / denom;
        if !t.is_finite() || t <= 0.0 {
            return None;
        }

        Some(Hit {
            t,
            position: ray.at(t),
            normal: self.normal,
        })
    }
}

/// A surface in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Surface {
    Sphere(Sphere),
    Plane(Plane),
}

impl Surface {
    /// The material this surface is shaded with.
    pub fn material(&self) -> &Material {
        match self {
            Surface::Sphere(sphere) => &sphere.material,
            Surface::Plane(plane) => &plane.material,
        }
    }

    /// Short name of the variant, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Surface::Sphere(_) => "sphere",
            Surface::Plane(_) => "plane",
        }
    }
}

impl Intersect for Surface {
    #[inline]
    fn intersect(&self, ray: &Ray) -> Option<Hit> {
        match self {
            Surface::Sphere(sphere) => sphere.intersect(ray),
            Surface::Plane(plane) => plane.intersect(ray),
        }
    }
}

impl From<Sphere> for Surface {
    fn from(sphere: Sphere) -> Self {
        Surface::Sphere(sphere)
    }
}

impl From<Plane> for Surface {
    fn from(plane: Plane) -> Self {
        Surface::Plane(plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Material {
        Material::new(Vec3::new(1.0, 0.0, 0.0), 0.5, 1.0)
    }

    #[test]
    fn test_sphere_hit_distance() {
        let centre = Vec3::new(0.0, 10.0, 0.0);
        let sphere = Sphere::new(centre, 5.0, red());

        for origin in [
            Vec3::ZERO,
            Vec3::new(3.0, -4.0, 12.0),
            Vec3::new(-20.0, 30.0, 1.0),
        ] {
            let ray = Ray::new(origin, (centre - origin).norm());
            let hit = sphere.intersect(&ray).expect("ray aimed at centre must hit");

            assert!((hit.t - (origin.distance(centre) - 5.0)).abs() < 1e-9);
            let expected_normal = (hit.position - centre).norm();
            assert!((hit.normal - expected_normal).length() < 1e-12);
            assert!((hit.normal.length() - 1.0).abs() < 1e-12);
            // Outward: faces back towards the ray origin
            assert!(hit.normal.dot(ray.direction) < 0.0);
        }
    }

    #[test]
    fn test_sphere_unnormalized_direction() {
        let sphere = Sphere::new(Vec3::new(0.0, 10.0, 0.0), 5.0, red());
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0));

        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 2.5).abs() < 1e-12);
        assert!((hit.position - Vec3::new(0.0, 5.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 10.0, 0.0), 5.0, red());

        // Ray pointing away from sphere
        let away = Ray::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0));
        assert!(sphere.intersect(&away).is_none());

        // Ray passing beside it
        let beside = Ray::new(Vec3::new(6.0, 0.0, 0.0), Vec3::Y);
        assert!(sphere.intersect(&beside).is_none());

        // Zero direction
        let degenerate = Ray::new(Vec3::ZERO, Vec3::ZERO);
        assert!(sphere.intersect(&degenerate).is_none());
    }

    #[test]
    fn test_sphere_origin_inside_uses_near_root() {
        let sphere = Sphere::new(Vec3::ZERO, 5.0, red());
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn test_plane_hit() {
        let plane = Plane::new(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, 2.0), red());
        assert_eq!(plane.normal, Vec3::Z);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, -1.0));
        let hit = plane.intersect(&ray).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-12);
        assert!((hit.position - Vec3::new(0.0, 3.0, -3.0)).length() < 1e-12);
        assert_eq!(hit.normal, Vec3::Z);
    }

    #[test]
    fn test_plane_parallel_and_behind() {
        let plane = Plane::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z, red());

        let parallel = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(plane.intersect(&parallel).is_none());

        let in_plane = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Y);
        assert!(plane.intersect(&in_plane).is_none());

        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(plane.intersect(&away).is_none());
    }

    #[test]
    fn test_surface_dispatch() {
        let sphere: Surface = Sphere::new(Vec3::new(0.0, 10.0, 0.0), 5.0, red()).into();
        let plane: Surface = Plane::new(Vec3::new(0.0, 20.0, 0.0), Vec3::Y, Material::default()).into();
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);

        assert_eq!(sphere.kind(), "sphere");
        assert_eq!(plane.kind(), "plane");
        assert!((sphere.intersect(&ray).unwrap().t - 5.0).abs() < 1e-12);
        assert!((plane.intersect(&ray).unwrap().t - 20.0).abs() < 1e-12);
        assert_eq!(sphere.material().colour, Vec3::new(1.0, 0.0, 0.0));
    }
}
