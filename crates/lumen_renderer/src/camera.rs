//! Camera for ray generation.

use crate::RenderConfig;
use lumen_math::{Ray, Vec3, VectorExt};

/// Pinhole camera mapping pixels onto a viewport one unit in front of it.
///
/// Pixel (0, 0) is the top-left of the image. Sub-pixel offsets are in
/// `[0, 1)^2` with `(0.5, 0.5)` at the pixel centre.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f64,
    focus_dist: f64,

    // Cached computed values (set by initialize())
    center: Vec3,
    upper_left: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl Camera {
    /// Camera at the origin looking along +Y with +Z up.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 512,
            image_height: 512,
            look_from: Vec3::ZERO,
            look_at: Vec3::Y,
            vup: Vec3::Z,
            vfov: 90.0,
            focus_dist: 1.0,
            center: Vec3::ZERO,
            upper_left: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
        };
        camera.initialize();
        camera
    }

    /// Camera for a render configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new()
            .with_resolution(config.width, config.height)
            .with_fov(config.field_of_view_degrees)
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self.initialize();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f64) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    fn initialize(&mut self) {
        self.center = self.look_from;

        // Calculate viewport dimensions
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * self.focus_dist;
        let viewport_width =
            viewport_height * (self.image_width as f64 / self.image_height.max(1) as f64);

        // Calculate camera basis vectors
        let w = (self.look_from - self.look_at).norm();
        let u = self.vup.cross_dir(w);
        let v = w.cross(u);

        // Calculate viewport vectors
        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        self.pixel_delta_u = viewport_u / self.image_width.max(1) as f64;
        self.pixel_delta_v = viewport_v / self.image_height.max(1) as f64;

        self.upper_left = self.center - self.focus_dist * w - viewport_u / 2.0 - viewport_v / 2.0;
    }

    /// Ray through pixel (i, j) at sub-pixel offset `(u, v)`.
    pub fn get_ray(&self, i: u32, j: u32, (u, v): (f64, f64)) -> Ray {
        let pixel_sample = self.upper_left
            + (i as f64 + u) * self.pixel_delta_u
            + (j as f64 + v) * self.pixel_delta_v;

        Ray::new(self.center, pixel_sample - self.center)
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel_centre_ray() {
        let camera = Camera::new().with_resolution(1, 1);
        let ray = camera.get_ray(0, 0, (0.5, 0.5));

        assert_eq!(ray.origin(), Vec3::ZERO);
        assert!((ray.direction() - Vec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_image_orientation() {
        let camera = Camera::new().with_resolution(100, 100);

        // Top-left corner is up (+Z) and to the left (-X) at 90 degrees
        let corner = camera.get_ray(0, 0, (0.0, 0.0)).direction();
        assert!((corner - Vec3::new(-1.0, 1.0, 1.0)).length() < 1e-12);

        // Bottom-right corner
        let corner = camera.get_ray(99, 99, (1.0, 1.0)).direction();
        assert!((corner - Vec3::new(1.0, 1.0, -1.0)).length() < 1e-12);
    }

    #[test]
    fn test_aspect_ratio_and_fov() {
        let config = RenderConfig {
            width: 200,
            height: 100,
            field_of_view_degrees: 60.0,
            ..Default::default()
        };
        let camera = Camera::from_config(&config);

        let top_left = camera.get_ray(0, 0, (0.0, 0.0)).direction();
        let half_height = (30.0f64).to_radians().tan();
        assert!((top_left.z - half_height).abs() < 1e-12);
        assert!((top_left.x + 2.0 * half_height).abs() < 1e-12);
        assert!((top_left.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_with_position() {
        let camera = Camera::new()
            .with_resolution(10, 10)
            .with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);

        assert_eq!(camera.center(), Vec3::new(0.0, 0.0, 5.0));
        let ray = camera.get_ray(5, 5, (0.0, 0.0));
        assert!(ray.direction().z < 0.0);
    }
}
