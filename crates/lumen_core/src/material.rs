//! Surface material.

use lumen_math::Color;
use serde::{Deserialize, Serialize};

/// How a surface looks and how it scatters light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Base colour (RGB, 0-1)
    pub colour: Color,

    /// Weight of reflected light against the base colour (0-1)
    #[serde(default)]
    pub specular: f64,

    /// Blend between mirror-like (0) and Lambertian-like (1) bounces
    #[serde(default = "default_diffuse")]
    pub diffuse: f64,
}

fn default_diffuse() -> f64 {
    1.0
}

impl Default for Material {
    fn default() -> Self {
        Self {
            colour: Color::new(0.5, 0.5, 0.5), // Grey default
            specular: 0.0,
            diffuse: 1.0,
        }
    }
}

impl Material {
    /// Create a new material.
    pub fn new(colour: Color, specular: f64, diffuse: f64) -> Self {
        Self {
            colour,
            specular,
            diffuse,
        }
    }

    /// Check that every channel and weight lies in [0, 1].
    pub fn is_valid(&self) -> bool {
        let unit = |x: f64| (0.0..=1.0).contains(&x);
        unit(self.colour.x)
            && unit(self.colour.y)
            && unit(self.colour.z)
            && unit(self.specular)
            && unit(self.diffuse)
    }
}
