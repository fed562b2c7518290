// Re-export glam for convenience
pub use glam;
pub use glam::DVec3;

// lumen math types
mod grid;
mod interval;
mod ray;
mod vector;

pub use grid::{grid_cell, grid_cells};
pub use interval::Interval;
pub use ray::Ray;
pub use vector::{VectorExt, NORM_EPSILON};

/// Double precision vector used for positions, directions and colours.
pub type Vec3 = DVec3;

/// Colour type alias (RGB, 0-1 while shading, 0-255 once finalized)
pub type Color = Vec3;
