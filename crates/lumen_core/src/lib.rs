//! lumen Core - Scene representation for the lumen renderer.
//!
//! This crate provides:
//!
//! - **Surfaces**: `Sphere` and `Plane`, unified by the `Surface` variant
//!   and the `Intersect` capability
//! - **Scene**: an ordered, owned collection of surfaces with nearest-hit
//!   and occlusion queries
//! - **Scene descriptions**: JSON loading and the built-in showcase scene
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::Scene;
//!
//! let scene = Scene::load("scene.json")?;
//! println!("Loaded {} surfaces", scene.len());
//! ```

pub mod material;
pub mod scene;
pub mod surface;

// Re-export commonly used types
pub use material::Material;
pub use scene::{Scene, SceneError, SceneResult, SurfaceHit};
pub use surface::{Hit, Intersect, Plane, Sphere, Surface};
