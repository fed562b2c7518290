//! Vector operations on top of glam's `DVec3`.
//!
//! glam already covers arithmetic, `dot`, `length` and `length_squared`.
//! This adds the renderer's own conventions: a guarded normalization,
//! a cross product defined on directions, and mirror reflection.

use crate::Vec3;

/// Vectors shorter than this have no usable direction.
pub const NORM_EPSILON: f64 = 1e-12;

/// Renderer-specific vector operations.
pub trait VectorExt: Sized {
    /// Unit vector in the same direction.
    ///
    /// Returns the zero vector when the input is (nearly) zero length, so
    /// rays built from it intersect nothing instead of carrying NaNs.
    fn norm(self) -> Self;

    /// Unit vector in the same direction, or `None` for a zero-length input.
    fn try_norm(self) -> Option<Self>;

    /// Cross product of the two inputs after normalizing both.
    ///
    /// Only meaningful for direction-like vectors.
    fn cross_dir(self, other: Self) -> Self;

    /// Mirror `self` about the unit normal `n`.
    fn mirror(self, n: Self) -> Self;
}

impl VectorExt for Vec3 {
    #[inline]
    fn norm(self) -> Self {
        self.try_norm().unwrap_or(Vec3::ZERO)
    }

    #[inline]
    fn try_norm(self) -> Option<Self> {
        let length = self.length();
        if length > NORM_EPSILON && length.is_finite() {
            Some(self / length)
        } else {
            None
        }
    }

    #[inline]
    fn cross_dir(self, other: Self) -> Self {
        self.norm().cross(other.norm())
    }

    #[inline]
    fn mirror(self, n: Self) -> Self {
        self - 2.0 * self.dot(n) * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_norm_unit_length() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let v = Vec3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            );
            if v.length() <= 1e-6 {
                continue;
            }
            let n = v.norm();
            assert!((n.length() - 1.0).abs() < 1e-9, "|{:?}| = {}", n, n.length());
            // Same direction
            assert!(n.dot(v) > 0.0);
        }
    }

    #[test]
    fn test_norm_zero_length() {
        assert_eq!(Vec3::ZERO.norm(), Vec3::ZERO);
        assert!(Vec3::ZERO.try_norm().is_none());
        assert!(Vec3::new(f64::NAN, 0.0, 0.0).try_norm().is_none());
    }

    #[test]
    fn test_cross_dir_normalizes_inputs() {
        let a = Vec3::new(10.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.5, 0.0);
        assert_eq!(a.cross_dir(b), Vec3::Z);
        assert_eq!(a.cross(b), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_mirror() {
        let d = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(d.mirror(Vec3::Y), Vec3::new(1.0, 1.0, 0.0));

        // Grazing direction is unchanged
        assert_eq!(Vec3::X.mirror(Vec3::Y), Vec3::X);
    }
}
