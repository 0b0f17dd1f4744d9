use crate::Vec3;

/// A ray in 3D space.
///
/// The direction is expected to be unit length; `Ray::new` normalizes it so
/// intersection distances are in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray, normalizing the direction.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Create a ray whose direction is already unit length.
    #[inline]
    pub fn from_unit(origin: Vec3, direction: Vec3) -> Self {
        debug_assert!((direction.length_squared() - 1.0).abs() < 1e-3);
        Self { origin, direction }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
