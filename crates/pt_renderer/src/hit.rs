use pt_core::Material;
use pt_math::Vec3;

use crate::RAY_EPSILON;

/// Surface interaction returned by [`Accelerator::intersect`].
///
/// Borrows the hit material from the accelerator, so it only lives for one
/// integrator evaluation. Both normals face the side the ray came from.
///
/// [`Accelerator::intersect`]: crate::Accelerator::intersect
#[derive(Clone, Copy, Debug)]
pub struct Intersection<'a> {
    /// Hit point in world space
    pub position: Vec3,
    /// Unit normal of the triangle plane
    pub geometry_normal: Vec3,
    /// Interpolated unit normal used for shading
    pub shading_normal: Vec3,
    /// Unit direction back toward the ray origin
    pub wo: Vec3,
    /// Distance along the ray
    pub t: f32,
    /// Interpolated texture coordinates
    pub uv: [f32; 2],
    /// Whether the ray hit the side the triangle winding faces
    pub front_face: bool,
    pub material: &'a Material,
}

impl<'a> Intersection<'a> {
    /// Origin for a secondary ray leaving the surface in direction `dir`.
    ///
    /// The hit point is pushed along the geometric normal onto the side `dir`
    /// points to, so reflected and transmitted rays both clear the surface.
    #[inline]
    pub fn offset_origin(&self, dir: Vec3) -> Vec3 {
        if dir.dot(self.geometry_normal) >= 0.0 {
            self.position + self.geometry_normal * RAY_EPSILON
        } else {
            self.position - self.geometry_normal * RAY_EPSILON
        }
    }
}
