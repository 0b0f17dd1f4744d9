//! Direction sampling helpers shared by the lobes.

use std::f32::consts::PI;

use pt_math::Vec3;
use rand::{Rng, RngCore};

/// Build an orthonormal basis from a unit normal.
///
/// Branchless construction from Duff et al. 2017.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

/// Rotate a direction given around +Z into the frame of `n`.
#[inline]
pub fn to_world(local: Vec3, n: Vec3) -> Vec3 {
    let (tangent, bitangent) = orthonormal_basis(n);
    local.x * tangent + local.y * bitangent + local.z * n
}

/// Direction about `n` with the given polar cosine and a uniform azimuth.
pub fn spherical_direction(cos_theta: f32, n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * rng.gen::<f32>();
    to_world(
        Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta),
        n,
    )
}

/// Cosine-weighted direction in the hemisphere around `n`.
///
/// The density is `cos(theta) / pi`.
pub fn cosine_sample_hemisphere(n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    // Malley's method: the cosine is the height above the unit disk
    let cos_theta = (1.0 - rng.gen::<f32>()).sqrt();
    spherical_direction(cos_theta, n, rng)
}

/// Mirror `v` about `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}
