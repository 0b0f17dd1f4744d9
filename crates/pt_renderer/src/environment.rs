//! Equirectangular environment lighting.

use std::f32::consts::PI;
use std::sync::Arc;

use pt_core::Texture;
use pt_math::{Color, Vec3};

use crate::image::sanitize;

/// Map a unit direction to equirectangular texture coordinates.
///
/// `u` is the azimuth around +Y measured from +X toward +Z, `v` the polar
/// angle from +Y, so `v = 0` is the top row of the map.
pub fn direction_to_uv(dir: Vec3) -> [f32; 2] {
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    let mut phi = dir.z.atan2(dir.x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    [phi / (2.0 * PI), theta / PI]
}

/// Radiance arriving from infinitely far away.
#[derive(Clone, Debug)]
pub struct Environment {
    map: Arc<Texture>,
    pub multiplier: f32,
}

impl Environment {
    /// Negative or NaN multipliers are treated as zero.
    pub fn new(map: Arc<Texture>, multiplier: f32) -> Self {
        Self {
            map,
            multiplier: multiplier.max(0.0),
        }
    }

    /// Uniform radiance from every direction.
    pub fn constant(color: Color) -> Self {
        Self::new(Arc::new(Texture::solid_color(color)), 1.0)
    }

    /// No light from the environment.
    pub fn black() -> Self {
        Self::constant(Color::ZERO)
    }

    /// Radiance arriving along `-dir`, i.e. seen when looking toward `dir`.
    ///
    /// Always finite and non-negative, whatever the map holds.
    pub fn radiance(&self, dir: Vec3) -> Color {
        let [u, v] = direction_to_uv(dir);
        sanitize(self.map.sample(u, v) * self.multiplier)
    }

    pub fn map(&self) -> &Texture {
        &self.map
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::black()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_uv(dir: Vec3, u: f32, v: f32) {
        let uv = direction_to_uv(dir);
        assert!((uv[0] - u).abs() < 1e-5, "{dir:?} -> {uv:?}");
        assert!((uv[1] - v).abs() < 1e-5, "{dir:?} -> {uv:?}");
    }

    #[test]
    fn test_direction_to_uv() {
        assert_uv(Vec3::X, 0.0, 0.5);
        assert_uv(Vec3::Z, 0.25, 0.5);
        assert_uv(Vec3::NEG_X, 0.5, 0.5);
        assert_uv(Vec3::NEG_Z, 0.75, 0.5);
        assert_uv(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.0, 0.25);
    }

    #[test]
    fn test_poles() {
        assert_eq!(direction_to_uv(Vec3::Y)[1], 0.0);
        assert!((direction_to_uv(Vec3::NEG_Y)[1] - 1.0).abs() < 1e-6);
        // Slightly denormalized input still maps inside the texture
        assert_eq!(direction_to_uv(Vec3::new(0.0, 1.0000001, 0.0))[1], 0.0);
    }

    #[test]
    fn test_sky_over_ground() {
        // Top row blue, bottom row brown
        let map = Texture::new(
            2,
            2,
            vec![
                [0.2, 0.4, 1.0, 1.0],
                [0.2, 0.4, 1.0, 1.0],
                [0.3, 0.2, 0.1, 1.0],
                [0.3, 0.2, 0.1, 1.0],
            ],
            "sky",
        )
        .unwrap();
        let env = Environment::new(Arc::new(map), 2.0);

        assert!((env.radiance(Vec3::Y) - Color::new(0.4, 0.8, 2.0)).length() < 1e-5);
        assert!((env.radiance(Vec3::NEG_Y) - Color::new(0.6, 0.4, 0.2)).length() < 1e-5);
    }

    #[test]
    fn test_radiance_never_negative() {
        let map = Arc::new(Texture::solid_color(Color::new(0.5, 1.0, 2.0)));
        let env = Environment::new(map.clone(), -1.0);
        assert_eq!(env.multiplier, 0.0);
        assert_eq!(env.radiance(Vec3::Y), Color::ZERO);

        // The field is public, so a later edit can still go negative
        let mut env = Environment::new(map, 1.0);
        env.multiplier = -3.0;
        assert_eq!(env.radiance(Vec3::X), Color::ZERO);

        let env = Environment::constant(Color::new(-1.0, f32::NAN, 0.25));
        let c = env.radiance(Vec3::Z);
        assert!((c - Color::new(0.0, 0.0, 0.25)).length() < 1e-6, "{c}");
    }

    #[test]
    fn test_constant() {
        let env = Environment::constant(Color::new(1.0, 2.0, 3.0));
        let c = env.radiance(Vec3::new(0.3, -0.2, 0.9).normalize());
        assert!((c - Color::new(1.0, 2.0, 3.0)).length() < 1e-6);
        assert_eq!(Environment::default().radiance(Vec3::X), Color::ZERO);
    }
}
