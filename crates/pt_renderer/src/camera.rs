//! Pinhole camera and primary ray generation.

use pt_math::{Mat3, Ray, Vec3};

/// Camera placement. The field of view lives in [`Settings`].
///
/// [`Settings`]: crate::Settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// View direction (normalized when the screen is built)
    pub direction: Vec3,
    /// Approximate up vector, re-orthogonalized against `direction`
    pub up: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, direction: Vec3, up: Vec3) -> Self {
        Self {
            position,
            direction,
            up,
        }
    }

    /// Camera at `position` looking toward `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self::new(position, target - position, up)
    }

    /// Rotate the camera around the vertical axis through `center`, keeping
    /// it aimed at the same relative point.
    pub fn orbit(&self, center: Vec3, angle_radians: f32) -> Self {
        let rotation = Mat3::from_rotation_y(angle_radians);
        Self {
            position: center + rotation * (self.position - center),
            direction: rotation * self.direction,
            up: rotation * self.up,
        }
    }

    /// Precompute the image plane for one pass.
    pub fn screen(&self, fov_degrees: f32, aspect: f32) -> ScreenBasis {
        ScreenBasis::new(self, fov_degrees, aspect)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(-30.0, 10.0, 30.0), Vec3::new(0.0, 10.0, 0.0), Vec3::Y)
    }
}

/// Image plane one unit in front of the camera.
///
/// A screen coordinate `(sx, sy)` in `[0, 1]^2` maps to the direction
/// `lower_left_corner + sx * x + sy * y`; `sy = 0` is the bottom edge.
#[derive(Clone, Copy, Debug)]
pub struct ScreenBasis {
    pub origin: Vec3,
    pub lower_left_corner: Vec3,
    pub x: Vec3,
    pub y: Vec3,
}

impl ScreenBasis {
    /// `fov_degrees` is the vertical field of view; `aspect` is width over
    /// height.
    pub fn new(camera: &Camera, fov_degrees: f32, aspect: f32) -> Self {
        let direction = camera.direction.normalize();
        let right = direction.cross(camera.up).normalize();
        let up = right.cross(direction).normalize();

        let half_fov = fov_degrees.to_radians() * 0.5;
        let a = direction * half_fov.cos();
        let b = up * half_fov.sin();
        let c = right * half_fov.sin() * aspect;

        let lower_left_corner = a - c - b;
        Self {
            origin: camera.position,
            lower_left_corner,
            x: 2.0 * ((a - b) - lower_left_corner),
            y: 2.0 * ((a - c) - lower_left_corner),
        }
    }

    /// Primary ray through screen coordinate `(sx, sy)`.
    #[inline]
    pub fn ray(&self, sx: f32, sy: f32) -> Ray {
        Ray::new(self.origin, self.lower_left_corner + sx * self.x + sy * self.y)
    }
}
