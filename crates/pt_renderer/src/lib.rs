//! Progressive Monte Carlo path tracing.
//!
//! The renderer refines an accumulation image one pass at a time. Each call
//! to [`PathTracer::trace_paths`] adds exactly one new radiance sample to
//! every pixel; callers restart accumulation whenever the camera, scene or
//! settings change.
//!
//! Rendering pieces, leaf first:
//!
//! - [`accel`]: triangle geometry and the [`Accelerator`] contract, with a
//!   [`Bvh`] implementation
//! - [`brdf`]: material lobes and the composite [`Bsdf`]
//! - [`environment`]: equirectangular sky lookups
//! - [`integrator`]: the per-path radiance estimator
//! - [`tracer`]: the progressive driver that owns the [`Image`]

pub mod accel;
pub mod brdf;
pub mod camera;
pub mod environment;
mod error;
mod hit;
pub mod image;
pub mod integrator;
mod sampling;
pub mod scene;
pub mod settings;
pub mod tracer;

pub use accel::{AccelError, AccelResult, Accelerator, Bvh, Geometry};
pub use brdf::{Bsdf, BsdfSample, Lobe};
pub use camera::{Camera, ScreenBasis};
pub use environment::{direction_to_uv, Environment};
pub use error::{RenderError, RenderResult};
pub use hit::Intersection;
pub use image::Image;
pub use integrator::{li, shade};
pub use scene::Scene;
pub use settings::Settings;
pub use tracer::PathTracer;

/// Re-export math and scene types used in the public API
pub use pt_core::{Material, Mesh, PointLight, Texture};
pub use pt_math::{Color, Mat4, Ray, Vec3};

/// Distance secondary rays are pushed off a surface to avoid self-hits.
pub const RAY_EPSILON: f32 = 1e-4;
