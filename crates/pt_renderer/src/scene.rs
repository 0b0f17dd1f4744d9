//! Everything a pass reads: geometry, lights and the environment.

use pt_core::PointLight;

use crate::accel::{Accelerator, Bvh, Geometry};
use crate::environment::Environment;
use crate::error::RenderResult;

/// A renderable scene.
///
/// Shared by reference with every render thread during a pass.
pub struct Scene<A: Accelerator = Bvh> {
    pub accel: A,
    pub lights: Vec<PointLight>,
    pub environment: Environment,
}

impl<A: Accelerator> Scene<A> {
    pub fn new(accel: A, lights: Vec<PointLight>, environment: Environment) -> Self {
        Self {
            accel,
            lights,
            environment,
        }
    }

    /// Build the accelerator from `geometry` and assemble the scene.
    pub fn build(
        geometry: Geometry,
        lights: Vec<PointLight>,
        environment: Environment,
    ) -> RenderResult<Self> {
        let accel = A::build(geometry)?;
        log::info!("Scene ready with {} point lights", lights.len());
        Ok(Self::new(accel, lights, environment))
    }
}
