//! Render settings.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Parameters of the progressive renderer.
///
/// Missing fields take their defaults when deserialized, so a settings file
/// only needs the values it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scattering events after the first hit; 0 means direct light only
    pub max_bounces: u32,
    /// Stop refining after this many passes (0 = never stop)
    pub max_paths_per_pixel: u32,
    /// Render at 1/subsampling of the window resolution
    pub subsampling: u32,
    /// Render threads (0 = rayon's global pool)
    pub worker_threads: usize,
    /// Base seed of the per-pixel random streams
    pub seed: u64,
    /// Randomize the sample position inside each pixel
    pub jitter: bool,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_bounces: 8,
            max_paths_per_pixel: 0,
            subsampling: 4,
            worker_threads: 0,
            seed: 0,
            jitter: true,
            fov_degrees: 45.0,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> RenderResult<()> {
        if self.subsampling == 0 {
            return Err(RenderError::InvalidSettings(
                "subsampling must be at least 1".to_string(),
            ));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(RenderError::InvalidSettings(format!(
                "field of view must be between 0 and 180 degrees, got {}",
                self.fov_degrees
            )));
        }
        Ok(())
    }

    /// Whether switching from `other` changes what a pass computes, which
    /// invalidates the accumulated samples.
    ///
    /// The sample cap and thread count only change how long and where
    /// passes run.
    pub fn changes_radiance(&self, other: &Settings) -> bool {
        self.max_bounces != other.max_bounces
            || self.subsampling != other.subsampling
            || self.seed != other.seed
            || self.jitter != other.jitter
            || self.fov_degrees != other.fov_degrees
    }
}
