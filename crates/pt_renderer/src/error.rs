use thiserror::Error;

use crate::accel::AccelError;
use pt_core::TextureError;

/// Errors reported by the renderer's setup and lifecycle operations.
///
/// Per-pixel evaluation never fails; these only come out of scene
/// construction, resizing and settings changes.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image size {width}x{height} at subsampling {subsampling} has no pixels")]
    InvalidSize {
        width: u32,
        height: u32,
        subsampling: u32,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Accel(#[from] AccelError),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

pub type RenderResult<T> = Result<T, RenderError>;
