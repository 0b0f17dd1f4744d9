//! Scene data for the progressive path tracer.
//!
//! This crate provides the renderer-agnostic inputs a scene loader hands to
//! the renderer:
//!
//! - **Materials and lights**: `Material`, `PointLight`
//! - **Geometry**: `Mesh` (indexed triangles with optional normals/UVs)
//! - **Textures**: `Texture`, decoded to linear float RGBA by `load_texture`

pub mod mesh;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use mesh::Mesh;
pub use scene::{Material, PointLight};
pub use texture::{load_texture, Texture, TextureError, TextureResult};
