//! Scene geometry and ray queries against it.
//!
//! A [`Geometry`] collects transformed meshes and their materials. It is
//! consumed once by [`Accelerator::build`]; after that the accelerator is
//! read-only and shared between render threads.

mod bvh;
mod triangle;

pub use bvh::Bvh;

use pt_core::{Material, Mesh};
use pt_math::{Mat3, Mat4, Ray, Vec3};
use thiserror::Error;

use crate::hit::Intersection;
use triangle::Triangle;

/// Errors from validating geometry while building an accelerator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccelError {
    #[error("geometry contains no triangles")]
    NoTriangles,

    #[error("mesh {mesh}: vertex index {index} out of range ({vertex_count} vertices)")]
    IndexOutOfRange {
        mesh: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh {mesh}: material {material} out of range ({material_count} materials)")]
    MaterialOutOfRange {
        mesh: usize,
        material: u32,
        material_count: usize,
    },

    #[error("mesh {mesh}: {attribute} has {len} entries, expected {expected}")]
    AttributeMismatch {
        mesh: usize,
        attribute: &'static str,
        len: usize,
        expected: usize,
    },
}

pub type AccelResult<T> = Result<T, AccelError>;

/// Ray queries over a fixed set of triangles.
///
/// Implementations are built once and never mutated during a pass, so
/// every query takes `&self` and may run concurrently.
pub trait Accelerator: Send + Sync {
    /// Consume the geometry and build the structure.
    fn build(geometry: Geometry) -> AccelResult<Self>
    where
        Self: Sized;

    /// Nearest hit with distance in `(RAY_EPSILON, inf)`.
    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>>;

    /// Whether anything lies along the ray with distance in
    /// `(RAY_EPSILON, max_distance)`.
    ///
    /// Materials are not consulted: transparent surfaces block shadow rays
    /// like opaque ones, so light through them only arrives via bounces.
    fn occluded(&self, ray: &Ray, max_distance: f32) -> bool;
}

/// One mesh as added to the geometry, already in world space.
#[derive(Clone, Debug)]
struct GeometryMesh {
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    uvs: Option<Vec<[f32; 2]>>,
    indices: Vec<u32>,
    material: u32,
}

/// Triangle soup plus material table, the input of [`Accelerator::build`].
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    meshes: Vec<GeometryMesh>,
    materials: Vec<Material>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a material to the table and return its index.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    /// Add a mesh with its own material, placed by `transform`.
    ///
    /// Returns the index of the new material.
    pub fn add_mesh(&mut self, mesh: &Mesh, material: Material, transform: Mat4) -> u32 {
        let id = self.add_material(material);
        self.add_mesh_with_material(mesh, id, transform);
        id
    }

    /// Add a mesh that uses an existing entry of the material table.
    ///
    /// Positions go through `transform` and normals through its inverse
    /// transpose. Indices and attribute lengths are checked at build time.
    pub fn add_mesh_with_material(&mut self, mesh: &Mesh, material: u32, transform: Mat4) {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();

        let positions = mesh
            .positions
            .iter()
            .map(|p| transform.transform_point3(*p))
            .collect();
        let normals = mesh.normals.as_ref().map(|normals| {
            normals
                .iter()
                .map(|n| (normal_matrix * *n).normalize_or_zero())
                .collect()
        });

        self.meshes.push(GeometryMesh {
            positions,
            normals,
            uvs: mesh.uvs.clone(),
            indices: mesh.indices.clone(),
            material,
        });
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }

    /// Validate every mesh and flatten them into triangles.
    ///
    /// Zero-area triangles are dropped with a warning.
    fn into_triangles(self) -> AccelResult<(Vec<Triangle>, Vec<Material>)> {
        let material_count = self.materials.len();
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let mut degenerate = 0usize;

        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            mesh.validate(mesh_index, material_count)?;

            for face in mesh.indices.chunks_exact(3) {
                let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
                let positions = [mesh.positions[i0], mesh.positions[i1], mesh.positions[i2]];
                let normals = mesh.normals.as_ref().map(|n| [n[i0], n[i1], n[i2]]);
                let uvs = mesh
                    .uvs
                    .as_ref()
                    .map_or([[0.0; 2]; 3], |uv| [uv[i0], uv[i1], uv[i2]]);

                match Triangle::new(positions, normals, uvs, mesh.material) {
                    Some(triangle) => triangles.push(triangle),
                    None => degenerate += 1,
                }
            }
        }

        if degenerate > 0 {
            log::warn!("Skipped {} zero-area triangles", degenerate);
        }
        if triangles.is_empty() {
            return Err(AccelError::NoTriangles);
        }

        Ok((triangles, self.materials))
    }
}

impl GeometryMesh {
    fn validate(&self, mesh: usize, material_count: usize) -> AccelResult<()> {
        if self.material as usize >= material_count {
            return Err(AccelError::MaterialOutOfRange {
                mesh,
                material: self.material,
                material_count,
            });
        }

        let vertex_count = self.positions.len();
        if self.indices.len() % 3 != 0 {
            return Err(AccelError::AttributeMismatch {
                mesh,
                attribute: "indices",
                len: self.indices.len(),
                expected: self.indices.len() / 3 * 3,
            });
        }
        if let Some(normals) = &self.normals {
            if normals.len() != vertex_count {
                return Err(AccelError::AttributeMismatch {
                    mesh,
                    attribute: "normals",
                    len: normals.len(),
                    expected: vertex_count,
                });
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertex_count {
                return Err(AccelError::AttributeMismatch {
                    mesh,
                    attribute: "uvs",
                    len: uvs.len(),
                    expected: vertex_count,
                });
            }
        }

        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(AccelError::IndexOutOfRange {
                mesh,
                index,
                vertex_count,
            });
        }

        Ok(())
    }
}
