//! Mesh geometry handed from a scene loader to the renderer.
//!
//! Triangles use counter-clockwise winding: the face normal of
//! `(p0, p1, p2)` is `(p1 - p0) x (p2 - p0)`.

use pt_math::{Aabb, Vec3};

/// A mesh consisting of vertex positions, optional normals and UVs, and
/// triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional, face normals are used when missing)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional, one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self::new_with_uvs(positions, indices, normals, None)
    }

    /// Create a new mesh with UV coordinates.
    pub fn new_with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
        }
    }

    /// A flat parallelogram spanned by `u` and `v` from `corner`.
    ///
    /// The normal is `u x v`; UVs run 0..1 along each edge.
    pub fn parallelogram(corner: Vec3, u: Vec3, v: Vec3) -> Self {
        let mut mesh = Self::new_with_uvs(Vec::new(), Vec::new(), Some(Vec::new()), Some(Vec::new()));
        mesh.add_parallelogram(corner, u, v);
        mesh
    }

    /// An axis-aligned box with outward-facing flat normals.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let d = max - min;
        let (dx, dy, dz) = (Vec3::X * d.x, Vec3::Y * d.y, Vec3::Z * d.z);

        let mut mesh = Self::new_with_uvs(Vec::new(), Vec::new(), Some(Vec::new()), Some(Vec::new()));
        mesh.add_parallelogram(min, dy, dx); // -Z
        mesh.add_parallelogram(min, dz, dy); // -X
        mesh.add_parallelogram(min, dx, dz); // -Y
        mesh.add_parallelogram(max, -dy, -dz); // +X
        mesh.add_parallelogram(max, -dx, -dy); // +Z
        mesh.add_parallelogram(max, -dz, -dx); // +Y
        mesh
    }

    fn add_parallelogram(&mut self, corner: Vec3, u: Vec3, v: Vec3) {
        let base = self.positions.len() as u32;
        let normal = u.cross(v).normalize_or_zero();

        self.positions
            .extend_from_slice(&[corner, corner + u, corner + u + v, corner + v]);
        if let Some(normals) = &mut self.normals {
            normals.extend_from_slice(&[normal; 4]);
        }
        if let Some(uvs) = &mut self.uvs {
            uvs.extend_from_slice(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        self.bounds = Self::compute_bounds(&self.positions);
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        if positions.is_empty() {
            return Aabb::EMPTY;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for pos in positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        Aabb::from_points(min, max)
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Replaces existing normals. Vertices not referenced by any valid face
    /// get +Y.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (face[0] as usize, face[1] as usize, face[2] as usize);
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Check if the mesh has UV coordinates.
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}
