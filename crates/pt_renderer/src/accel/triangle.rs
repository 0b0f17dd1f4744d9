//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use pt_core::Material;
use pt_math::{Aabb, Interval, Ray, Vec3};

use crate::hit::Intersection;

/// Parametric hit on a triangle before shading attributes are filled in.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// A world-space triangle with per-vertex shading attributes.
#[derive(Clone, Debug)]
pub(crate) struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// Face normal from the winding (unit length)
    normal: Vec3,
    /// Vertex normals, `None` for flat shading
    normals: Option<[Vec3; 3]>,
    uvs: [[f32; 2]; 3],
    pub material: u32,
    bbox: Aabb,
}

impl Triangle {
    /// Create a triangle, or `None` if it has no area.
    pub fn new(
        positions: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
        uvs: [[f32; 2]; 3],
        material: u32,
    ) -> Option<Self> {
        let [v0, v1, v2] = positions;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let normal = edge1.cross(edge2).try_normalize()?;

        let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));

        // Zero vertex normals (e.g. from a degenerate transform) fall back to flat
        let normals = normals.filter(|n| n.iter().all(|n| n.length_squared() > 0.0));

        Some(Self {
            v0,
            edge1,
            edge2,
            normal,
            normals,
            uvs,
            material,
            bbox,
        })
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Möller-Trumbore ray-triangle intersection.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        let h = ray.direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(TriangleHit { t, u, v })
    }

    /// Fill in the surface interaction for a hit found by [`Triangle::hit`].
    pub fn interaction<'a>(
        &self,
        ray: &Ray,
        hit: TriangleHit,
        material: &'a Material,
    ) -> Intersection<'a> {
        let w = 1.0 - hit.u - hit.v;

        let front_face = ray.direction.dot(self.normal) < 0.0;
        let geometry_normal = if front_face { self.normal } else { -self.normal };

        let shading_normal = self
            .normals
            .map(|[n0, n1, n2]| (n0 * w + n1 * hit.u + n2 * hit.v).normalize_or_zero())
            .filter(|n| *n != Vec3::ZERO)
            .unwrap_or(self.normal);
        // Keep the shading normal on the same side as the geometric one
        let shading_normal = if shading_normal.dot(geometry_normal) < 0.0 {
            -shading_normal
        } else {
            shading_normal
        };

        let [uv0, uv1, uv2] = self.uvs;
        let uv = [
            uv0[0] * w + uv1[0] * hit.u + uv2[0] * hit.v,
            uv0[1] * w + uv1[1] * hit.u + uv2[1] * hit.v,
        ];

        Intersection {
            position: ray.at(hit.t),
            geometry_normal,
            shading_normal,
            wo: -ray.direction,
            t: hit.t,
            uv,
            front_face,
            material,
        }
    }
}
