//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Binary tree over the scene triangles. Triangles are reordered during the
//! build so every leaf owns a contiguous range.

use pt_core::Material;
use pt_math::{Aabb, Interval, Ray};

use super::triangle::{Triangle, TriangleHit};
use super::{AccelResult, Accelerator, Geometry};
use crate::hit::Intersection;
use crate::RAY_EPSILON;

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with triangles.
#[derive(Debug)]
enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node owning `triangles[start..end]`.
    Leaf { start: usize, end: usize, bbox: Aabb },
}

/// BVH over triangle geometry, the default [`Accelerator`].
#[derive(Debug)]
pub struct Bvh {
    root: BvhNode,
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
}

impl Bvh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Edit materials in place.
    ///
    /// Geometry is untouched, so no rebuild is needed; restart accumulation
    /// after editing.
    pub fn materials_mut(&mut self) -> &mut [Material] {
        &mut self.materials
    }

    pub fn bounding_box(&self) -> Aabb {
        self.root.bounding_box()
    }

    /// Recursive BVH construction.
    ///
    /// Simple median-split approach: sort triangles by centroid on the
    /// longest centroid axis, split in half, recurse.
    fn build_node(triangles: &mut [Triangle], offset: usize) -> BvhNode {
        let n = triangles.len();

        let bounds = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bounding_box()));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                start: offset,
                end: offset + n,
                bbox: bounds,
            };
        }

        // Choose split axis based on centroid spread
        let centroid_bounds = triangles.iter().fold(Aabb::EMPTY, |acc, t| {
            let c = t.bounding_box().centroid();
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        triangles.sort_unstable_by(|a, b| {
            let a_val = a.bounding_box().centroid()[axis];
            let b_val = b.bounding_box().centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        let mid = n / 2;
        let (left_tris, right_tris) = triangles.split_at_mut(mid);
        let left = Self::build_node(left_tris, offset);
        let right = Self::build_node(right_tris, offset + mid);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Closest hit below `closest`, as (triangle index, hit).
    fn closest_hit(
        &self,
        node: &BvhNode,
        ray: &Ray,
        mut closest: f32,
    ) -> Option<(usize, TriangleHit)> {
        if !node.bounding_box().hit(ray, Interval::new(RAY_EPSILON, closest)) {
            return None;
        }

        match node {
            BvhNode::Leaf { start, end, .. } => {
                let mut best = None;
                for index in *start..*end {
                    let interval = Interval::new(RAY_EPSILON, closest);
                    if let Some(hit) = self.triangles[index].hit(ray, interval) {
                        closest = hit.t;
                        best = Some((index, hit));
                    }
                }
                best
            }
            BvhNode::Branch { left, right, .. } => {
                let hit_left = self.closest_hit(left, ray, closest);

                // Only check right up to closest hit
                let right_max = hit_left.map_or(closest, |(_, hit)| hit.t);
                let hit_right = self.closest_hit(right, ray, right_max);

                hit_right.or(hit_left)
            }
        }
    }

    fn any_hit(&self, node: &BvhNode, ray: &Ray, ray_t: Interval) -> bool {
        if !node.bounding_box().hit(ray, ray_t) {
            return false;
        }

        match node {
            BvhNode::Leaf { start, end, .. } => self.triangles[*start..*end]
                .iter()
                .any(|t| t.hit(ray, ray_t).is_some()),
            BvhNode::Branch { left, right, .. } => {
                self.any_hit(left, ray, ray_t) || self.any_hit(right, ray, ray_t)
            }
        }
    }
}

impl BvhNode {
    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

impl Accelerator for Bvh {
    fn build(geometry: Geometry) -> AccelResult<Self> {
        let (mut triangles, materials) = geometry.into_triangles().map_err(|e| {
            log::error!("BVH build failed: {}", e);
            e
        })?;

        let root = Self::build_node(&mut triangles, 0);
        log::info!(
            "Built BVH: {} triangles, {} materials, depth {}",
            triangles.len(),
            materials.len(),
            root.depth()
        );

        Ok(Self {
            root,
            triangles,
            materials,
        })
    }

    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        let (index, hit) = self.closest_hit(&self.root, ray, f32::INFINITY)?;
        let triangle = &self.triangles[index];
        let material = &self.materials[triangle.material as usize];
        Some(triangle.interaction(ray, hit, material))
    }

    fn occluded(&self, ray: &Ray, max_distance: f32) -> bool {
        if max_distance <= RAY_EPSILON {
            return false;
        }
        self.any_hit(&self.root, ray, Interval::new(RAY_EPSILON, max_distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::Mesh;
    use pt_math::{Color, Mat4, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_soup(rng: &mut StdRng, count: usize) -> Geometry {
        let mut positions = Vec::new();
        for _ in 0..count {
            let center = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            for _ in 0..3 {
                let jitter = Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                positions.push(center + jitter);
            }
        }
        let indices = (0..positions.len() as u32).collect();

        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::new(positions, indices, None),
            Material::default(),
            Mat4::IDENTITY,
        );
        geometry
    }

    fn brute_force(bvh: &Bvh, ray: &Ray) -> Option<f32> {
        bvh.triangles
            .iter()
            .filter_map(|t| t.hit(ray, Interval::new(RAY_EPSILON, f32::INFINITY)))
            .map(|h| h.t)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn random_direction(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if v.length_squared() > 1e-3 && v.length_squared() <= 1.0 {
                return v.normalize();
            }
        }
    }

    #[test]
    fn test_bvh_single_quad_is_leaf() {
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::parallelogram(Vec3::new(-1.0, 0.0, 1.0), Vec3::X * 2.0, Vec3::NEG_Z * 2.0),
            Material::default(),
            Mat4::IDENTITY,
        );
        let bvh = Bvh::build(geometry).unwrap();

        assert!(matches!(bvh.root, BvhNode::Leaf { start: 0, end: 2, .. }));
        let hit = bvh.intersect(&Ray::new(Vec3::new(0.2, 3.0, 0.1), Vec3::NEG_Y)).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert_eq!(hit.geometry_normal, Vec3::Y);
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = StdRng::seed_from_u64(7);
        let bvh = Bvh::build(random_soup(&mut rng, 300)).unwrap();
        assert!(matches!(bvh.root, BvhNode::Branch { .. }));

        let mut hits = 0;
        for _ in 0..500 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let ray = Ray::new(origin, random_direction(&mut rng));

            let expected = brute_force(&bvh, &ray);
            let actual = bvh.intersect(&ray).map(|h| h.t);
            match (expected, actual) {
                (Some(e), Some(a)) => {
                    hits += 1;
                    assert!((e - a).abs() < 1e-4, "brute force {e} vs bvh {a}");
                }
                (None, None) => {}
                other => panic!("mismatch: {:?}", other),
            }
            assert_eq!(expected.is_some(), bvh.occluded(&ray, f32::INFINITY));
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_occluded_respects_max_distance() {
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::cuboid(Vec3::new(-1.0, 4.0, -1.0), Vec3::new(1.0, 6.0, 1.0)),
            Material::default(),
            Mat4::IDENTITY,
        );
        let bvh = Bvh::build(geometry).unwrap();

        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        assert!(!bvh.occluded(&ray, 3.9));
        assert!(bvh.occluded(&ray, 4.1));
        assert!(bvh.occluded(&ray, f32::INFINITY));
        assert!(!bvh.occluded(&Ray::new(Vec3::ZERO, Vec3::NEG_Y), f32::INFINITY));
        assert!(!bvh.occluded(&ray, 0.0));
    }

    #[test]
    fn test_transparent_pane_still_occludes() {
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::parallelogram(Vec3::new(-1.0, 2.0, 1.0), Vec3::X * 2.0, Vec3::NEG_Z * 2.0),
            Material::new("glass", Color::ONE).with_transparency(1.0),
            Mat4::IDENTITY,
        );
        let bvh = Bvh::build(geometry).unwrap();

        assert!(bvh.occluded(&Ray::new(Vec3::ZERO, Vec3::Y), 5.0));
    }

    #[test]
    fn test_intersect_ignores_self_hit() {
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::parallelogram(Vec3::new(-1.0, 0.0, 1.0), Vec3::X * 2.0, Vec3::NEG_Z * 2.0),
            Material::default(),
            Mat4::IDENTITY,
        );
        let bvh = Bvh::build(geometry).unwrap();

        // Starting on the surface, a ray leaving it must not hit it again
        let ray = Ray::new(Vec3::new(0.0, RAY_EPSILON * 0.1, 0.0), Vec3::new(0.3, 1.0, 0.0));
        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn test_materials_mut() {
        let mut geometry = Geometry::new();
        geometry.add_mesh(
            &Mesh::cuboid(Vec3::ZERO, Vec3::ONE),
            Material::default(),
            Mat4::IDENTITY,
        );
        let mut bvh = Bvh::build(geometry).unwrap();
        bvh.materials_mut()[0].reflectivity = 0.7;

        let hit = bvh.intersect(&Ray::new(Vec3::new(0.5, 0.5, 5.0), Vec3::NEG_Z)).unwrap();
        assert_eq!(hit.material.reflectivity, 0.7);
        assert!(bvh.bounding_box().max().z >= 1.0);
    }
}
