//! Bounding volume hierarchy over a triangle mesh
//!
//! Median-split build along the largest centroid axis, flattened into a
//! node array. Traversal uses the slab test for boxes and Möller–Trumbore
//! for triangles.

use crate::assets::TriangleMesh;
use crate::foundation::math::Vec3;

/// Triangles per leaf before a node is split
const LEAF_SIZE: usize = 4;

/// Ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// Ray from `origin`; `direction` is normalized
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at distance `t`
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Closest intersection along a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance along the ray
    pub t: f32,
    /// Index of the triangle in the source mesh
    pub triangle: usize,
    /// Barycentric weight of the second corner
    pub u: f32,
    /// Barycentric weight of the third corner
    pub v: f32,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Lower corner
    pub min: Vec3,
    /// Upper corner
    pub max: Vec3,
}

impl Aabb {
    /// Box that contains nothing; growing it by any point yields that point
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Bounds of one triangle
    pub fn from_triangle(triangle: &[Vec3; 3]) -> Self {
        triangle.iter().fold(Self::empty(), |b, p| b.with_point(p))
    }

    /// Grow to contain `point`
    pub fn with_point(self, point: &Vec3) -> Self {
        Self {
            min: self.min.inf(point),
            max: self.max.sup(point),
        }
    }

    /// Smallest box containing both
    pub fn union(self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Midpoint
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Axis (0, 1 or 2) along which the box is widest
    pub fn largest_axis(&self) -> usize {
        self.extent().imax()
    }

    /// Slab test; returns the entry distance when the ray hits within `t_max`
    ///
    /// `inv_dir` is the component-wise reciprocal of the ray direction.
    pub fn intersect_ray(&self, origin: &Vec3, inv_dir: &Vec3, t_max: f32) -> Option<f32> {
        let mut t_near = 0.0_f32;
        let mut t_far = t_max;
        for axis in 0..3 {
            // Parallel to this slab: inside it or never
            if inv_dir[axis].is_infinite() {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - origin[axis]) * inv_dir[axis];
            let t2 = (self.max[axis] - origin[axis]) * inv_dir[axis];
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }
        (t_near <= t_far).then_some(t_near)
    }
}

#[derive(Debug, Clone, Copy)]
enum BvhNode {
    Leaf { bounds: Aabb, first: u32, count: u32 },
    Interior { bounds: Aabb, left: u32, right: u32 },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            Self::Leaf { bounds, .. } | Self::Interior { bounds, .. } => bounds,
        }
    }
}

/// Flattened BVH owning a copy of the mesh triangles
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    order: Vec<u32>,
    triangles: Vec<[Vec3; 3]>,
}

impl Bvh {
    /// Build over every triangle of `mesh`
    pub fn build(mesh: &TriangleMesh) -> Self {
        let triangles: Vec<[Vec3; 3]> = (0..mesh.triangle_count()).map(|i| mesh.triangle(i)).collect();
        let centroids: Vec<Vec3> = triangles.iter().map(|t| (t[0] + t[1] + t[2]) / 3.0).collect();
        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();
        let mut nodes = Vec::with_capacity(2 * triangles.len() / LEAF_SIZE + 1);

        if !triangles.is_empty() {
            let builder = Builder { triangles: &triangles, centroids: &centroids };
            builder.build(&mut order, 0, &mut nodes);
        }
        log::debug!("Built BVH: {} triangles, {} nodes", triangles.len(), nodes.len());

        Self { nodes, order, triangles }
    }

    /// Triangles referenced by the leaves
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Flattened node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of the whole mesh, `None` when it is empty
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| *n.bounds())
    }

    /// Unit geometric normal of a triangle
    pub fn normal(&self, triangle: usize) -> Vec3 {
        let [a, b, c] = self.triangles[triangle];
        (b - a).cross(&(c - a)).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y)
    }

    /// Closest hit closer than `t_max`
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> Option<Hit> {
        if self.nodes.is_empty() {
            return None;
        }
        let inv_dir = ray.direction.map(|d| 1.0 / d);
        let mut closest = None;
        let mut t_max = t_max;
        let mut stack = Vec::with_capacity(64);
        stack.push(0u32);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bounds().intersect_ray(&ray.origin, &inv_dir, t_max).is_none() {
                continue;
            }
            match *node {
                BvhNode::Leaf { first, count, .. } => {
                    let first = first as usize;
                    for &triangle in &self.order[first..first + count as usize] {
                        let corners = &self.triangles[triangle as usize];
                        if let Some((t, u, v)) = intersect_triangle(ray, corners, t_max) {
                            t_max = t;
                            closest = Some(Hit { t, triangle: triangle as usize, u, v });
                        }
                    }
                }
                BvhNode::Interior { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        closest
    }
}

struct Builder<'a> {
    triangles: &'a [[Vec3; 3]],
    centroids: &'a [Vec3],
}

impl Builder<'_> {
    /// Build the subtree over `order`, whose first entry sits at `offset` in
    /// the full order array. Returns the subtree's node index.
    fn build(&self, order: &mut [u32], offset: usize, nodes: &mut Vec<BvhNode>) -> u32 {
        let bounds = order
            .iter()
            .fold(Aabb::empty(), |b, &i| b.union(&Aabb::from_triangle(&self.triangles[i as usize])));
        let index = nodes.len() as u32;
        let leaf = BvhNode::Leaf { bounds, first: offset as u32, count: order.len() as u32 };

        if order.len() <= LEAF_SIZE {
            nodes.push(leaf);
            return index;
        }

        let centroid_bounds = order
            .iter()
            .fold(Aabb::empty(), |b, &i| b.with_point(&self.centroids[i as usize]));
        let axis = centroid_bounds.largest_axis();
        // Coincident centroids cannot be separated
        if centroid_bounds.extent()[axis] <= 0.0 {
            nodes.push(leaf);
            return index;
        }

        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| {
            self.centroids[a as usize][axis].total_cmp(&self.centroids[b as usize][axis])
        });

        nodes.push(leaf);
        let (low, high) = order.split_at_mut(mid);
        let left = self.build(low, offset, nodes);
        let right = self.build(high, offset + mid, nodes);
        nodes[index as usize] = BvhNode::Interior { bounds, left, right };
        index
    }
}

/// Möller–Trumbore ray/triangle test
///
/// Returns `(t, u, v)` for hits with `0 < t < t_max`. Both faces count.
pub fn intersect_triangle(ray: &Ray, triangle: &[Vec3; 3], t_max: f32) -> Option<(f32, f32, f32)> {
    const EPSILON: f32 = 1.0e-7;

    let edge1 = triangle[1] - triangle[0];
    let edge2 = triangle[2] - triangle[0];
    let p = ray.direction.cross(&edge2);
    let det = edge1.dot(&p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - triangle[0];
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = ray.direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(&q) * inv_det;
    (t > EPSILON && t < t_max).then_some((t, u, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// `n x n` grid of quads in the plane `z = depth`, spanning [-1, 1]
    fn grid(n: u32, depth: f32) -> TriangleMesh {
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                let x = -1.0 + 2.0 * i as f32 / n as f32;
                let y = -1.0 + 2.0 * j as f32 / n as f32;
                positions.push(Vec3::new(x, y, depth));
            }
        }
        for j in 0..n {
            for i in 0..n {
                let a = j * (n + 1) + i;
                let b = a + 1;
                let c = a + n + 1;
                let d = c + 1;
                triangles.push([a, b, d]);
                triangles.push([a, d, c]);
            }
        }
        TriangleMesh { positions, triangles }
    }

    #[test]
    fn test_triangle_hit_and_miss() {
        let triangle = [Vec3::new(-1.0, -1.0, -2.0), Vec3::new(1.0, -1.0, -2.0), Vec3::new(0.0, 1.0, -2.0)];
        let ray = Ray::new(Vec3::zeros(), -Vec3::z());
        let (t, _, _) = intersect_triangle(&ray, &triangle, f32::INFINITY).unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-6);

        assert!(intersect_triangle(&ray, &triangle, 1.5).is_none());
        let away = Ray::new(Vec3::zeros(), Vec3::z());
        assert!(intersect_triangle(&away, &triangle, f32::INFINITY).is_none());
        let beside = Ray::new(Vec3::new(3.0, 0.0, 0.0), -Vec3::z());
        assert!(intersect_triangle(&beside, &triangle, f32::INFINITY).is_none());
    }

    #[test]
    fn test_slab_test() {
        let bounds = Aabb { min: Vec3::repeat(-1.0), max: Vec3::repeat(1.0) };
        let dir = Vec3::new(0.0, 0.0, -1.0);
        let inv = dir.map(|d| 1.0 / d);
        let entry = bounds.intersect_ray(&Vec3::new(0.0, 0.0, 5.0), &inv, f32::INFINITY);
        assert_relative_eq!(entry.unwrap(), 4.0);
        assert!(bounds.intersect_ray(&Vec3::new(0.0, 0.0, 5.0), &inv, 3.0).is_none());
        assert!(bounds.intersect_ray(&Vec3::new(2.0, 0.0, 5.0), &inv, f32::INFINITY).is_none());
        // Origin inside the box
        assert_eq!(bounds.intersect_ray(&Vec3::zeros(), &inv, f32::INFINITY), Some(0.0));
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let mesh = grid(16, -3.0);
        let bvh = Bvh::build(&mesh);
        assert_eq!(bvh.triangle_count(), 512);
        assert!(bvh.node_count() > 1);

        let bounds = bvh.bounds().unwrap();
        assert_relative_eq!(bounds.min, Vec3::new(-1.0, -1.0, -3.0));
        assert_relative_eq!(bounds.max, Vec3::new(1.0, 1.0, -3.0));

        for (sx, sy) in [(0.0, 0.0), (0.37, -0.61), (-0.93, 0.88), (1.5, 0.0)] {
            let ray = Ray::new(Vec3::zeros(), Vec3::new(sx, sy, -3.0).normalize());
            let brute = (0..mesh.triangle_count())
                .filter_map(|i| intersect_triangle(&ray, &mesh.triangle(i), f32::INFINITY))
                .map(|(t, _, _)| t)
                .reduce(f32::min);
            let hit = bvh.intersect(&ray, f32::INFINITY);
            match (brute, hit) {
                (Some(t), Some(hit)) => assert_relative_eq!(hit.t, t, epsilon = 1e-5),
                (None, None) => {}
                other => panic!("BVH disagrees with brute force: {other:?}"),
            }
        }
    }

    #[test]
    fn test_closest_hit_wins() {
        let mut mesh = grid(2, -5.0);
        let near = grid(2, -2.0);
        let base = mesh.positions.len() as u32;
        mesh.positions.extend(near.positions);
        mesh.triangles.extend(near.triangles.iter().map(|t| t.map(|i| i + base)));

        let bvh = Bvh::build(&mesh);
        let hit = bvh.intersect(&Ray::new(Vec3::new(0.1, 0.2, 0.0), -Vec3::z()), f32::INFINITY).unwrap();
        assert_relative_eq!(hit.t, 2.0, epsilon = 1e-5);
        assert!(hit.triangle >= 8);
        assert_relative_eq!(bvh.normal(hit.triangle).z.abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_mesh() {
        let bvh = Bvh::build(&TriangleMesh::default());
        assert!(bvh.bounds().is_none());
        assert!(bvh.intersect(&Ray::new(Vec3::zeros(), Vec3::z()), f32::INFINITY).is_none());
    }
}
