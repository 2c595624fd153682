use std::collections::HashMap;

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::types::MassProperties;

/// Axis-aligned bounding box used for mesh bounds and BVH nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.extent().length()
    }

    /// Slab-method ray/AABB intersection; returns the entry parameter `t` if
    /// the ray hits within `[0, max_t]`.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = max_t;
        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];
            if d.abs() < 1e-12 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv_d = 1.0 / d;
            let mut t1 = (lo - o) * inv_d;
            let mut t2 = (hi - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Simple BVH node representation for triangle meshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshBvhNode {
    pub bounds: Aabb,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub start: usize,
    pub count: usize,
}

/// Placeholder BVH storing a single node per mesh for now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshBvh {
    pub nodes: Vec<MeshBvhNode>,
}

impl MeshBvh {
    pub fn new(nodes: Vec<MeshBvhNode>) -> Self {
        Self { nodes }
    }
}

/// Triangle mesh collider data used for advanced shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<[u32; 3]>,
    pub bounds: Aabb,
    pub bvh: MeshBvh,
}

impl TriangleMesh {
    pub fn builder(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> MeshBuilder {
        MeshBuilder::new(vertices, indices)
    }

    pub fn support_point(&self, direction: Vec3) -> Vec3 {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Vec3::ZERO;
        }
        self.vertices
            .iter()
            .copied()
            .max_by(|a, b| a.dot(dir).partial_cmp(&b.dot(dir)).unwrap())
            .unwrap_or(Vec3::ZERO)
    }

    pub fn support_radius(&self, direction: Vec3) -> f32 {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return 0.0;
        }
        self.vertices
            .iter()
            .map(|v| v.dot(dir))
            .fold(f32::NEG_INFINITY, f32::max)
            .max(0.0)
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounds.radius()
    }

    /// Approximates mass & inertia by treating the mesh bounds as a solid box.
    pub fn approximate_mass_properties(&self, density: f32) -> MassProperties {
        let extents = self.bounds.extent();
        let size = extents * 2.0;
        let volume = size.x * size.y * size.z;
        let density = density.max(0.0001);
        let mass = (volume * density).max(0.0001);
        let factor = mass / 12.0;
        let inertia = Mat3::from_diagonal(Vec3::new(
            factor * (size.y * size.y + size.z * size.z),
            factor * (size.x * size.x + size.z * size.z),
            factor * (size.x * size.x + size.y * size.y),
        ));

        MassProperties { mass, inertia }
    }

    /// Nearest ray hit in mesh-local space, or `None`. Triangle-vs-triangle
    /// contact is out of scope; this supports raycasts and broad-phase
    /// bounds only.
    pub fn raycast_local(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<(f32, Vec3)> {
        if self.bvh.nodes.is_empty() {
            return None;
        }
        let mut best: Option<(f32, Vec3)> = None;
        let mut stack = vec![0usize];
        while let Some(node_index) = stack.pop() {
            let node = &self.bvh.nodes[node_index];
            if node.bounds.raycast(origin, dir, max_t).is_none() {
                continue;
            }
            match (node.left, node.right) {
                (Some(l), Some(r)) => {
                    stack.push(l);
                    stack.push(r);
                }
                _ => {
                    for tri in &self.indices[node.start..node.start + node.count] {
                        let a = self.vertices[tri[0] as usize];
                        let b = self.vertices[tri[1] as usize];
                        let c = self.vertices[tri[2] as usize];
                        if let Some((t, normal)) = ray_triangle(origin, dir, a, b, c) {
                            if t <= max_t && best.map(|(bt, _)| t < bt).unwrap_or(true) {
                                best = Some((t, normal));
                            }
                        }
                    }
                }
            }
        }
        best
    }
}

/// Möller–Trumbore ray-triangle intersection; returns `(t, normal)`.
fn ray_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<(f32, Vec3)> {
    const EPS: f32 = 1e-7;
    let edge1 = b - a;
    let edge2 = c - a;
    let h = dir.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < EPS {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(h) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    if t < EPS {
        return None;
    }
    Some((t, edge1.cross(edge2).normalize_or_zero()))
}

/// Helper used to cook triangle meshes from raw vertex/index buffers.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Deduplicates vertices using a quantized grid for stability.
    pub fn weld_vertices(mut self, epsilon: f32) -> Self {
        if epsilon <= 0.0 || self.vertices.is_empty() {
            return self;
        }

        let inv = 1.0 / epsilon;
        let mut map: HashMap<(i32, i32, i32), u32> = HashMap::new();
        let mut new_vertices: Vec<Vec3> = Vec::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertices.len());

        for v in &self.vertices {
            let key = (
                (v.x * inv).round() as i32,
                (v.y * inv).round() as i32,
                (v.z * inv).round() as i32,
            );
            let index = *map.entry(key).or_insert_with(|| {
                let idx = new_vertices.len() as u32;
                new_vertices.push(*v);
                idx
            });
            remap.push(index);
        }

        for tri in &mut self.indices {
            tri[0] = remap[tri[0] as usize];
            tri[1] = remap[tri[1] as usize];
            tri[2] = remap[tri[2] as usize];
        }

        self.vertices = new_vertices;
        self
    }

    /// Recenters vertices around their centroid to keep transforms stable.
    pub fn recenter(mut self) -> Self {
        if self.vertices.is_empty() {
            return self;
        }
        let centroid: Vec3 =
            self.vertices.iter().copied().sum::<Vec3>() / self.vertices.len() as f32;
        for vertex in &mut self.vertices {
            *vertex -= centroid;
        }
        self
    }

    pub fn build(self) -> TriangleMesh {
        let bounds = Aabb::from_points(&self.vertices);
        let mut indices = self.indices;
        let mut nodes = Vec::new();
        if !indices.is_empty() {
            Self::build_recursive(&self.vertices, &mut indices, 0, indices.len(), &mut nodes);
        } else {
            nodes.push(MeshBvhNode {
                bounds,
                left: None,
                right: None,
                start: 0,
                count: 0,
            });
        }
        TriangleMesh {
            vertices: self.vertices,
            indices,
            bounds,
            bvh: MeshBvh::new(nodes),
        }
    }

    /// Builds a median-split BVH over triangle centroids, leaves capped at 4
    /// triangles. Returns the index of the node just pushed.
    fn build_recursive(
        vertices: &[Vec3],
        indices: &mut [[u32; 3]],
        start: usize,
        count: usize,
        nodes: &mut Vec<MeshBvhNode>,
    ) -> usize {
        let slice = &mut indices[start..start + count];
        let bounds = Aabb::from_points(
            &slice
                .iter()
                .flat_map(|tri| tri.iter().map(|&i| vertices[i as usize]))
                .collect::<Vec<_>>(),
        );

        if count <= 4 {
            let node_index = nodes.len();
            nodes.push(MeshBvhNode {
                bounds,
                left: None,
                right: None,
                start,
                count,
            });
            return node_index;
        }

        let extent = bounds.extent();
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        slice.sort_by(|a, b| {
            let ca = a.iter().map(|&i| vertices[i as usize][axis]).sum::<f32>();
            let cb = b.iter().map(|&i| vertices[i as usize][axis]).sum::<f32>();
            ca.partial_cmp(&cb).unwrap()
        });

        let mid = count / 2;
        let node_index = nodes.len();
        nodes.push(MeshBvhNode {
            bounds,
            left: None,
            right: None,
            start,
            count: 0,
        });

        let left = Self::build_recursive(vertices, indices, start, mid, nodes);
        let right = Self::build_recursive(vertices, indices, start + mid, count - mid, nodes);
        nodes[node_index].left = Some(left);
        nodes[node_index].right = Some(right);
        node_index
    }
}
