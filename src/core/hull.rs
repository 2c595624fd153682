//! Doubly-connected edge list (DCEL) representation of a convex polyhedron.
//!
//! Mirrors the half-edge layout used by the reference `dcel_half_edge`:
//! each half-edge stores its origin vertex, twin, and CCW next/prev within
//! its face; a face is identified implicitly by any one of its half-edges.
//! Used by SAT (face and edge queries via the Gauss map) and by GJK support
//! queries against arbitrary hull shapes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const NO_EDGE: i32 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HalfEdge {
    pub origin: u32,
    pub twin: u32,
    pub next: u32,
    pub prev: u32,
    /// Index of the face this half-edge bounds (CCW when viewed from outside).
    pub face: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Face {
    /// Any one half-edge bounding this face; the rest are found by walking `next`.
    pub first_edge: u32,
    pub edge_count: u32,
    pub normal: Vec3,
}

/// A convex hull stored as vertices plus a DCEL of half-edges and faces.
///
/// Vertices are expressed in the hull's local frame, centered on its own
/// center of mass (see [`HullBuilder`]) so that `RigidBody::mass_properties`
/// and hull-local support queries share the same origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hull {
    pub vertices: Vec<Vec3>,
    pub edges: Vec<HalfEdge>,
    pub faces: Vec<Face>,
}

impl Hull {
    /// Support point of the hull in world space given a world-space direction,
    /// with the caller-supplied `to_local`/`to_world` closures handling the
    /// rigid body's transform. Returns the vertex index and its local position.
    pub fn support_local(&self, dir_local: Vec3) -> (u32, Vec3) {
        let mut best_index = 0u32;
        let mut best_dot = f32::NEG_INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let dot = v.dot(dir_local);
            if dot > best_dot {
                best_dot = dot;
                best_index = i as u32;
            }
        }
        (best_index, self.vertices[best_index as usize])
    }

    pub fn face_vertices(&self, face: u32) -> Vec<Vec3> {
        let f = &self.faces[face as usize];
        let mut out = Vec::with_capacity(f.edge_count as usize);
        let mut e = f.first_edge;
        for _ in 0..f.edge_count {
            out.push(self.vertices[self.edges[e as usize].origin as usize]);
            e = self.edges[e as usize].next;
        }
        out
    }

    pub fn edge_endpoints(&self, edge: u32) -> (Vec3, Vec3) {
        let he = &self.edges[edge as usize];
        let a = self.vertices[he.origin as usize];
        let twin = &self.edges[he.twin as usize];
        let b = self.vertices[twin.origin as usize];
        (a, b)
    }

    /// The two faces adjacent to an edge, used by the Gauss-map edge-edge
    /// SAT query (the arc between an edge's two face normals).
    pub fn edge_adjacent_faces(&self, edge: u32) -> (u32, u32) {
        let he = &self.edges[edge as usize];
        let twin = &self.edges[he.twin as usize];
        (he.face, twin.face)
    }

    /// Iterates half-edge indices once per undirected edge (origin index <
    /// twin's origin index), avoiding visiting each edge from both sides.
    pub fn unique_edges(&self) -> impl Iterator<Item = u32> + '_ {
        self.edges.iter().enumerate().filter_map(move |(i, he)| {
            let twin_origin = self.edges[he.twin as usize].origin;
            if he.origin < twin_origin {
                Some(i as u32)
            } else {
                None
            }
        })
    }

    pub fn farthest_vertex_index(&self, dir: Vec3) -> u32 {
        self.support_local(dir).0
    }
}

/// Builds a [`Hull`] from a face list (each face a CCW-wound vertex loop),
/// re-centering vertices so the hull's local origin is its vertex centroid
/// and recording whether that re-centering happened.
pub struct HullBuilder {
    vertices: Vec<Vec3>,
    faces: Vec<Vec<u32>>,
    localized: bool,
}

impl HullBuilder {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            localized: false,
        }
    }

    pub fn vertices(mut self, vertices: Vec<Vec3>) -> Self {
        self.vertices = vertices;
        self
    }

    /// Adds a face as a CCW loop of vertex indices (viewed from outside the hull).
    pub fn face(mut self, loop_indices: Vec<u32>) -> Self {
        self.faces.push(loop_indices);
        self
    }

    pub fn build(mut self) -> Hull {
        if !self.localized {
            let centroid =
                self.vertices.iter().copied().sum::<Vec3>() / (self.vertices.len().max(1) as f32);
            for v in &mut self.vertices {
                *v -= centroid;
            }
            self.localized = true;
        }

        // Build half-edges per face loop, then stitch twins by matching
        // (origin, dest) pairs against their reverse.
        let mut edges: Vec<HalfEdge> = Vec::new();
        let mut face_records: Vec<Face> = Vec::with_capacity(self.faces.len());
        let mut edge_lookup: std::collections::HashMap<(u32, u32), u32> =
            std::collections::HashMap::new();

        for (face_index, loop_indices) in self.faces.iter().enumerate() {
            let n = loop_indices.len() as u32;
            let first = edges.len() as u32;
            for k in 0..n {
                let origin = loop_indices[k as usize];
                let dest = loop_indices[((k + 1) % n) as usize];
                let edge_index = edges.len() as u32;
                edges.push(HalfEdge {
                    origin,
                    twin: u32::MAX,
                    next: first + (k + 1) % n,
                    prev: first + (k + n - 1) % n,
                    face: face_index as u32,
                });
                edge_lookup.insert((origin, dest), edge_index);
            }

            let normal = Self::face_normal(&self.vertices, loop_indices);
            face_records.push(Face {
                first_edge: first,
                edge_count: n,
                normal,
            });
        }

        for i in 0..edges.len() {
            if edges[i].twin != u32::MAX {
                continue;
            }
            let origin = edges[i].origin;
            let dest = edges[edges[i].next as usize].origin;
            if let Some(&twin_index) = edge_lookup.get(&(dest, origin)) {
                edges[i].twin = twin_index;
                edges[twin_index as usize].twin = i as u32;
            }
        }

        Hull {
            vertices: self.vertices,
            edges,
            faces: face_records,
        }
    }

    fn face_normal(vertices: &[Vec3], loop_indices: &[u32]) -> Vec3 {
        // Newell's method: robust for non-planar-ish / many-sided faces.
        let mut normal = Vec3::ZERO;
        let n = loop_indices.len();
        for k in 0..n {
            let a = vertices[loop_indices[k] as usize];
            let b = vertices[loop_indices[(k + 1) % n] as usize];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal.normalize_or_zero()
    }
}

impl Default for HullBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an axis-aligned box hull, the common convex approximation used
/// where the old engine exposed a dedicated box collider.
pub fn box_hull(half_extents: Vec3) -> Hull {
    let h = half_extents;
    let vertices = vec![
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ];

    HullBuilder::new()
        .vertices(vertices)
        .face(vec![0, 3, 2, 1]) // -z
        .face(vec![4, 5, 6, 7]) // +z
        .face(vec![0, 1, 5, 4]) // -y
        .face(vec![3, 7, 6, 2]) // +y
        .face(vec![0, 4, 7, 3]) // -x
        .face(vec![1, 2, 6, 5]) // +x
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_hull_has_euler_consistent_topology() {
        let hull = box_hull(Vec3::splat(0.5));
        assert_eq!(hull.vertices.len(), 8);
        assert_eq!(hull.faces.len(), 6);
        assert_eq!(hull.edges.len(), 24);
        assert!(hull.edges.iter().all(|e| e.twin != u32::MAX));
        // Euler's formula: V - E + F = 2 (E counted as undirected edges).
        let undirected_edges = hull.edges.len() / 2;
        assert_eq!(hull.vertices.len() as i32 - undirected_edges as i32 + hull.faces.len() as i32, 2);
    }

    #[test]
    fn box_hull_face_normals_point_outward() {
        let hull = box_hull(Vec3::splat(0.5));
        for face in &hull.faces {
            let verts = hull.face_vertices(hull.faces.iter().position(|f| std::ptr::eq(f, face)).unwrap() as u32);
            let centroid: Vec3 = verts.iter().copied().sum::<Vec3>() / verts.len() as f32;
            assert!(face.normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn support_local_returns_extreme_vertex() {
        let hull = box_hull(Vec3::splat(0.5));
        let (_, p) = hull.support_local(Vec3::X);
        assert!((p.x - 0.5).abs() < 1e-5);
    }
}
