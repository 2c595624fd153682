use super::hull::Hull;
use super::mesh::TriangleMesh;
use super::types::Transform;
use crate::utils::allocator::EntityId;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Enumeration of supported collider geometries. Triangle-mesh-vs-triangle-mesh
/// (and any other pair involving `TriMesh`) never produces a narrow-phase
/// contact; meshes still participate in the broad-phase and in raycasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    ConvexHull(Hull),
    TriMesh(TriangleMesh),
}

impl ColliderShape {
    pub fn local_aabb_half_extents(&self) -> Vec3 {
        match self {
            ColliderShape::Sphere { radius } => Vec3::splat(*radius),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => Vec3::new(*radius, half_height + radius, *radius),
            ColliderShape::ConvexHull(hull) => {
                let mut half = Vec3::ZERO;
                for v in &hull.vertices {
                    half = half.max(v.abs());
                }
                half
            }
            ColliderShape::TriMesh(mesh) => mesh.bounds.extent(),
        }
    }
}

/// Simple collision filtering mask.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub layer: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            layer: 1,
            mask: u32::MAX,
        }
    }
}

/// Collider component referencing a rigid body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collider {
    pub id: EntityId,
    pub rigidbody_id: EntityId,
    pub shape: ColliderShape,
    pub offset: Transform,
    pub is_trigger: bool,
    pub collision_filter: CollisionFilter,
}

impl Collider {
    pub fn sphere(radius: f32) -> ColliderShape {
        ColliderShape::Sphere { radius }
    }

    pub fn capsule(radius: f32, half_height: f32) -> ColliderShape {
        ColliderShape::Capsule {
            radius,
            half_height,
        }
    }

    pub fn convex_hull(hull: Hull) -> ColliderShape {
        ColliderShape::ConvexHull(hull)
    }

    pub fn world_transform(&self, rigidbody_transform: &Transform) -> Transform {
        rigidbody_transform.combine(&self.offset)
    }
}

/// Convenience constructors for transforms.
impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::default()
        }
    }
}
