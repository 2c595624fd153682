use glam::Vec3;

use crate::core::{
    collider::{CollisionFilter, ColliderShape},
    types::Material,
};

/// Local-space support and bounding queries shared by GJK and the broad-phase.
pub struct ShapeUtil;

impl ShapeUtil {
    /// Support point of `shape` in local space along local-space `direction`.
    /// `TriMesh` is excluded: it never participates in narrow-phase queries.
    pub fn support(shape: &ColliderShape, direction: Vec3) -> Vec3 {
        match shape {
            ColliderShape::Sphere { radius } => direction.normalize_or_zero() * *radius,
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let mut point = direction.normalize_or_zero() * *radius;
                point.y += half_height * direction.y.signum();
                point
            }
            ColliderShape::ConvexHull(hull) => hull.support_local(direction).1,
            ColliderShape::TriMesh(_) => Vec3::ZERO,
        }
    }

    pub fn bounding_radius(shape: &ColliderShape) -> f32 {
        match shape {
            ColliderShape::Sphere { radius } => *radius,
            ColliderShape::Capsule {
                radius,
                half_height,
            } => (*radius * *radius + half_height * half_height).sqrt(),
            ColliderShape::ConvexHull(hull) => {
                hull.vertices.iter().map(|v| v.length()).fold(0.0, f32::max)
            }
            ColliderShape::TriMesh(mesh) => mesh.bounding_radius(),
        }
    }
}

/// Identifies a registered [`ShapePrefab`] in a [`ShapeDatabase`].
pub type PrefabId = u32;

/// A reusable template a body is stamped out from: shape plus the material
/// and mass the source's shape database keys collider bodies off of rather
/// than storing the geometry inline per body.
#[derive(Debug, Clone)]
pub struct ShapePrefab {
    pub shape: ColliderShape,
    pub material: Material,
    /// Mass in kilograms; `0.0` marks the prefab static.
    pub mass: f32,
    pub is_trigger: bool,
    pub collision_filter: CollisionFilter,
}

impl ShapePrefab {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            material: Material::default(),
            mass: 1.0,
            is_trigger: false,
            collision_filter: CollisionFilter::default(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}

/// Registry of shape prefabs, indexed by a stable [`PrefabId`]. Looked up
/// once per [`crate::world::Pipeline::body_alloc`] call; never mutated
/// concurrently with a tick.
#[derive(Debug, Default)]
pub struct ShapeDatabase {
    prefabs: Vec<ShapePrefab>,
}

impl ShapeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prefab: ShapePrefab) -> PrefabId {
        let id = self.prefabs.len() as u32;
        self.prefabs.push(prefab);
        id
    }

    pub fn get(&self, id: PrefabId) -> Option<&ShapePrefab> {
        self.prefabs.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_prefab_round_trips_by_id() {
        let mut db = ShapeDatabase::new();
        let id = db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
        assert!(db.get(id).is_some());
        assert!(db.get(id + 1).is_none());
    }
}
