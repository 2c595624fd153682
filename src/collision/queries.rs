//! Spatial queries (currently: raycasts) against the live broad-phase.
//!
//! A ray first walks the DBVH in nearest-AABB-first order (see
//! [`crate::collision::broadphase::Dbvh::raycast`]); each candidate body is
//! then tested exactly against its collider's shape. Because the DBVH visits
//! proxies in increasing order of AABB entry distance, the first exact hit
//! found while `closest_only` is set is the closest one, and traversal can
//! stop the moment a candidate's own AABB entry distance exceeds it.

use glam::Vec3;

use crate::{
    collision::broadphase::Dbvh,
    core::{
        collider::{Collider, ColliderShape},
        soa::BodiesSoA,
        types::Transform,
    },
    utils::allocator::{Arena, EntityId},
};

/// Result of a ray cast against a collider.
#[derive(Debug, Clone)]
pub struct RaycastHit {
    pub body_id: EntityId,
    pub collider_id: EntityId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct RaycastQuery {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
    pub layer_mask: u32,
    pub query_layer: u32,
    pub ignore_triggers: bool,
    pub closest_only: bool,
}

impl Default for RaycastQuery {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            max_distance: f32::INFINITY,
            layer_mask: u32::MAX,
            query_layer: 1,
            ignore_triggers: false,
            closest_only: true,
        }
    }
}

impl RaycastQuery {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction,
            max_distance,
            query_layer: 1,
            ..Self::default()
        }
    }
}

pub struct Raycast;

impl Raycast {
    /// Casts `query` against every body with a broad-phase proxy, in
    /// ascending-distance order. Bodies without a valid collider or whose
    /// proxy has gone stale (e.g. tagged for removal this tick) are skipped.
    pub fn cast(
        query: &RaycastQuery,
        dbvh: &Dbvh,
        colliders: &Arena<Collider>,
        bodies: &BodiesSoA,
    ) -> Vec<RaycastHit> {
        Self::cast_with_filter(query, dbvh, colliders, bodies, |_, _| true)
    }

    pub fn cast_with_filter<F>(
        query: &RaycastQuery,
        dbvh: &Dbvh,
        colliders: &Arena<Collider>,
        bodies: &BodiesSoA,
        mut filter: F,
    ) -> Vec<RaycastHit>
    where
        F: FnMut(EntityId, &Collider) -> bool,
    {
        let dir = query.direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return Vec::new();
        }

        let mut hits = Vec::new();
        let mut closest_distance = query.max_distance;

        dbvh.raycast(query.origin, dir, query.max_distance, |body_id, aabb_t| {
            if query.closest_only && aabb_t > closest_distance {
                return false;
            }

            let Some(body) = bodies.get(body_id) else {
                return true;
            };
            let collider_id = body.collider();
            let Some(collider) = colliders.get(collider_id) else {
                return true;
            };

            if query.ignore_triggers && collider.is_trigger {
                return true;
            }
            if collider.collision_filter.layer & query.layer_mask == 0 {
                return true;
            }
            if collider.collision_filter.mask & query.query_layer == 0 {
                return true;
            }
            if !filter(collider_id, collider) {
                return true;
            }

            let world_transform = collider.world_transform(body.transform());
            if let Some(hit) = Self::ray_shape_test(
                query,
                dir,
                &collider.shape,
                &world_transform,
                collider_id,
                body_id,
            ) {
                if hit.distance < closest_distance {
                    closest_distance = hit.distance;
                }
                hits.push(hit);
            }
            true
        });

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        if query.closest_only {
            hits.into_iter().take(1).collect()
        } else {
            hits
        }
    }

    fn ray_shape_test(
        query: &RaycastQuery,
        dir: Vec3,
        shape: &ColliderShape,
        transform: &Transform,
        collider_id: EntityId,
        body_id: EntityId,
    ) -> Option<RaycastHit> {
        match shape {
            ColliderShape::Sphere { radius } => {
                Self::ray_sphere(query.origin, dir, query.max_distance, transform.position, *radius)
                    .map(|(point, distance)| RaycastHit {
                        body_id,
                        collider_id,
                        point,
                        normal: (point - transform.position).normalize_or_zero(),
                        distance,
                    })
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } => Self::ray_capsule(query.origin, dir, query.max_distance, transform, *radius, *half_height)
                .map(|(point, distance, normal)| RaycastHit {
                    body_id,
                    collider_id,
                    point,
                    normal,
                    distance,
                }),
            ColliderShape::ConvexHull(hull) => {
                Self::ray_hull(query.origin, dir, query.max_distance, transform, hull).map(
                    |(point, distance, normal)| RaycastHit {
                        body_id,
                        collider_id,
                        point,
                        normal,
                        distance,
                    },
                )
            }
            ColliderShape::TriMesh(mesh) => {
                let local_origin = transform.rotation.conjugate() * (query.origin - transform.position);
                let local_dir = transform.rotation.conjugate() * dir;
                mesh.raycast_local(local_origin, local_dir, query.max_distance)
                    .map(|(distance, local_normal)| RaycastHit {
                        body_id,
                        collider_id,
                        point: query.origin + dir * distance,
                        normal: transform.rotation * local_normal,
                        distance,
                    })
            }
        }
    }

    fn ray_sphere(origin: Vec3, dir: Vec3, max_distance: f32, center: Vec3, radius: f32) -> Option<(Vec3, f32)> {
        let oc = origin - center;
        let a = dir.length_squared();
        let b = 2.0 * oc.dot(dir);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_disc = discriminant.sqrt();
        let t = (-b - sqrt_disc) / (2.0 * a);
        if t < 0.0 || t > max_distance {
            return None;
        }
        Some((origin + dir * t, t))
    }

    /// Ray against a capsule: cylindrical side plus two end caps, the same
    /// decomposition a ray-capsule test always reduces to.
    fn ray_capsule(
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        transform: &Transform,
        radius: f32,
        half_height: f32,
    ) -> Option<(Vec3, f32, Vec3)> {
        let local_origin = transform.rotation.conjugate() * (origin - transform.position);
        let local_dir = transform.rotation.conjugate() * dir;

        let mut best: Option<(Vec3, f32, Vec3)> = None;

        let a = local_dir.x * local_dir.x + local_dir.z * local_dir.z;
        if a.abs() > 1e-6 {
            let b = 2.0 * (local_origin.x * local_dir.x + local_origin.z * local_dir.z);
            let c = local_origin.x * local_origin.x + local_origin.z * local_origin.z - radius * radius;
            let disc = b * b - 4.0 * a * c;
            if disc >= 0.0 {
                let sqrt_disc = disc.sqrt();
                for t in [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)] {
                    if !(0.0..=max_distance).contains(&t) {
                        continue;
                    }
                    let local_point = local_origin + local_dir * t;
                    if local_point.y.abs() <= half_height {
                        let local_normal =
                            Vec3::new(local_point.x, 0.0, local_point.z).normalize_or_zero();
                        let world_point = origin + dir * t;
                        let world_normal = transform.rotation * local_normal;
                        best = Self::closer(best, Some((world_point, t, world_normal)));
                        break;
                    }
                }
            }
        }

        for sign in [-1.0f32, 1.0] {
            let cap_center = transform.position + (transform.rotation * Vec3::Y) * (sign * half_height);
            if let Some((point, t)) = Self::ray_sphere(origin, dir, max_distance, cap_center, radius) {
                let normal = (point - cap_center).normalize_or_zero();
                best = Self::closer(best, Some((point, t, normal)));
            }
        }

        best
    }

    /// Slab test generalized from axis-aligned planes to a convex hull's
    /// own face planes: narrows `[t_min, t_max]` against each face, exactly
    /// as `Aabb::raycast` narrows it against the 6 axis-aligned ones.
    fn ray_hull(
        origin: Vec3,
        dir: Vec3,
        max_distance: f32,
        transform: &Transform,
        hull: &crate::core::hull::Hull,
    ) -> Option<(Vec3, f32, Vec3)> {
        let local_origin = transform.rotation.conjugate() * (origin - transform.position);
        let local_dir = transform.rotation.conjugate() * dir;

        let mut t_min = 0.0f32;
        let mut t_max = max_distance;
        let mut local_normal = Vec3::ZERO;

        for face in &hull.faces {
            let plane_point = hull.vertices[hull.edges[face.first_edge as usize].origin as usize];
            let denom = face.normal.dot(local_dir);
            let dist_to_plane = face.normal.dot(plane_point - local_origin);

            if denom.abs() < 1e-8 {
                if dist_to_plane < 0.0 {
                    return None;
                }
                continue;
            }

            let t = dist_to_plane / denom;
            if denom < 0.0 {
                if t > t_min {
                    t_min = t;
                    local_normal = face.normal;
                }
            } else if t < t_max {
                t_max = t;
            }

            if t_min > t_max {
                return None;
            }
        }

        if local_normal == Vec3::ZERO {
            return None;
        }

        let world_point = origin + dir * t_min;
        let world_normal = transform.rotation * local_normal;
        Some((world_point, t_min, world_normal))
    }

    fn closer(
        current: Option<(Vec3, f32, Vec3)>,
        candidate: Option<(Vec3, f32, Vec3)>,
    ) -> Option<(Vec3, f32, Vec3)> {
        match (current, candidate) {
            (None, None) => None,
            (Some(hit), None) => Some(hit),
            (None, Some(hit)) => Some(hit),
            (Some(a), Some(b)) => {
                if a.1 <= b.1 {
                    Some(a)
                } else {
                    Some(b)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collider::CollisionFilter;
    use crate::core::rigidbody::RigidBodyBuilder;
    use crate::utils::allocator::GenerationalId;

    fn eid(i: usize) -> EntityId {
        EntityId(GenerationalId::new(i, 0))
    }

    #[test]
    fn ray_hits_sphere_through_dbvh() {
        let mut dbvh = Dbvh::new();
        let mut colliders: Arena<Collider> = Arena::new();
        let mut bodies = BodiesSoA::new();

        let body_id = bodies.insert(RigidBodyBuilder::new().build());
        let collider_id = colliders.insert(Collider {
            id: eid(0),
            rigidbody_id: body_id,
            shape: ColliderShape::Sphere { radius: 1.0 },
            offset: Transform::default(),
            is_trigger: false,
            collision_filter: CollisionFilter::default(),
        });
        *bodies.get_mut(body_id).unwrap().collider = collider_id;
        dbvh.insert(
            body_id,
            crate::core::mesh::Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
        );

        let query = RaycastQuery::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X, 20.0);
        let hits = Raycast::cast(&query, &dbvh, &colliders, &bodies);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 4.0).abs() < 1e-3);
    }
}
