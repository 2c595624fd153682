//! Narrow-phase collision queries.
//!
//! Sphere/capsule pairs are resolved analytically (closest point between a
//! point, segment, or pair of segments). Anything touching a convex hull
//! goes through GJK: the Minkowski-difference support function plus
//! Johnson's sub-simplex algorithm to find the closest points between the
//! two shapes. Hull-hull pairs are handled separately by
//! [`crate::collision::sat`]; `TriMesh` never participates here (broad-phase
//! and raycasts only).

use glam::Vec3;

use crate::core::{
    collider::{Collider, ColliderShape},
    rigidbody::RigidBody,
    types::{MaterialPairProperties, Transform},
};
use crate::dynamics::solver::Contact;
use crate::utils::allocator::EntityId;

const GJK_MAX_ITERATIONS: usize = 128;
const GJK_EPSILON: f32 = 1e-5;

/// Closest point on segment `ab` to `p`, returned with its parameter `t` in `[0, 1]`.
fn closest_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let denom = ab.length_squared();
    if denom < 1e-12 {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / denom).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Closest points between two segments, used for capsule-capsule distance.
fn closest_segment_segment(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a < 1e-12 && e < 1e-12 {
        return (p1, p2);
    }
    let (mut s, mut t);
    if a < 1e-12 {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e < 1e-12 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            s = if denom.abs() > 1e-12 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
        }
    }
    (p1 + d1 * s, p2 + d2 * t)
}

fn capsule_segment_world(shape: &ColliderShape, transform: &Transform) -> (Vec3, Vec3) {
    let ColliderShape::Capsule { half_height, .. } = shape else {
        unreachable!("capsule_segment_world called on non-capsule shape")
    };
    let axis = transform.rotation * Vec3::Y * *half_height;
    (transform.position - axis, transform.position + axis)
}

/// World-space support point of `shape` along `dir`, for the shapes that
/// participate in GJK (spheres, capsules, hulls).
fn support(shape: &ColliderShape, transform: &Transform, dir: Vec3) -> Vec3 {
    match shape {
        ColliderShape::Sphere { radius } => transform.position + dir.normalize_or_zero() * *radius,
        ColliderShape::Capsule { radius, .. } => {
            let (p0, p1) = capsule_segment_world(shape, transform);
            let base = if dir.dot(p1 - p0) >= 0.0 { p1 } else { p0 };
            base + dir.normalize_or_zero() * *radius
        }
        ColliderShape::ConvexHull(hull) => {
            let local_dir = transform.rotation.conjugate() * dir;
            let (_, local_point) = hull.support_local(local_dir);
            transform.position + transform.rotation * local_point
        }
        ColliderShape::TriMesh(_) => transform.position,
    }
}

#[derive(Clone, Copy)]
struct SupportPoint {
    /// Point on the Minkowski difference `support_a(d) - support_b(-d)`.
    p: Vec3,
    a: Vec3,
    b: Vec3,
}

fn minkowski_support(
    shape_a: &ColliderShape,
    ta: &Transform,
    shape_b: &ColliderShape,
    tb: &Transform,
    dir: Vec3,
) -> SupportPoint {
    let a = support(shape_a, ta, dir);
    let b = support(shape_b, tb, -dir);
    SupportPoint { p: a - b, a, b }
}

/// Closest point to the origin on the simplex spanned by `points`, reducing
/// `points` in place to the minimal subset that supports that closest point
/// (Johnson's sub-simplex algorithm). Returns the closest point and its
/// barycentric weights against the (possibly reduced) `points`.
fn closest_to_origin(points: &mut Vec<SupportPoint>) -> (Vec3, Vec<f32>) {
    match points.len() {
        1 => (points[0].p, vec![1.0]),
        2 => {
            let (c, t) = closest_on_segment(Vec3::ZERO, points[0].p, points[1].p);
            if t <= 0.0 {
                points.truncate(1);
                (c, vec![1.0])
            } else if t >= 1.0 {
                points[0] = points[1];
                points.truncate(1);
                (c, vec![1.0])
            } else {
                (c, vec![1.0 - t, t])
            }
        }
        3 => closest_on_triangle(points),
        4 => closest_on_tetrahedron(points),
        _ => unreachable!("GJK simplex never exceeds 4 points"),
    }
}

fn closest_on_triangle(points: &mut Vec<SupportPoint>) -> (Vec3, Vec<f32>) {
    let (a, b, c) = (points[0].p, points[1].p, points[2].p);
    let p = Vec3::ZERO;

    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        points.truncate(1);
        return (a, vec![1.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        points[0] = points[1];
        points.truncate(1);
        return (b, vec![1.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let t = d1 / (d1 - d3);
        points.truncate(2);
        return (a + ab * t, vec![1.0 - t, t]);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        points[0] = points[2];
        points.truncate(1);
        return (c, vec![1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let t = d2 / (d2 - d6);
        points[1] = points[2];
        points.truncate(2);
        return (a + ac * t, vec![1.0 - t, t]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        points[0] = points[1];
        points[1] = points[2];
        points.truncate(2);
        return (b + (c - b) * t, vec![1.0 - t, t]);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, vec![1.0 - v - w, v, w])
}

fn closest_on_tetrahedron(points: &mut Vec<SupportPoint>) -> (Vec3, Vec<f32>) {
    let verts = [points[0].p, points[1].p, points[2].p, points[3].p];
    let faces = [(0usize, 1usize, 2usize), (0, 2, 3), (0, 3, 1), (1, 3, 2)];

    let mut best: Option<(Vec3, Vec<f32>, [usize; 3])> = None;
    let mut best_dist = f32::INFINITY;
    let mut inside = true;

    for &(i0, i1, i2) in &faces {
        let normal = (verts[i1] - verts[i0]).cross(verts[i2] - verts[i0]);
        // Outward-facing normals point away from the tetrahedron's fourth vertex.
        let opposite = (0..4).find(|&k| k != i0 && k != i1 && k != i2).unwrap();
        let outward = if normal.dot(verts[opposite] - verts[i0]) > 0.0 {
            -normal
        } else {
            normal
        };
        if outward.dot(-verts[i0]) < 0.0 {
            // Origin is on the inner side of this face.
            continue;
        }
        inside = false;

        let mut tri = vec![points[i0], points[i1], points[i2]];
        let (c, bary) = closest_to_origin(&mut tri);
        let dist = c.length_squared();
        if dist < best_dist {
            best_dist = dist;
            best = Some((c, bary, [i0, i1, i2]));
        }
    }

    if inside {
        return (Vec3::ZERO, vec![0.25, 0.25, 0.25, 0.25]);
    }

    let (c, bary, idx) = best.expect("tetrahedron has at least one outward face when origin is outside");
    let reduced: Vec<SupportPoint> = idx.iter().take(bary.len()).map(|&i| points[i]).collect();
    *points = reduced;
    (c, bary)
}

struct GjkResult {
    distance: f32,
    point_a: Vec3,
    point_b: Vec3,
    overlapping: bool,
}

fn gjk_distance(
    shape_a: &ColliderShape,
    ta: &Transform,
    shape_b: &ColliderShape,
    tb: &Transform,
) -> GjkResult {
    let mut dir = tb.position - ta.position;
    if dir.length_squared() < 1e-10 {
        dir = Vec3::X;
    }

    let mut simplex = vec![minkowski_support(shape_a, ta, shape_b, tb, dir)];
    let mut closest = simplex[0].p;

    for _ in 0..GJK_MAX_ITERATIONS {
        dir = -closest;
        if dir.length_squared() < GJK_EPSILON * GJK_EPSILON {
            return overlap_result(shape_a, ta, shape_b, tb, &simplex);
        }

        let candidate = minkowski_support(shape_a, ta, shape_b, tb, dir);
        let progress = candidate.p.dot(dir) - closest.dot(dir);
        if progress < GJK_EPSILON {
            break;
        }
        simplex.push(candidate);

        if simplex.len() == 4 {
            let (c, bary) = closest_to_origin(&mut simplex);
            if simplex.len() == 4 && bary.len() == 4 {
                return overlap_result(shape_a, ta, shape_b, tb, &simplex);
            }
            closest = c;
            let (pa, pb) = reconstruct(&simplex, &bary);
            if closest.length() < GJK_EPSILON {
                return GjkResult {
                    distance: 0.0,
                    point_a: pa,
                    point_b: pb,
                    overlapping: true,
                };
            }
        } else {
            let (c, bary) = closest_to_origin(&mut simplex);
            closest = c;
            let _ = bary;
        }
    }

    // Iteration budget exhausted without converging or finding a separating
    // direction. Rather than report the (possibly large, unconverged)
    // `closest.length()` as a real separation, treat this as contact at zero
    // distance: the deep-penetration case the budget is meant to catch
    // conservatively, never a false separation.
    let (_, bary) = closest_to_origin(&mut simplex.clone());
    let (point_a, point_b) = reconstruct(&simplex, &bary);
    GjkResult {
        distance: 0.0,
        point_a,
        point_b,
        overlapping: true,
    }
}

fn reconstruct(simplex: &[SupportPoint], bary: &[f32]) -> (Vec3, Vec3) {
    let mut a = Vec3::ZERO;
    let mut b = Vec3::ZERO;
    for (sp, &w) in simplex.iter().zip(bary) {
        a += sp.a * w;
        b += sp.b * w;
    }
    (a, b)
}

fn overlap_result(
    shape_a: &ColliderShape,
    ta: &Transform,
    shape_b: &ColliderShape,
    tb: &Transform,
    simplex: &[SupportPoint],
) -> GjkResult {
    let center = simplex.iter().fold(Vec3::ZERO, |acc, sp| acc + sp.p) / simplex.len() as f32;
    let _ = (shape_a, ta, shape_b, tb);
    GjkResult {
        distance: 0.0,
        point_a: center,
        point_b: center,
        overlapping: true,
    }
}

/// Analytic + GJK narrow-phase dispatcher.
pub struct NarrowPhase;

impl NarrowPhase {
    pub fn collide(
        collider_a: &Collider,
        body_a: &RigidBody,
        collider_b: &Collider,
        body_b: &RigidBody,
    ) -> Option<Contact> {
        let ta = collider_a.world_transform(&body_a.transform);
        let tb = collider_b.world_transform(&body_b.transform);

        let contact = match (&collider_a.shape, &collider_b.shape) {
            (ColliderShape::TriMesh(_), _) | (_, ColliderShape::TriMesh(_)) => None,
            (ColliderShape::ConvexHull(_), ColliderShape::ConvexHull(_)) => {
                crate::collision::sat::hull_hull_contact(
                    &collider_a.shape,
                    &ta,
                    &collider_b.shape,
                    &tb,
                    body_a.id,
                    body_b.id,
                )
            }
            (ColliderShape::Sphere { radius: ra }, ColliderShape::Sphere { radius: rb }) => {
                sphere_sphere(ta.position, *ra, tb.position, *rb, body_a.id, body_b.id)
            }
            (ColliderShape::Sphere { radius }, ColliderShape::Capsule { radius: cr, .. }) => {
                let (p0, p1) = capsule_segment_world(&collider_b.shape, &tb);
                let (closest, _) = closest_on_segment(ta.position, p0, p1);
                sphere_sphere(ta.position, *radius, closest, *cr, body_a.id, body_b.id)
            }
            (ColliderShape::Capsule { radius: cr, .. }, ColliderShape::Sphere { radius }) => {
                let (p0, p1) = capsule_segment_world(&collider_a.shape, &ta);
                let (closest, _) = closest_on_segment(tb.position, p0, p1);
                sphere_sphere(closest, *cr, tb.position, *radius, body_a.id, body_b.id)
            }
            (ColliderShape::Capsule { radius: ra, .. }, ColliderShape::Capsule { radius: rb, .. }) => {
                let (a0, a1) = capsule_segment_world(&collider_a.shape, &ta);
                let (b0, b1) = capsule_segment_world(&collider_b.shape, &tb);
                let (pa, pb) = closest_segment_segment(a0, a1, b0, b1);
                sphere_sphere(pa, *ra, pb, *rb, body_a.id, body_b.id)
            }
            (ColliderShape::Sphere { radius }, ColliderShape::ConvexHull(_)) => {
                hull_sphere(&collider_b.shape, &tb, ta.position, *radius, body_b.id, body_a.id)
                    .map(flip_contact)
            }
            (ColliderShape::ConvexHull(_), ColliderShape::Sphere { radius }) => {
                hull_sphere(&collider_a.shape, &ta, tb.position, *radius, body_a.id, body_b.id)
            }
            (ColliderShape::Capsule { .. }, ColliderShape::ConvexHull(_)) => {
                hull_capsule(&collider_b.shape, &tb, &collider_a.shape, &ta, body_b.id, body_a.id)
                    .map(flip_contact)
            }
            (ColliderShape::ConvexHull(_), ColliderShape::Capsule { .. }) => {
                hull_capsule(&collider_a.shape, &ta, &collider_b.shape, &tb, body_a.id, body_b.id)
            }
        };

        let mut contact = contact?;
        contact.material = MaterialPairProperties::from_materials(&body_a.material, &body_b.material);
        Some(contact)
    }

    /// Like [`Self::collide`] but returns the full contact manifold rather
    /// than a single representative point: hull-hull pairs go through
    /// [`crate::collision::sat::hull_hull_manifold`] (up to four clipped
    /// points), every other shape pair still produces at most one point.
    pub fn collide_manifold(
        collider_a: &Collider,
        body_a: &RigidBody,
        collider_b: &Collider,
        body_b: &RigidBody,
    ) -> Vec<Contact> {
        let material = MaterialPairProperties::from_materials(&body_a.material, &body_b.material);

        if let (ColliderShape::ConvexHull(_), ColliderShape::ConvexHull(_)) =
            (&collider_a.shape, &collider_b.shape)
        {
            let ta = collider_a.world_transform(&body_a.transform);
            let tb = collider_b.world_transform(&body_b.transform);
            let mut points = crate::collision::sat::hull_hull_manifold(
                &collider_a.shape,
                &ta,
                &collider_b.shape,
                &tb,
                body_a.id,
                body_b.id,
            );
            for p in &mut points {
                p.material = material;
            }
            return points;
        }

        Self::collide(collider_a, body_a, collider_b, body_b)
            .into_iter()
            .collect()
    }
}

fn flip_contact(mut c: Contact) -> Contact {
    std::mem::swap(&mut c.body_a, &mut c.body_b);
    c.normal = -c.normal;
    c
}

fn sphere_sphere(ca: Vec3, ra: f32, cb: Vec3, rb: f32, body_a: EntityId, body_b: EntityId) -> Option<Contact> {
    let delta = cb - ca;
    let dist = delta.length();
    let depth = ra + rb - dist;
    if depth <= 0.0 {
        return None;
    }
    let normal = if dist > 1e-6 { delta / dist } else { Vec3::Y };
    let point = ca + normal * ra;
    Some(Contact::new(body_a, body_b, point, normal, depth, 0, MaterialPairProperties::default()))
}

/// Hull-sphere contact via GJK (sphere degenerates to a single support point).
fn hull_sphere(
    hull_shape: &ColliderShape,
    hull_transform: &Transform,
    sphere_center: Vec3,
    radius: f32,
    hull_body: EntityId,
    sphere_body: EntityId,
) -> Option<Contact> {
    let sphere_shape = ColliderShape::Sphere { radius: 0.0 };
    let sphere_transform = Transform::from_position(sphere_center);
    let result = gjk_distance(hull_shape, hull_transform, &sphere_shape, &sphere_transform);

    if result.overlapping {
        // Deep penetration: fall back to the mini-SAT axis against the
        // hull's faces, treating the sphere center as a point.
        return mini_sat_point(hull_shape, hull_transform, sphere_center, radius, hull_body, sphere_body);
    }

    let depth = radius - result.distance;
    if depth <= 0.0 {
        return None;
    }
    let normal = (sphere_center - result.point_a).normalize_or_zero();
    let normal = if normal == Vec3::ZERO { Vec3::Y } else { normal };
    Some(Contact::new(
        hull_body,
        sphere_body,
        result.point_a,
        normal,
        depth,
        0,
        MaterialPairProperties::default(),
    ))
}

/// Hull-capsule contact: GJK against the capsule's core segment for the
/// shallow case, mini-SAT fallback for deep penetration.
fn hull_capsule(
    hull_shape: &ColliderShape,
    hull_transform: &Transform,
    capsule_shape: &ColliderShape,
    capsule_transform: &Transform,
    hull_body: EntityId,
    capsule_body: EntityId,
) -> Option<Contact> {
    let ColliderShape::Capsule { radius, .. } = capsule_shape else {
        unreachable!("hull_capsule called with non-capsule shape")
    };
    let (p0, p1) = capsule_segment_world(capsule_shape, capsule_transform);

    let seg_shape_a = ColliderShape::Sphere { radius: 0.0 };
    let seg_transform_a = Transform::from_position(p0);
    let result_a = gjk_distance(hull_shape, hull_transform, &seg_shape_a, &seg_transform_a);
    let seg_transform_b = Transform::from_position(p1);
    let result_b = gjk_distance(hull_shape, hull_transform, &seg_shape_a, &seg_transform_b);

    let (closest_hull, closest_capsule, dist, overlapping) = if result_a.distance <= result_b.distance {
        (result_a.point_a, result_a.point_b, result_a.distance, result_a.overlapping)
    } else {
        (result_b.point_a, result_b.point_b, result_b.distance, result_b.overlapping)
    };

    let closest_on_axis = closest_on_segment(closest_hull, p0, p1).0;
    let final_result = gjk_distance(
        hull_shape,
        hull_transform,
        &seg_shape_a,
        &Transform::from_position(closest_on_axis),
    );

    if overlapping || final_result.overlapping {
        return mini_sat_segment(hull_shape, hull_transform, p0, p1, *radius, hull_body, capsule_body);
    }

    let depth = radius - final_result.distance;
    let _ = (closest_capsule, dist);
    if depth <= 0.0 {
        return None;
    }
    let normal = (closest_on_axis - final_result.point_a).normalize_or_zero();
    let normal = if normal == Vec3::ZERO { Vec3::Y } else { normal };
    Some(Contact::new(
        hull_body,
        capsule_body,
        final_result.point_a,
        normal,
        depth,
        0,
        MaterialPairProperties::default(),
    ))
}

/// Deep-penetration fallback for a hull against a single point (sphere
/// center): tests every hull face normal as a separating axis and keeps the
/// axis of least penetration (a point degenerates the usual mini-SAT edge
/// tests, since a point has no edges of its own).
fn mini_sat_point(
    hull_shape: &ColliderShape,
    hull_transform: &Transform,
    point: Vec3,
    radius: f32,
    hull_body: EntityId,
    other_body: EntityId,
) -> Option<Contact> {
    let ColliderShape::ConvexHull(hull) = hull_shape else {
        return None;
    };
    let local_point = hull_transform.rotation.conjugate() * (point - hull_transform.position);

    let mut best_depth = f32::NEG_INFINITY;
    let mut best_normal = Vec3::Y;
    for face in &hull.faces {
        let support_dist = hull.vertices[hull.edges[face.first_edge as usize].origin as usize].dot(face.normal);
        let point_dist = local_point.dot(face.normal);
        let separation = point_dist - support_dist - radius;
        if separation > 0.0 {
            return None;
        }
        if separation > best_depth {
            best_depth = separation;
            best_normal = face.normal;
        }
    }

    let depth = -best_depth;
    if depth <= 0.0 {
        return None;
    }
    let world_normal = (hull_transform.rotation * best_normal).normalize_or_zero();
    let contact_point = point - world_normal * radius;
    Some(Contact::new(hull_body, other_body, contact_point, world_normal, depth, 0, MaterialPairProperties::default()))
}

/// Deep-penetration fallback for a hull against a capsule's core segment:
/// tests hull face normals, keeping the axis with the least penetration of
/// the segment's nearest endpoint.
fn mini_sat_segment(
    hull_shape: &ColliderShape,
    hull_transform: &Transform,
    p0: Vec3,
    p1: Vec3,
    radius: f32,
    hull_body: EntityId,
    other_body: EntityId,
) -> Option<Contact> {
    let ColliderShape::ConvexHull(hull) = hull_shape else {
        return None;
    };
    let local_p0 = hull_transform.rotation.conjugate() * (p0 - hull_transform.position);
    let local_p1 = hull_transform.rotation.conjugate() * (p1 - hull_transform.position);

    let mut best_depth = f32::NEG_INFINITY;
    let mut best_normal = Vec3::Y;
    for face in &hull.faces {
        let support_dist = hull.vertices[hull.edges[face.first_edge as usize].origin as usize].dot(face.normal);
        let d0 = local_p0.dot(face.normal) - support_dist;
        let d1 = local_p1.dot(face.normal) - support_dist;
        let separation = d0.min(d1) - radius;
        if separation > 0.0 {
            return None;
        }
        if separation > best_depth {
            best_depth = separation;
            best_normal = face.normal;
        }
    }

    let depth = -best_depth;
    if depth <= 0.0 {
        return None;
    }
    let world_normal = (hull_transform.rotation * best_normal).normalize_or_zero();
    let deepest_point = if local_p0.dot(best_normal) < local_p1.dot(best_normal) {
        p0
    } else {
        p1
    };
    let contact_point = deepest_point - world_normal * radius;
    Some(Contact::new(hull_body, other_body, contact_point, world_normal, depth, 0, MaterialPairProperties::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{collider::CollisionFilter, hull::box_hull};

    fn sphere_collider(id: u32, rigidbody_id: u32, radius: f32) -> Collider {
        Collider {
            id: EntityId::from_index(id),
            rigidbody_id: EntityId::from_index(rigidbody_id),
            shape: ColliderShape::Sphere { radius },
            offset: Transform::default(),
            is_trigger: false,
            collision_filter: CollisionFilter::default(),
        }
    }

    fn body_at(id: u32, position: Vec3) -> RigidBody {
        let mut body = RigidBody::new(EntityId::from_index(id));
        body.transform.position = position;
        body
    }

    #[test]
    fn overlapping_spheres_produce_contact_with_expected_depth() {
        let body_a = body_at(0, Vec3::ZERO);
        let collider_a = sphere_collider(100, 0, 1.0);
        let body_b = body_at(1, Vec3::new(1.5, 0.0, 0.0));
        let collider_b = sphere_collider(101, 1, 1.0);

        let contact = NarrowPhase::collide(&collider_a, &body_a, &collider_b, &body_b).unwrap();
        assert!((contact.depth - 0.5).abs() < 1e-4);
        assert!(contact.normal.x > 0.9);
    }

    #[test]
    fn separated_spheres_have_no_contact() {
        let body_a = body_at(0, Vec3::ZERO);
        let collider_a = sphere_collider(100, 0, 1.0);
        let body_b = body_at(1, Vec3::new(5.0, 0.0, 0.0));
        let collider_b = sphere_collider(101, 1, 1.0);

        assert!(NarrowPhase::collide(&collider_a, &body_a, &collider_b, &body_b).is_none());
    }

    #[test]
    fn sphere_resting_on_box_hull_produces_upward_normal() {
        let mut body_a = body_at(0, Vec3::ZERO);
        body_a.transform.position = Vec3::ZERO;
        let collider_a = Collider {
            id: EntityId::from_index(100),
            rigidbody_id: EntityId::from_index(0),
            shape: ColliderShape::ConvexHull(box_hull(Vec3::splat(1.0))),
            offset: Transform::default(),
            is_trigger: false,
            collision_filter: CollisionFilter::default(),
        };
        let body_b = body_at(1, Vec3::new(0.0, 1.9, 0.0));
        let collider_b = sphere_collider(101, 1, 0.2);

        let contact = NarrowPhase::collide(&collider_a, &body_a, &collider_b, &body_b).unwrap();
        assert!(contact.normal.y > 0.9, "normal was {:?}", contact.normal);
        assert!(contact.depth > 0.0 && contact.depth < 0.2);
    }
}
