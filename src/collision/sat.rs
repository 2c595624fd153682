//! Hull-hull separating axis test.
//!
//! Face queries test each hull's face normals as candidate separating axes
//! (`fv_separation`); the edge query tests every edge pair whose Gauss-map
//! arcs cross (`ee_separation`, the Minkowski-face test from Dirk
//! Gregorius's GDC talk). The deepest non-penetrating axis across both wins;
//! face contacts are built by clipping the incident face against the
//! reference face's side planes (Sutherland-Hodgman), edge contacts by the
//! closest points between the two separating edges.

use glam::Vec3;

use crate::collision::clipping::{clip_polygon, Plane};
use crate::core::{collider::ColliderShape, hull::Hull, types::{MaterialPairProperties, Transform}};
use crate::dynamics::solver::Contact;
use crate::utils::allocator::EntityId;

struct FaceQuery {
    face: u32,
    normal: Vec3,
    depth: f32,
}

struct EdgeQuery {
    edge_a: u32,
    edge_b: u32,
    normal: Vec3,
    depth: f32,
}

/// Relative bias favoring face contact over edge contact (spec.md §4.2):
/// edge contact only wins when its separation clears the face separation by
/// more than float-epsilon slop, scaled to the contact's own magnitude
/// rather than a fixed absolute threshold. Matches
/// `(1.0f - 100.0f * F32_EPSILON) * f_query[...].depth >= e_query.depth`.
const RELATIVE_FACE_BIAS: f32 = 1.0 - 100.0 * f32::EPSILON;

fn world_vertices(hull: &Hull, transform: &Transform) -> Vec<Vec3> {
    hull.vertices
        .iter()
        .map(|&v| transform.position + transform.rotation * v)
        .collect()
}

/// Face-vertex separating axis test: every face normal of `hull_a` against
/// every vertex of `hull_b`. Returns `None` if a separating axis is found
/// (no collision), else the axis of least (most negative) penetration.
fn fv_separation(hull_a: &Hull, verts_a: &[Vec3], verts_b: &[Vec3]) -> Option<FaceQuery> {
    let mut best: Option<FaceQuery> = None;
    for (fi, face) in hull_a.faces.iter().enumerate() {
        let normal = face.normal;
        let support_vertex = hull_a.edges[face.first_edge as usize].origin as usize;
        let plane_point = verts_a[support_vertex];

        let min_dist = verts_b
            .iter()
            .map(|v| (*v - plane_point).dot(normal))
            .fold(f32::INFINITY, f32::min);

        if min_dist > 0.0 {
            return None;
        }
        if best.as_ref().map(|b| min_dist > b.depth).unwrap_or(true) {
            best = Some(FaceQuery {
                face: fi as u32,
                normal,
                depth: min_dist,
            });
        }
    }
    best
}

fn is_minkowski_face(n1_1: Vec3, n1_2: Vec3, n2_1: Vec3, n2_2: Vec3, arc1: Vec3, arc2: Vec3) -> bool {
    let n1_1d = n1_1.dot(arc2);
    let n1_2d = n1_2.dot(arc2);
    let n2_1d = n2_1.dot(arc1);
    let n2_2d = n2_2.dot(arc1);
    n1_1d * n1_2d < 0.0 && n2_1d * n2_2d < 0.0 && n1_1d * n2_1d < 0.0
}

/// Edge-edge separating axis test via Gauss-map arc crossing. Returns `None`
/// on a separating axis.
fn ee_separation(
    hull_a: &Hull,
    verts_a: &[Vec3],
    rot_a: glam::Quat,
    center_a: Vec3,
    hull_b: &Hull,
    verts_b: &[Vec3],
    rot_b: glam::Quat,
) -> Option<EdgeQuery> {
    let mut best: Option<EdgeQuery> = None;

    for edge_a in hull_a.unique_edges() {
        let twin_a = hull_a.edges[edge_a as usize].twin;
        let (face_a1, face_a2) = hull_a.edge_adjacent_faces(edge_a);
        let n1_1 = rot_a * hull_a.faces[face_a1 as usize].normal;
        let n1_2 = rot_a * hull_a.faces[face_a2 as usize].normal;
        let (a0, a1) = hull_a.edge_endpoints(edge_a);
        let world_a0 = verts_a[hull_a.edges[edge_a as usize].origin as usize];
        let world_a1 = verts_a[hull_a.edges[twin_a as usize].origin as usize];
        let edge_dir_a = world_a1 - world_a0;
        let _ = (a0, a1);

        for edge_b in hull_b.unique_edges() {
            let twin_b = hull_b.edges[edge_b as usize].twin;
            let (face_b1, face_b2) = hull_b.edge_adjacent_faces(edge_b);
            // Minkowski difference A - B uses the Gauss map of -B.
            let n2_1 = -(rot_b * hull_b.faces[face_b1 as usize].normal);
            let n2_2 = -(rot_b * hull_b.faces[face_b2 as usize].normal);
            let world_b0 = verts_b[hull_b.edges[edge_b as usize].origin as usize];
            let world_b1 = verts_b[hull_b.edges[twin_b as usize].origin as usize];
            let edge_dir_b = world_b1 - world_b0;

            if !is_minkowski_face(n1_1, n1_2, n2_1, n2_2, edge_dir_a, edge_dir_b) {
                continue;
            }

            let d1d1 = edge_dir_a.dot(edge_dir_a);
            let d2d2 = edge_dir_b.dot(edge_dir_b);
            let d1d2 = edge_dir_a.dot(edge_dir_b);
            if d1d1 * d2d2 - d1d2 * d1d2 <= 1e-9 {
                continue;
            }

            let mut axis = edge_dir_a.cross(edge_dir_b).normalize_or_zero();
            if axis == Vec3::ZERO {
                continue;
            }
            if axis.dot(world_a0 - center_a) < 0.0 {
                axis = -axis;
            }

            let dist = axis.dot(world_b0 - world_a0);
            if dist > 0.0 {
                return None;
            }
            if best.as_ref().map(|b| dist > b.depth).unwrap_or(true) {
                best = Some(EdgeQuery {
                    edge_a,
                    edge_b,
                    normal: axis,
                    depth: dist,
                });
            }
        }
    }

    best
}

/// Clips the incident face against the reference face's side planes and
/// keeps points that are behind the reference face, tagging each with its
/// penetration depth.
fn clip_face_contact(
    ref_verts: &[Vec3],
    ref_normal: Vec3,
    inc_verts: &[Vec3],
) -> Vec<(Vec3, f32)> {
    let mut planes = Vec::with_capacity(ref_verts.len());
    for i in 0..ref_verts.len() {
        let a = ref_verts[i];
        let b = ref_verts[(i + 1) % ref_verts.len()];
        let side_normal = (b - a).cross(ref_normal).normalize_or_zero();
        planes.push(Plane::from_point_normal(a, side_normal));
    }

    let clipped = clip_polygon(inc_verts, &planes);
    let plane_point = ref_verts[0];
    clipped
        .into_iter()
        .filter_map(|p| {
            let depth = -(p - plane_point).dot(ref_normal);
            if depth >= 0.0 {
                Some((p - ref_normal * depth, depth))
            } else {
                None
            }
        })
        .collect()
}

fn incident_face(hull: &Hull, verts: &[Vec3], rot: glam::Quat, ref_normal: Vec3) -> usize {
    let mut best = 0usize;
    let mut min_dot = f32::INFINITY;
    for (i, face) in hull.faces.iter().enumerate() {
        let world_normal = rot * face.normal;
        let dot = world_normal.dot(ref_normal);
        if dot < min_dot {
            min_dot = dot;
            best = i;
        }
    }
    let _ = verts;
    best
}

fn face_vertices_world(hull: &Hull, verts: &[Vec3], face: u32) -> Vec<Vec3> {
    let f = &hull.faces[face as usize];
    let mut out = Vec::with_capacity(f.edge_count as usize);
    let mut e = f.first_edge;
    for _ in 0..f.edge_count {
        out.push(verts[hull.edges[e as usize].origin as usize]);
        e = hull.edges[e as usize].next;
    }
    out
}

/// Picks at most 4 representative points from a clipped contact polygon: the
/// deepest point, the point farthest from it, and the two points that
/// maximize the triangle area on either side of that segment.
fn reduce_to_manifold(points: Vec<(Vec3, f32)>) -> Vec<(Vec3, f32)> {
    if points.len() <= 4 {
        return points;
    }
    let deepest = points
        .iter()
        .enumerate()
        .max_by(|a, b| a.1 .1.partial_cmp(&b.1 .1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0);

    let farthest = points
        .iter()
        .enumerate()
        .max_by(|a, b| {
            let da = (a.1 .0 - points[deepest].0).length_squared();
            let db = (b.1 .0 - points[deepest].0).length_squared();
            da.partial_cmp(&db).unwrap()
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut max_pos = (0usize, 0.0f32);
    let mut max_neg = (0usize, 0.0f32);
    let reference = (points[deepest].0 - points[farthest].0).cross(Vec3::Y);
    for (i, (p, _)) in points.iter().enumerate() {
        let area = (points[deepest].0 - *p).cross(points[farthest].0 - *p);
        let signed = area.dot(reference);
        if signed >= 0.0 && area.length_squared() > max_pos.1 {
            max_pos = (i, area.length_squared());
        } else if signed < 0.0 && area.length_squared() > max_neg.1 {
            max_neg = (i, area.length_squared());
        }
    }

    let mut indices = vec![deepest, farthest, max_pos.0, max_neg.0];
    indices.dedup();
    indices.into_iter().map(|i| points[i]).collect()
}

pub fn hull_hull_contact(
    shape_a: &ColliderShape,
    ta: &Transform,
    shape_b: &ColliderShape,
    tb: &Transform,
    body_a: EntityId,
    body_b: EntityId,
) -> Option<Contact> {
    let (ColliderShape::ConvexHull(hull_a), ColliderShape::ConvexHull(hull_b)) = (shape_a, shape_b) else {
        return None;
    };

    let verts_a = world_vertices(hull_a, ta);
    let verts_b = world_vertices(hull_b, tb);

    let face_query_a = fv_separation(hull_a, &verts_a, &verts_b)?;
    let face_query_b = fv_separation(hull_b, &verts_b, &verts_a)?;
    let edge_query = ee_separation(hull_a, &verts_a, ta.rotation, ta.position, hull_b, &verts_b, tb.rotation)?;

    let best_face_depth = face_query_a.depth.max(face_query_b.depth);

    // Relative bias favoring face contact (spec.md §4.2): edge contact only
    // wins when its depth clears the face depth by more than float-epsilon
    // slop, scaled to the contact's own magnitude rather than a fixed
    // absolute threshold.
    if edge_query.depth > RELATIVE_FACE_BIAS * best_face_depth {
        // Edge-edge contact: a single point at the midpoint of the closest
        // segment-segment approach along the separating axis.
        let (a0, a1) = hull_a.edge_endpoints(edge_query.edge_a);
        let (b0, b1) = hull_b.edge_endpoints(edge_query.edge_b);
        let world_a0 = ta.position + ta.rotation * a0;
        let world_a1 = ta.position + ta.rotation * a1;
        let world_b0 = tb.position + tb.rotation * b0;
        let world_b1 = tb.position + tb.rotation * b1;
        let point = segment_segment_midpoint(world_a0, world_a1, world_b0, world_b1);
        return Some(Contact::new(
            body_a,
            body_b,
            point,
            edge_query.normal,
            -edge_query.depth,
            (edge_query.edge_a as u64) << 32 | edge_query.edge_b as u64,
            MaterialPairProperties::default(),
        ));
    }

    let (ref_hull, ref_verts, ref_rot, normal, ref_face, inc_hull, inc_verts, inc_rot, flip) =
        if face_query_a.depth >= face_query_b.depth {
            (hull_a, &verts_a, ta.rotation, face_query_a.normal, face_query_a.face, hull_b, &verts_b, tb.rotation, false)
        } else {
            (hull_b, &verts_b, tb.rotation, face_query_b.normal, face_query_b.face, hull_a, &verts_a, ta.rotation, true)
        };

    let inc_face = incident_face(inc_hull, inc_verts, inc_rot, ref_rot * normal);
    let ref_face_verts = face_vertices_world(ref_hull, ref_verts, ref_face);
    let inc_face_verts = face_vertices_world(inc_hull, inc_verts, inc_face as u32);

    let world_normal = ref_rot * normal;
    let contact_points = reduce_to_manifold(clip_face_contact(&ref_face_verts, world_normal, &inc_face_verts));
    if contact_points.is_empty() {
        return None;
    }

    // Use the deepest clipped point for the single-point `Contact`; callers
    // that want the full manifold iterate `contact_points` themselves via
    // `hull_hull_manifold`.
    let (point, depth) = contact_points
        .iter()
        .cloned()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap();

    let (final_body_a, final_body_b, final_normal) = if flip {
        (body_b, body_a, -world_normal)
    } else {
        (body_a, body_b, world_normal)
    };

    Some(Contact::new(
        final_body_a,
        final_body_b,
        point,
        final_normal,
        depth,
        ref_face as u64,
        MaterialPairProperties::default(),
    ))
}

/// Full clipped manifold (up to 4 points) for a hull-hull pair, used by the
/// contact database to persist more than one point per pair.
pub fn hull_hull_manifold(
    shape_a: &ColliderShape,
    ta: &Transform,
    shape_b: &ColliderShape,
    tb: &Transform,
    body_a: EntityId,
    body_b: EntityId,
) -> Vec<Contact> {
    let (ColliderShape::ConvexHull(hull_a), ColliderShape::ConvexHull(hull_b)) = (shape_a, shape_b) else {
        return Vec::new();
    };

    let verts_a = world_vertices(hull_a, ta);
    let verts_b = world_vertices(hull_b, tb);

    let (Some(face_query_a), Some(face_query_b)) =
        (fv_separation(hull_a, &verts_a, &verts_b), fv_separation(hull_b, &verts_b, &verts_a))
    else {
        return Vec::new();
    };
    let Some(edge_query) = ee_separation(hull_a, &verts_a, ta.rotation, ta.position, hull_b, &verts_b, tb.rotation)
    else {
        return Vec::new();
    };

    let best_face_depth = face_query_a.depth.max(face_query_b.depth);
    if edge_query.depth > RELATIVE_FACE_BIAS * best_face_depth {
        return hull_hull_contact(shape_a, ta, shape_b, tb, body_a, body_b)
            .into_iter()
            .collect();
    }

    let (ref_hull, ref_verts, ref_rot, normal, ref_face, inc_hull, inc_verts, inc_rot, flip) =
        if face_query_a.depth >= face_query_b.depth {
            (hull_a, &verts_a, ta.rotation, face_query_a.normal, face_query_a.face, hull_b, &verts_b, tb.rotation, false)
        } else {
            (hull_b, &verts_b, tb.rotation, face_query_b.normal, face_query_b.face, hull_a, &verts_a, ta.rotation, true)
        };

    let inc_face = incident_face(inc_hull, inc_verts, inc_rot, ref_rot * normal);
    let ref_face_verts = face_vertices_world(ref_hull, ref_verts, ref_face);
    let inc_face_verts = face_vertices_world(inc_hull, inc_verts, inc_face as u32);
    let world_normal = ref_rot * normal;

    let contact_points = reduce_to_manifold(clip_face_contact(&ref_face_verts, world_normal, &inc_face_verts));
    let (final_body_a, final_body_b, final_normal) = if flip {
        (body_b, body_a, -world_normal)
    } else {
        (body_a, body_b, world_normal)
    };

    contact_points
        .into_iter()
        .enumerate()
        .map(|(i, (point, depth))| {
            Contact::new(
                final_body_a,
                final_body_b,
                point,
                final_normal,
                depth,
                (ref_face as u64) << 8 | i as u64,
                MaterialPairProperties::default(),
            )
        })
        .collect()
}

fn segment_segment_midpoint(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> Vec3 {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = a0 - b0;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);
    let (s, t) = if a < 1e-12 || e < 1e-12 {
        (0.0, 0.0)
    } else {
        let c = d1.dot(r);
        let b = d1.dot(d2);
        let denom = a * e - b * b;
        let s = if denom.abs() > 1e-12 { ((b * f - c * e) / denom).clamp(0.0, 1.0) } else { 0.0 };
        let t = ((b * s + f) / e).clamp(0.0, 1.0);
        (s, t)
    };
    let pa = a0 + d1 * s;
    let pb = b0 + d2 * t;
    (pa + pb) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hull::box_hull;

    #[test]
    fn stacked_boxes_produce_face_contact_with_upward_normal() {
        let hull_a = ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)));
        let hull_b = ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)));
        let ta = Transform::from_position(Vec3::ZERO);
        let tb = Transform::from_position(Vec3::new(0.0, 0.9, 0.0));

        let contact = hull_hull_contact(&hull_a, &ta, &hull_b, &tb, EntityId::from_index(0), EntityId::from_index(1))
            .expect("overlapping stacked boxes should collide");
        assert!(contact.depth > 0.0);
        assert!(contact.normal.y.abs() > 0.9, "normal was {:?}", contact.normal);
    }

    #[test]
    fn separated_boxes_have_no_contact() {
        let hull_a = ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)));
        let hull_b = ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)));
        let ta = Transform::from_position(Vec3::ZERO);
        let tb = Transform::from_position(Vec3::new(5.0, 0.0, 0.0));

        assert!(hull_hull_contact(&hull_a, &ta, &hull_b, &tb, EntityId::from_index(0), EntityId::from_index(1)).is_none());
    }

    #[test]
    fn stacked_boxes_manifold_has_multiple_points() {
        let hull_a = ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)));
        let hull_b = ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)));
        let ta = Transform::from_position(Vec3::ZERO);
        let tb = Transform::from_position(Vec3::new(0.0, 0.95, 0.0));

        let manifold = hull_hull_manifold(&hull_a, &ta, &hull_b, &tb, EntityId::from_index(0), EntityId::from_index(1));
        assert!(manifold.len() >= 1);
    }
}
