use glam::Vec3;
use particle_accelerator::*;
use particle_accelerator::core::collider::{Collider, ColliderShape};
use particle_accelerator::core::rigidbody::RigidBody;
use particle_accelerator::core::types::Transform;

fn sphere_collider(id: EntityId, rigidbody_id: EntityId, radius: f32) -> Collider {
    Collider {
        id,
        rigidbody_id,
        shape: ColliderShape::Sphere { radius },
        offset: Transform::default(),
        is_trigger: false,
        collision_filter: Default::default(),
    }
}

#[test]
fn two_spheres_just_overlapping_on_a_line() {
    let mut a = RigidBody::builder().position(Vec3::new(0.0, 0.0, 0.0)).mass(1.0).build();
    a.id = EntityId::from_index(0);
    let mut b = RigidBody::builder()
        .position(Vec3::new(1.999, 0.0, 0.0))
        .is_static(true)
        .build();
    b.id = EntityId::from_index(1);

    let collider_a = sphere_collider(EntityId::from_index(10), a.id, 1.0);
    let collider_b = sphere_collider(EntityId::from_index(11), b.id, 1.0);

    let contact = NarrowPhase::collide(&collider_a, &a, &collider_b, &b).expect("spheres overlap");
    assert_eq!(contact.body_a, a.id);
    assert_eq!(contact.body_b, b.id);
    assert!((contact.normal - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-4);
    assert!((contact.depth - 0.001).abs() < 1e-4);
}

#[test]
fn separated_spheres_produce_no_contact() {
    let mut a = RigidBody::builder().position(Vec3::ZERO).mass(1.0).build();
    a.id = EntityId::from_index(0);
    let mut b = RigidBody::builder().position(Vec3::new(5.0, 0.0, 0.0)).is_static(true).build();
    b.id = EntityId::from_index(1);

    let collider_a = sphere_collider(EntityId::from_index(10), a.id, 1.0);
    let collider_b = sphere_collider(EntityId::from_index(11), b.id, 1.0);

    assert!(NarrowPhase::collide(&collider_a, &a, &collider_b, &b).is_none());
}

#[test]
fn hull_hull_manifold_has_nonnegative_depth_and_consistent_normal() {
    let half_extents = Vec3::new(0.5, 0.5, 0.5);
    let hull_a = particle_accelerator::core::hull::box_hull(half_extents);
    let hull_b = particle_accelerator::core::hull::box_hull(half_extents);

    let mut a = RigidBody::builder().position(Vec3::new(0.0, 0.0, 0.0)).mass(1.0).build();
    a.id = EntityId::from_index(0);
    let mut b = RigidBody::builder().position(Vec3::new(0.0, 0.9, 0.0)).is_static(true).build();
    b.id = EntityId::from_index(1);

    let collider_a = Collider {
        id: EntityId::from_index(10),
        rigidbody_id: a.id,
        shape: ColliderShape::ConvexHull(hull_a),
        offset: Transform::default(),
        is_trigger: false,
        collision_filter: Default::default(),
    };
    let collider_b = Collider {
        id: EntityId::from_index(11),
        rigidbody_id: b.id,
        shape: ColliderShape::ConvexHull(hull_b),
        offset: Transform::default(),
        is_trigger: false,
        collision_filter: Default::default(),
    };

    let manifold = NarrowPhase::collide_manifold(&collider_a, &a, &collider_b, &b);
    assert!(!manifold.is_empty(), "overlapping boxes should produce a manifold");
    for point in &manifold {
        assert!(point.depth >= 0.0);
        assert!(point.normal.is_finite());
    }
}

#[test]
fn trimesh_pairs_never_produce_a_contact() {
    let mesh = particle_accelerator::core::mesh::TriangleMesh::new(
        vec![Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)],
        vec![[0, 1, 2]],
    );

    let mut a = RigidBody::builder().position(Vec3::ZERO).is_static(true).build();
    a.id = EntityId::from_index(0);
    let mut b = RigidBody::builder().position(Vec3::new(0.0, 0.1, 0.0)).mass(1.0).build();
    b.id = EntityId::from_index(1);

    let collider_a = Collider {
        id: EntityId::from_index(10),
        rigidbody_id: a.id,
        shape: ColliderShape::TriMesh(mesh),
        offset: Transform::default(),
        is_trigger: false,
        collision_filter: Default::default(),
    };
    let collider_b = sphere_collider(EntityId::from_index(11), b.id, 1.0);

    assert!(NarrowPhase::collide(&collider_a, &a, &collider_b, &b).is_none());
}
