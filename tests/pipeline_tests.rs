use glam::{Quat, Vec3};
use particle_accelerator::core::collider::ColliderShape;
use particle_accelerator::core::hull::box_hull;
use particle_accelerator::{EventKind, Pipeline, PrefabId, ShapeDatabase, ShapePrefab};

const NS_PER_TICK: u64 = 1_000_000_000 / 60;

fn floor_and_sphere() -> (Pipeline, PrefabId, PrefabId) {
    let mut shape_db = ShapeDatabase::new();
    let mut floor = ShapePrefab::new(ColliderShape::ConvexHull(box_hull(Vec3::new(10.0, 0.5, 10.0))));
    floor.mass = 0.0;
    let floor = shape_db.register(floor);
    let sphere = shape_db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
    let pipeline = Pipeline::init(64, NS_PER_TICK, 0, shape_db);
    (pipeline, floor, sphere)
}

#[test]
fn sphere_falls_asleep_after_settling_on_the_floor() {
    let (mut pipeline, floor, sphere) = floor_and_sphere();
    pipeline
        .body_alloc(floor, Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, 0)
        .unwrap();
    let body_id = pipeline
        .body_alloc(sphere, Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, 1)
        .unwrap();
    pipeline.flush();

    let mut went_asleep = false;
    for _ in 0..400 {
        pipeline.tick().unwrap();
        let events = pipeline.flush();
        if events
            .iter()
            .any(|e| e.kind == EventKind::IslandAsleep)
        {
            went_asleep = true;
            break;
        }
    }

    assert!(went_asleep, "island should transition to ASLEEP once the sphere settles");
    let body = pipeline.bodies.get(body_id).unwrap();
    assert!(!body.is_awake());

    // Once asleep, ticking further should not emit further BODY_ORIENTATION
    // events for this body.
    for _ in 0..5 {
        pipeline.tick().unwrap();
        let events = pipeline.flush();
        assert!(!events
            .iter()
            .any(|e| e.kind == EventKind::BodyOrientation && e.subject == body_id));
    }
}

#[test]
fn five_stacked_cubes_settle_with_small_penetration() {
    let mut shape_db = ShapeDatabase::new();
    let mut floor = ShapePrefab::new(ColliderShape::ConvexHull(box_hull(Vec3::new(10.0, 0.5, 10.0))));
    floor.mass = 0.0;
    let floor = shape_db.register(floor);
    let cube = shape_db.register(ShapePrefab::new(ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)))));

    let mut pipeline = Pipeline::init(64, NS_PER_TICK, 0, shape_db);
    pipeline
        .body_alloc(floor, Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, 0)
        .unwrap();

    let mut cube_ids = Vec::new();
    for i in 0..5 {
        let y = 0.5 + i as f32 * 1.0;
        let id = pipeline
            .body_alloc(cube, Vec3::new(0.0, y, 0.0), Quat::IDENTITY, i as u64 + 1)
            .unwrap();
        cube_ids.push(id);
    }

    for _ in 0..120 {
        pipeline.tick().unwrap();
    }

    for &id in &cube_ids {
        let body = pipeline.bodies.get(id).unwrap();
        assert!(
            body.velocity().linear.length() < 1e-3,
            "stacked cube should have settled, got velocity {:?}",
            body.velocity().linear
        );
    }

    let island_id = pipeline.bodies.get(cube_ids[0]).unwrap().island();
    let island = pipeline.dynamics.islands.island(island_id).unwrap();
    assert_eq!(island.bodies.len(), 5, "all five dynamic cubes share one island");
}

#[test]
fn separating_bodies_split_their_island() {
    let mut shape_db = ShapeDatabase::new();
    let sphere = shape_db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
    let mut config = particle_accelerator::PipelineConfig::default();
    config.solver.gravity = Vec3::ZERO;
    let mut pipeline = Pipeline::with_config(64, NS_PER_TICK, shape_db, config);

    let a = pipeline
        .body_alloc(sphere, Vec3::new(0.0, 0.0, 0.0), Quat::IDENTITY, 0)
        .unwrap();
    let b = pipeline
        .body_alloc(sphere, Vec3::new(0.99, 0.0, 0.0), Quat::IDENTITY, 1)
        .unwrap();
    pipeline.tick().unwrap();

    let island_a_before = pipeline.bodies.get(a).unwrap().island();
    let island_b_before = pipeline.bodies.get(b).unwrap().island();
    assert_eq!(island_a_before, island_b_before, "overlapping spheres should share an island");

    if let Some(mut body) = pipeline.bodies.get_mut(b) {
        body.transform.position = Vec3::new(100.0, 0.0, 0.0);
        body.velocity.linear = Vec3::ZERO;
    }

    for _ in 0..4 {
        pipeline.tick().unwrap();
    }

    let island_a_after = pipeline.bodies.get(a).unwrap().island();
    let island_b_after = pipeline.bodies.get(b).unwrap().island();
    assert_ne!(island_a_after, island_b_after, "bodies should be in separate islands once they stop touching");
}

#[test]
fn warm_started_stack_converges_within_a_few_ticks() {
    let mut shape_db = ShapeDatabase::new();
    let mut floor = ShapePrefab::new(ColliderShape::ConvexHull(box_hull(Vec3::new(10.0, 0.5, 10.0))));
    floor.mass = 0.0;
    let floor = shape_db.register(floor);
    let cube = shape_db.register(ShapePrefab::new(ColliderShape::ConvexHull(box_hull(Vec3::splat(0.5)))));

    let mut pipeline = Pipeline::init(16, NS_PER_TICK, 0, shape_db);
    pipeline
        .body_alloc(floor, Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, 0)
        .unwrap();
    pipeline
        .body_alloc(cube, Vec3::new(0.0, 0.5, 0.0), Quat::IDENTITY, 1)
        .unwrap();

    let mut impulse_sums = Vec::new();
    for _ in 0..10 {
        pipeline.tick().unwrap();
        let contacts = pipeline
            .collision
            .contacts
            .collect_contacts(&pipeline.bodies, pipeline.config.solver.warmup_tangent_impulses);
        let total: f32 = contacts.iter().map(|c| c.normal_impulse).sum();
        impulse_sums.push(total);
    }

    let deltas: Vec<f32> = impulse_sums.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    assert!(
        deltas.iter().skip(4).all(|&d| d < 1e-3),
        "normal impulse sum should converge within a few ticks, deltas = {:?}",
        deltas
    );
}
