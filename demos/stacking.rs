use particle_accelerator::core::collider::ColliderShape;
use particle_accelerator::core::hull::box_hull;
use particle_accelerator::{Pipeline, ShapeDatabase, ShapePrefab};

fn main() {
    let mut shape_db = ShapeDatabase::new();
    let mut floor = ShapePrefab::new(ColliderShape::ConvexHull(box_hull(glam::Vec3::new(10.0, 0.5, 10.0))));
    floor.mass = 0.0;
    let floor = shape_db.register(floor);
    let cube = shape_db.register(ShapePrefab::new(ColliderShape::ConvexHull(box_hull(glam::Vec3::splat(0.5)))));

    let mut pipeline = Pipeline::init(16, 1_000_000_000 / 60, 0, shape_db);
    pipeline
        .body_alloc(floor, glam::Vec3::new(0.0, -0.5, 0.0), glam::Quat::IDENTITY, 0)
        .expect("floor should allocate");

    for i in 0..5 {
        let y = i as f32 + 0.5;
        pipeline
            .body_alloc(cube, glam::Vec3::new(0.0, y, 0.0), glam::Quat::IDENTITY, i as u64 + 1)
            .expect("cube should allocate");
    }

    for _ in 0..120 {
        pipeline.tick().expect("tick should succeed");
    }

    println!("Simulated a stack of five cubes for 2 seconds");
}
