use particle_accelerator::core::collider::ColliderShape;
use particle_accelerator::{Pipeline, RaycastQuery, ShapeDatabase, ShapePrefab};

fn main() {
    let mut shape_db = ShapeDatabase::new();
    let sphere = shape_db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 1.0 }));
    let mut pipeline = Pipeline::init(16, 1_000_000_000 / 60, 0, shape_db);
    pipeline
        .body_alloc(sphere, glam::Vec3::ZERO, glam::Quat::IDENTITY, 0)
        .expect("body should allocate");

    let query = RaycastQuery::new(glam::Vec3::new(0.0, 0.0, -5.0), glam::Vec3::Z, 10.0);
    let hits = pipeline.raycast_query(&query);
    println!("Ray hits: {}", hits.len());
}
