use criterion::{black_box, criterion_group, criterion_main, Criterion};
use particle_accelerator::core::collider::ColliderShape;
use particle_accelerator::*;

fn bench_tick_100_bodies(c: &mut Criterion) {
    c.bench_function("tick_100_falling_spheres", |b| {
        b.iter(|| {
            let mut shape_db = ShapeDatabase::new();
            let sphere = shape_db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
            let mut pipeline = Pipeline::init(128, 1_000_000_000 / 60, 0, shape_db);
            for i in 0..100 {
                pipeline
                    .body_alloc(
                        sphere,
                        glam::Vec3::new(i as f32 * 2.0, 10.0, 0.0),
                        glam::Quat::IDENTITY,
                        i as u64,
                    )
                    .unwrap();
            }
            pipeline.tick().unwrap();
            black_box(pipeline.flush());
        })
    });
}

criterion_group!(benches, bench_tick_100_bodies);
criterion_main!(benches);
