use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use particle_accelerator::core::mesh::Aabb;
use particle_accelerator::{Dbvh, EntityId};

fn bench_dbvh_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("dbvh_scaling");

    for &count in &[1000usize, 10000, 50000] {
        group.bench_with_input(BenchmarkId::new("insert", count), &count, |b, &count| {
            b.iter(|| {
                let mut dbvh = Dbvh::new();
                for i in 0..count {
                    let x = i as f32 * 0.1;
                    let bounds = Aabb::new(
                        glam::Vec3::new(x, 0.0, 0.0),
                        glam::Vec3::new(x + 0.5, 0.5, 0.5),
                    );
                    dbvh.insert(EntityId::from_index(i as u32), bounds);
                }
                black_box(dbvh.len());
            })
        });

        group.bench_with_input(BenchmarkId::new("self_overlap_pairs", count), &count, |b, &count| {
            let mut dbvh = Dbvh::new();
            for i in 0..count {
                let x = i as f32 * 0.1;
                let bounds = Aabb::new(
                    glam::Vec3::new(x, 0.0, 0.0),
                    glam::Vec3::new(x + 0.5, 0.5, 0.5),
                );
                dbvh.insert(EntityId::from_index(i as u32), bounds);
            }
            b.iter(|| black_box(dbvh.self_overlap_pairs()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dbvh_scaling);
criterion_main!(benches);
