use std::collections::HashSet;

use glam::Vec3;
use particle_accelerator::core::mesh::Aabb;
use particle_accelerator::{Dbvh, EntityId};

/// Deterministic xorshift so repeated runs of this test see the same tree
/// without pulling in a random-number dependency.
struct Xorshift(u64);

impl Xorshift {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn next_f32(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        lo + unit * (hi - lo)
    }
}

#[test]
fn raycast_visits_exactly_the_leaves_whose_bounds_the_ray_enters() {
    let mut dbvh = Dbvh::new();
    let mut rng = Xorshift(0x9E3779B97F4A7C15);

    for i in 0..1000u32 {
        let center = Vec3::new(
            rng.next_f32(-500.0, 500.0),
            rng.next_f32(-50.0, 50.0),
            rng.next_f32(-50.0, 50.0),
        );
        let half = Vec3::new(
            rng.next_f32(0.1, 2.0),
            rng.next_f32(0.1, 2.0),
            rng.next_f32(0.1, 2.0),
        );
        let bounds = Aabb::new(center - half, center + half);
        dbvh.insert(EntityId::from_index(i), bounds);
    }
    assert_eq!(dbvh.len(), 1000);

    let origin = Vec3::new(-1000.0, 0.0, 0.0);
    let dir = Vec3::new(1.0, 0.0, 0.0);
    let max_t = 4000.0;

    let mut expected = HashSet::new();
    for i in 0..1000u32 {
        let id = EntityId::from_index(i);
        let bounds = dbvh.proxy_bounds(id).expect("every inserted proxy has bounds");
        if bounds.raycast(origin, dir, max_t).is_some() {
            expected.insert(i);
        }
    }

    let mut visited = HashSet::new();
    dbvh.raycast(origin, dir, max_t, |id, _t| {
        visited.insert(id.index() as u32);
        true
    });

    assert_eq!(visited, expected);
    assert!(!expected.is_empty(), "ray along +x should enter at least one leaf");
}

#[test]
fn remove_then_reinsert_keeps_proxy_count_consistent() {
    let mut dbvh = Dbvh::new();
    let ids: Vec<EntityId> = (0..64u32).map(EntityId::from_index).collect();
    for &id in &ids {
        dbvh.insert(id, Aabb::new(Vec3::ZERO, Vec3::splat(1.0)));
    }
    assert_eq!(dbvh.len(), 64);

    for &id in &ids[0..32] {
        dbvh.remove(id);
    }
    assert_eq!(dbvh.len(), 32);

    for &id in &ids[0..32] {
        dbvh.insert(id, Aabb::new(Vec3::splat(10.0), Vec3::splat(11.0)));
    }
    assert_eq!(dbvh.len(), 64);
}
