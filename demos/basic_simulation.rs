use particle_accelerator::core::collider::ColliderShape;
use particle_accelerator::core::types::Transform;
use particle_accelerator::{PhysicsEngine, ShapePrefab};

fn main() {
    let mut engine = PhysicsEngine::new(1.0 / 60.0);

    let mut ground = ShapePrefab::new(ColliderShape::Sphere { radius: 5.0 });
    ground.mass = 0.0;
    let ground_prefab = engine.add_shape(ground);
    engine
        .add_body(ground_prefab, Transform::default())
        .expect("ground should allocate");

    let ball_prefab = engine.add_shape(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
    let body_id = engine
        .add_body(ball_prefab, Transform::from_position(glam::Vec3::new(0.0, 6.0, 0.0)))
        .expect("ball should allocate");

    engine.step().expect("tick should succeed");

    if let Some(body) = engine.get_body(body_id) {
        println!("Body position after one tick: {:?}", body.transform().position);
    }
}
