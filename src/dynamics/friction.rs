//! Coulomb friction sub-solve.
//!
//! For each contact point, two independent tangent impulses (one per
//! tangent axis orthogonal to the contact normal) are solved exactly the
//! way the normal impulse is, then clamped to the friction cone
//! `|tangent_impulse| <= friction * normal_impulse`.

use glam::Vec3;

use crate::core::soa::BodyMut;

#[allow(clippy::too_many_arguments)]
pub fn solve_tangent_point(
    a: &mut BodyMut,
    b: &mut BodyMut,
    r1: Vec3,
    r2: Vec3,
    tangents: [Vec3; 2],
    tangent_mass: [f32; 2],
    friction: f32,
    normal_impulse: f32,
    accumulated: &mut [f32; 2],
) {
    let max_friction = friction * normal_impulse;

    for axis in 0..2 {
        if tangent_mass[axis] <= 0.0 {
            continue;
        }
        let t = tangents[axis];
        let rel_vel = (b.velocity.linear + b.velocity.angular.cross(r2))
            - (a.velocity.linear + a.velocity.angular.cross(r1));
        let vt = rel_vel.dot(t);

        let lambda = -tangent_mass[axis] * vt;
        let old_impulse = accumulated[axis];
        let new_impulse = (old_impulse + lambda).clamp(-max_friction, max_friction);
        let delta = new_impulse - old_impulse;
        accumulated[axis] = new_impulse;

        let impulse = t * delta;
        if !(a.flags.is_static || !a.flags.dynamic) {
            a.velocity.linear -= impulse * (*a.inverse_mass);
            a.velocity.angular -= (*a.inverse_inertia) * r1.cross(impulse);
        }
        if !(b.flags.is_static || !b.flags.dynamic) {
            b.velocity.linear += impulse * (*b.inverse_mass);
            b.velocity.angular += (*b.inverse_inertia) * r2.cross(impulse);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBody;
    use crate::core::soa::BodiesSoA;

    #[test]
    fn tangent_impulse_is_clamped_to_friction_cone() {
        let mut bodies = BodiesSoA::new();
        let a_id = bodies.insert(RigidBody::builder().is_static(true).build());
        let b_id = bodies.insert(
            RigidBody::builder()
                .mass(1.0)
                .velocity(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO)
                .build(),
        );

        let mut accumulated = [0.0f32, 0.0];
        {
            let (mut a, mut b) = bodies.get2_mut(a_id, b_id).unwrap();
            solve_tangent_point(
                &mut a,
                &mut b,
                Vec3::ZERO,
                Vec3::ZERO,
                [Vec3::X, Vec3::Z],
                [1.0, 1.0],
                0.5,
                2.0,
                &mut accumulated,
            );
        }
        assert!(accumulated[0].abs() <= 1.0 + 1e-5);
    }
}
