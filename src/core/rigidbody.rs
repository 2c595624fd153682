use crate::dynamics::island::ISLAND_STATIC;
use crate::utils::allocator::EntityId;

use super::types::{MassProperties, Material, Transform, Velocity};
use glam::{Mat3, Vec3};

/// Status flags for a rigid body, per the data model's `{ACTIVE, DYNAMIC,
/// AWAKE, MARKED_FOR_REMOVAL, IN_ISLAND}` flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyFlags {
    pub active: bool,
    pub dynamic: bool,
    pub awake: bool,
    pub marked_for_removal: bool,
    pub in_island: bool,
    pub is_static: bool,
}

impl Default for BodyFlags {
    fn default() -> Self {
        Self {
            active: true,
            dynamic: true,
            awake: true,
            marked_for_removal: false,
            in_island: false,
            is_static: false,
        }
    }
}

/// Core rigid body description storing kinematic state and properties.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: EntityId,
    pub transform: Transform,
    pub velocity: Velocity,
    pub acceleration: Vec3,
    pub mass_properties: MassProperties,
    pub material: Material,
    pub gravity_scale: f32,
    pub flags: BodyFlags,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub inverse_mass: f32,
    pub inverse_inertia: Mat3,
    /// Object-local AABB half-extents around the body origin.
    pub local_aabb_half_extents: Vec3,
    /// Handle of the [`crate::core::collider::Collider`] describing this body's shape.
    pub collider: EntityId,
    /// Handle into the dynamic BVH; `None` until the body has a proxy.
    pub broadphase_proxy: Option<i32>,
    /// Island this body belongs to, or [`ISLAND_STATIC`] for non-dynamic bodies.
    pub island: u32,
    /// Seconds the body has spent below the sleep velocity thresholds.
    pub low_velocity_time: f32,
}

impl Default for RigidBody {
    fn default() -> Self {
        let mut body = Self {
            id: EntityId::default(),
            transform: Transform::default(),
            velocity: Velocity::default(),
            acceleration: Vec3::ZERO,
            mass_properties: MassProperties::default(),
            material: Material::default(),
            gravity_scale: 1.0,
            flags: BodyFlags::default(),
            linear_damping: 0.02,
            angular_damping: 0.02,
            inverse_mass: 1.0,
            inverse_inertia: Mat3::IDENTITY,
            local_aabb_half_extents: Vec3::splat(0.5),
            collider: EntityId::default(),
            broadphase_proxy: None,
            island: ISLAND_STATIC,
            low_velocity_time: 0.0,
        };
        body.recompute_inverses();
        body
    }
}

impl RigidBody {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Invariant (data model): a non-dynamic body always maps to the STATIC
    /// island sentinel and has infinite mass.
    pub fn is_static(&self) -> bool {
        self.flags.is_static || !self.flags.dynamic
    }

    pub fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        self.velocity.linear = linear;
        self.velocity.angular = angular;
    }

    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_static() {
            return;
        }
        self.acceleration += force * self.inverse_mass;
    }

    pub fn apply_impulse(&mut self, impulse: Vec3, position: Vec3) {
        if self.is_static() {
            return;
        }

        self.velocity.linear += impulse * self.inverse_mass;
        let torque = (position - self.transform.position).cross(impulse);
        self.velocity.angular += self.inverse_inertia * torque;
        self.flags.awake = true;
    }

    pub fn apply_angular_impulse(&mut self, angular_impulse: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.angular += self.inverse_inertia * angular_impulse;
        self.flags.awake = true;
    }

    pub fn set_mass_properties(&mut self, props: MassProperties) {
        self.mass_properties = props;
        self.recompute_inverses();
    }

    pub fn recompute_inverses(&mut self) {
        if self.is_static() {
            self.inverse_mass = 0.0;
            self.inverse_inertia = Mat3::ZERO;
            self.island = ISLAND_STATIC;
            return;
        }
        self.inverse_mass = if self.mass_properties.mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / self.mass_properties.mass
        };
        let det = self.mass_properties.inertia.determinant();
        if det.abs() < f32::EPSILON {
            self.inverse_inertia = Mat3::ZERO;
        } else {
            self.inverse_inertia = self.mass_properties.inertia.inverse();
        }
    }

    /// World-space inverse inertia tensor `R * I^-1_local * R^T` (spec.md §4.5).
    pub fn world_inverse_inertia(&self) -> Mat3 {
        let r = Mat3::from_quat(self.transform.rotation);
        r * self.inverse_inertia * r.transpose()
    }

    pub fn builder() -> RigidBodyBuilder {
        RigidBodyBuilder::new()
    }
}

pub struct RigidBodyBuilder {
    body: RigidBody,
}

impl Default for RigidBodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBodyBuilder {
    pub fn new() -> Self {
        Self {
            body: RigidBody::default(),
        }
    }

    pub fn position(mut self, pos: Vec3) -> Self {
        self.body.transform.position = pos;
        self
    }

    pub fn rotation(mut self, rot: glam::Quat) -> Self {
        self.body.transform.rotation = rot;
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.body.mass_properties.mass = mass;
        self.body.recompute_inverses();
        self
    }

    pub fn inertia(mut self, inertia: Mat3) -> Self {
        self.body.mass_properties.inertia = inertia;
        self.body.recompute_inverses();
        self
    }

    pub fn material(mut self, material: Material) -> Self {
        self.body.material = material;
        self
    }

    pub fn local_aabb_half_extents(mut self, half_extents: Vec3) -> Self {
        self.body.local_aabb_half_extents = half_extents;
        self
    }

    pub fn is_static(mut self, is_static: bool) -> Self {
        self.body.flags.is_static = is_static;
        self.body.flags.dynamic = !is_static;
        self.body.recompute_inverses();
        self
    }

    pub fn velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.body.set_velocity(linear, angular);
        self
    }

    pub fn build(self) -> RigidBody {
        self.body
    }
}
