//! Particle Accelerator – Physics Engine for Rust.
//!
//! This crate exposes a modular physics engine architecture built around
//! ECS-friendly patterns, offering collision detection, dynamics,
//! constraint solving, and utility modules out of the box.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Mat4, Quat, Vec3};

pub use core::soa::{BodyMut, BodyRef};

pub use collision::{
    broadphase::Dbvh,
    contact::ContactDatabase,
    narrowphase::NarrowPhase,
    queries::{Raycast, RaycastHit, RaycastQuery},
    sat::{hull_hull_contact, hull_hull_manifold},
    shapes::{PrefabId, ShapeDatabase, ShapePrefab},
};
pub use config::PipelineConfig;
pub use core::{
    collider::{Collider, ColliderShape, CollisionFilter},
    rigidbody::RigidBody,
    types::{MassProperties, Material, Transform, Velocity},
};
pub use dynamics::{
    forces::{DragForce, ForceGenerator, ForceRegistry, GravityForce, SpringForce},
    solver::{Contact, PgsSolver},
};
pub use error::PhysicsError;
pub use utils::allocator::{Arena, EntityId, GenerationalId};
pub use world::Pipeline;
pub use world::events::{EventKind, PipelineEvent};

/// High-level convenience wrapper that owns a [`Pipeline`] built with default
/// settings. Most callers that need control over the solver, sleeping, or
/// broad-phase margins should construct a [`Pipeline`] directly instead.
pub struct PhysicsEngine {
    pipeline: Pipeline,
}

impl PhysicsEngine {
    /// Creates a new engine with an unbounded body pool, ticking at `time_step`
    /// seconds per tick, backed by an empty shape database.
    pub fn new(time_step: f32) -> Self {
        let config = PipelineConfig::builder().time_step(time_step).build();
        Self {
            pipeline: Pipeline::with_config(0, 0, ShapeDatabase::new(), config),
        }
    }

    /// Registers a shape prefab, returning the id later passed to
    /// [`PhysicsEngine::add_body`].
    pub fn add_shape(&mut self, prefab: ShapePrefab) -> PrefabId {
        self.pipeline.shape_db.register(prefab)
    }

    /// Allocates a body stamped out of `prefab` at `transform`, returning its
    /// generated [`EntityId`].
    pub fn add_body(
        &mut self,
        prefab: PrefabId,
        transform: Transform,
    ) -> Result<EntityId, PhysicsError> {
        self.pipeline
            .body_alloc(prefab, transform.position, transform.rotation, 0)
    }

    /// Advances the simulation by one fixed tick.
    pub fn step(&mut self) -> Result<(), PhysicsError> {
        self.pipeline.tick()
    }

    /// Drains and returns the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<PipelineEvent> {
        self.pipeline.flush()
    }

    /// Immutable access to a rigid body by id.
    pub fn get_body(&self, id: EntityId) -> Option<BodyRef<'_>> {
        self.pipeline.bodies.get(id)
    }

    /// Mutable access to a rigid body by id.
    pub fn get_body_mut(&mut self, id: EntityId) -> Option<BodyMut<'_>> {
        self.pipeline.bodies.get_mut(id)
    }

    /// Direct access to the underlying [`Pipeline`] for callers that need
    /// sleeping control, raycasts, or profiler data.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Mutable access to the underlying [`Pipeline`].
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }
}
