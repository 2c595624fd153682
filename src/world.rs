//! The simulation driver: owns every body, collider, and subsystem, and
//! advances them one fixed tick at a time.
//!
//! `tick()` runs five phases in a fixed order, each timed into
//! [`PhysicsProfiler`]: retire bodies tagged for removal from the *previous*
//! tick, refresh the broad-phase, run narrow-phase over broad-phase
//! candidates into the contact database, merge/split the island database,
//! then solve and integrate every awake island. A body tagged for removal
//! mid-tick is never dropped until the next tick's first phase, so contacts
//! and island structure are never mutated mid-solve.

pub mod collision_manager;
pub mod dynamics_manager;
pub mod events;

use std::collections::HashSet;
use std::time::Instant;

use glam::{Mat3, Quat, Vec3};
use log::debug;

use crate::{
    collision::{
        narrowphase::NarrowPhase,
        queries::{Raycast, RaycastHit, RaycastQuery},
        shapes::{PrefabId, ShapeDatabase},
    },
    config::PipelineConfig,
    core::{
        collider::{Collider, ColliderShape},
        mesh::Aabb,
        rigidbody::RigidBodyBuilder,
        soa::BodiesSoA,
        types::{MassProperties, Transform},
    },
    dynamics::{
        island::{ISLAND_NULL, ISLAND_STATIC},
        solver::{Contact, PgsSolver},
    },
    error::PhysicsError,
    utils::{
        allocator::{Arena, EntityId},
        profiling::PhysicsProfiler,
    },
    world::events::{island_event, EventKind, PipelineEvent},
};

pub use collision_manager::CollisionManager;
pub use dynamics_manager::DynamicsManager;

/// Conservative world-space AABB of `shape` under `transform`, via the usual
/// `abs(R) * local_half_extents` projection of a rotated box.
fn world_aabb(shape: &ColliderShape, transform: &Transform) -> Aabb {
    let half = shape.local_aabb_half_extents();
    let r = Mat3::from_quat(transform.rotation);
    let abs_r = Mat3::from_cols(r.x_axis.abs(), r.y_axis.abs(), r.z_axis.abs());
    let world_half = abs_r * half;
    Aabb::new(transform.position - world_half, transform.position + world_half)
}

/// Approximates mass properties for a freshly allocated body from its shape
/// alone, the same box-inertia-tensor construction
/// [`TriangleMesh::approximate_mass_properties`](crate::core::mesh::TriangleMesh::approximate_mass_properties)
/// uses, generalized to every collider shape and rescaled to a caller-given
/// mass rather than a density (the source's shape database keys bodies off
/// mass directly, not density).
fn mass_properties_for(shape: &ColliderShape, mass: f32) -> MassProperties {
    let mass = mass.max(1e-4);
    match shape {
        ColliderShape::Sphere { radius } => {
            let i = 0.4 * mass * radius * radius;
            MassProperties {
                mass,
                inertia: Mat3::from_diagonal(Vec3::splat(i)),
            }
        }
        ColliderShape::Capsule { radius, half_height } => {
            // Sphere-of-bounding-radius proxy: simple and adequate for a
            // body whose exact capsule inertia the solver never needs to
            // match analytically.
            let r = (radius * radius + half_height * half_height).sqrt();
            let i = 0.4 * mass * r * r;
            MassProperties {
                mass,
                inertia: Mat3::from_diagonal(Vec3::splat(i)),
            }
        }
        ColliderShape::ConvexHull(_) | ColliderShape::TriMesh(_) => {
            let half = shape.local_aabb_half_extents();
            let size = half * 2.0;
            let factor = mass / 12.0;
            let inertia = Mat3::from_diagonal(Vec3::new(
                factor * (size.y * size.y + size.z * size.z),
                factor * (size.x * size.x + size.z * size.z),
                factor * (size.x * size.x + size.y * size.y),
            ));
            MassProperties { mass, inertia }
        }
    }
}

/// Central simulation container: the spec's `Pipeline`.
pub struct Pipeline {
    pub bodies: BodiesSoA,
    pub colliders: Arena<Collider>,
    pub shape_db: ShapeDatabase,
    pub collision: CollisionManager,
    pub dynamics: DynamicsManager,
    pub config: PipelineConfig,
    /// `Some(n)` when the body pool was created with a fixed capacity via
    /// [`Pipeline::init`]; `None` means unbounded (grows on demand).
    capacity: Option<usize>,
    /// Opaque caller-supplied entity handle each body was allocated with.
    entities: Vec<(EntityId, u64)>,
    removal_queue: Vec<EntityId>,
    events: Vec<PipelineEvent>,
    tick_index: u64,
    ns_per_tick: u64,
    pub profiler: PhysicsProfiler,
}

impl Pipeline {
    /// `initial_size` caps the body pool (0 means unbounded); `ns_per_tick`
    /// sets the fixed timestep; `frame_arena_bytes` is accepted for API
    /// parity with the source's per-frame scratch arena but unused here —
    /// this implementation's per-tick scratch (candidate pairs, manifolds)
    /// is ordinary `Vec` allocation, reclaimed at the end of every tick.
    pub fn init(
        initial_size: usize,
        ns_per_tick: u64,
        _frame_arena_bytes: usize,
        shape_db: ShapeDatabase,
    ) -> Self {
        let time_step = if ns_per_tick == 0 {
            crate::config::DEFAULT_TIME_STEP
        } else {
            ns_per_tick as f32 / 1_000_000_000.0
        };
        let config = PipelineConfig::builder().time_step(time_step).build();
        Self::with_config(initial_size, ns_per_tick, shape_db, config)
    }

    pub fn with_config(
        initial_size: usize,
        ns_per_tick: u64,
        shape_db: ShapeDatabase,
        config: PipelineConfig,
    ) -> Self {
        let mut dynamics = DynamicsManager::new();
        dynamics.config = config.solver;
        Self {
            bodies: BodiesSoA::new(),
            colliders: Arena::new(),
            shape_db,
            collision: CollisionManager::with_config(&config),
            dynamics,
            config,
            capacity: if initial_size > 0 { Some(initial_size) } else { None },
            entities: Vec::new(),
            removal_queue: Vec::new(),
            events: Vec::new(),
            tick_index: 0,
            ns_per_tick: if ns_per_tick == 0 {
                (config.time_step * 1_000_000_000.0) as u64
            } else {
                ns_per_tick
            },
            profiler: PhysicsProfiler::default(),
        }
    }

    /// Allocates a new body stamped out of `prefab`, inserts its broad-phase
    /// proxy, and returns its id.
    pub fn body_alloc(
        &mut self,
        prefab: PrefabId,
        position: Vec3,
        rotation: Quat,
        entity: u64,
    ) -> Result<EntityId, PhysicsError> {
        if let Some(capacity) = self.capacity {
            if self.bodies.len() >= capacity {
                return Err(PhysicsError::OutOfMemory { capacity });
            }
        }

        let prefab_data = self
            .shape_db
            .get(prefab)
            .ok_or(PhysicsError::UnknownPrefab(prefab))?
            .clone();

        let is_static = prefab_data.is_static();
        let local_half = prefab_data.shape.local_aabb_half_extents();
        let mass_properties = mass_properties_for(&prefab_data.shape, prefab_data.mass);

        let body = RigidBodyBuilder::new()
            .position(position)
            .rotation(rotation)
            .material(prefab_data.material)
            .local_aabb_half_extents(local_half)
            .is_static(is_static)
            .mass(mass_properties.mass)
            .inertia(mass_properties.inertia)
            .build();

        let body_id = self.bodies.insert(body);

        let collider = Collider {
            id: EntityId::default(),
            rigidbody_id: body_id,
            shape: prefab_data.shape,
            offset: Transform::default(),
            is_trigger: prefab_data.is_trigger,
            collision_filter: prefab_data.collision_filter,
        };
        let collider_id = self.colliders.insert(collider);
        if let Some(stored) = self.colliders.get_mut(collider_id) {
            stored.id = collider_id;
        }
        if let Some(mut body) = self.bodies.get_mut(body_id) {
            *body.collider = collider_id;
        }

        let transform = Transform::from_position_rotation(position, rotation);
        let aabb = world_aabb(&self.colliders.get(collider_id).unwrap().shape, &transform);
        let proxy = self.collision.broadphase.insert(body_id, aabb);
        if let Some(mut body) = self.bodies.get_mut(body_id) {
            *body.broadphase_proxy = Some(proxy);
        }

        self.entities.push((body_id, entity));
        self.push_event(EventKind::BodyNew, self.tick_timestamp_ns(), body_id, None);
        Ok(body_id)
    }

    /// Marks `body_id` for removal at the start of the next tick.
    pub fn body_tag_for_removal(&mut self, body_id: EntityId) -> Result<(), PhysicsError> {
        let mut body = self
            .bodies
            .get_mut(body_id)
            .ok_or(PhysicsError::InvalidBody(body_id))?;
        if !body.flags.marked_for_removal {
            body.flags.marked_for_removal = true;
            self.removal_queue.push(body_id);
        }
        Ok(())
    }

    pub fn enable_sleeping(&mut self) {
        self.config.solver.sleep_enabled = true;
        self.dynamics.config.sleep_enabled = true;
    }

    /// Disables sleeping and wakes every island and body immediately.
    pub fn disable_sleeping(&mut self) {
        self.config.solver.sleep_enabled = false;
        self.dynamics.config.sleep_enabled = false;
        let ids: Vec<u32> = self.dynamics.islands.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.dynamics.islands.set_awake(id, true);
        }
        for mut body in self.bodies.iter_mut() {
            body.set_awake(true);
        }
    }

    /// Casts a ray against the live broad-phase, returning the closest hit's
    /// body id and distance, or `(EntityId::default(), +inf)` if nothing was
    /// hit (the `NONE` sentinel the spec's `raycast` returns).
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> (EntityId, f32) {
        let query = RaycastQuery::new(origin, direction, max_distance);
        let hits = Raycast::cast(&query, &self.collision.broadphase, &self.colliders, &self.bodies);
        match hits.first() {
            Some(hit) => (hit.body_id, hit.distance),
            None => (EntityId::default(), f32::INFINITY),
        }
    }

    pub fn raycast_query(&self, query: &RaycastQuery) -> Vec<RaycastHit> {
        Raycast::cast(query, &self.collision.broadphase, &self.colliders, &self.bodies)
    }

    /// Drains and returns every event recorded since the last `flush`.
    pub fn flush(&mut self) -> Vec<PipelineEvent> {
        std::mem::take(&mut self.events)
    }

    fn tick_timestamp_ns(&self) -> u64 {
        self.tick_index.saturating_mul(self.ns_per_tick)
    }

    fn push_event(&mut self, kind: EventKind, timestamp_ns: u64, subject: EntityId, secondary: Option<EntityId>) {
        let mut event = PipelineEvent::new(kind, timestamp_ns, subject);
        if let Some(secondary) = secondary {
            event = event.with_secondary(secondary);
        }
        self.events.push(event);
    }

    /// Advances the simulation by one fixed tick.
    pub fn tick(&mut self) -> Result<(), PhysicsError> {
        self.profiler.reset();
        let frame_start = Instant::now();
        let dt = self.config.time_step;
        let timestamp_ns = self.tick_timestamp_ns();
        self.tick_index += 1;

        self.process_removals(timestamp_ns);

        let phase_start = Instant::now();
        self.refresh_broadphase();
        self.profiler.broad_phase_time += phase_start.elapsed();

        let pairs = self.collision.broadphase.self_overlap_pairs();

        let phase_start = Instant::now();
        let manifolds = self.run_narrow_phase(&pairs);
        self.profiler.narrow_phase_time += phase_start.elapsed();
        self.profiler.contact_count = manifolds.iter().map(|(_, _, c)| c.len()).sum();

        self.merge_contacts_and_islands(&manifolds, timestamp_ns);

        let broken = self.collision.contacts.end_frame();
        for (a, b) in broken {
            self.dynamics.islands.remove_contact(a, b);
            self.push_event(EventKind::ContactRemoved, timestamp_ns, a, Some(b));
        }
        self.run_island_splits(timestamp_ns);
        self.wake_active_islands(timestamp_ns);
        self.profiler.active_island_count = self.dynamics.islands.len();

        self.dynamics.force_registry.apply_all(&mut self.bodies, dt);

        let phase_start = Instant::now();
        self.solve(dt, timestamp_ns);
        self.profiler.solver_time += phase_start.elapsed();

        let phase_start = Instant::now();
        PgsSolver::integrate_positions(&mut self.bodies, dt);
        if self.config.solver.sleep_enabled {
            PgsSolver::update_sleep_timers(&mut self.bodies, &self.config.solver, dt);
        }
        self.profiler.integrator_time += phase_start.elapsed();

        self.update_sleep_states(timestamp_ns);
        self.sync_island_cache();

        self.profiler.body_count = self.bodies.len();
        self.profiler.total_frame_time += frame_start.elapsed();
        debug!(
            "tick {} bodies={} contacts={} islands={}",
            self.tick_index, self.profiler.body_count, self.profiler.contact_count, self.profiler.active_island_count
        );
        Ok(())
    }

    fn process_removals(&mut self, timestamp_ns: u64) {
        let queue = std::mem::take(&mut self.removal_queue);
        for body_id in queue {
            if !self.bodies.is_valid(body_id) {
                continue;
            }
            let collider_id = self.bodies.get(body_id).map(|b| b.collider());
            let old_island = self.dynamics.islands.island_of(body_id);

            self.collision.contacts.remove_body(body_id);
            self.dynamics.islands.remove_body(body_id);
            if old_island != ISLAND_NULL
                && old_island != ISLAND_STATIC
                && self.dynamics.islands.island(old_island).is_none()
            {
                self.push_event(EventKind::IslandRemoved, timestamp_ns, island_id_subject(old_island), None);
            }

            self.collision.broadphase.remove(body_id);
            if let Some(collider_id) = collider_id {
                self.colliders.remove(collider_id);
            }
            self.bodies.remove(body_id);
            self.entities.retain(|(id, _)| *id != body_id);
            self.push_event(EventKind::BodyRemoved, timestamp_ns, body_id, None);
        }
    }

    fn refresh_broadphase(&mut self) {
        let margin = self.config.broadphase_margin;
        let ids: Vec<EntityId> = self.bodies.iter().map(|b| b.id()).collect();
        for id in ids {
            let Some(body) = self.bodies.get(id) else { continue };
            if body.is_static() && body.broadphase_proxy().is_some() {
                continue;
            }
            let Some(collider) = self.colliders.get(body.collider()) else { continue };
            let tight = world_aabb(&collider.shape, body.transform());
            let aabb = Aabb::new(tight.min - Vec3::splat(margin), tight.max + Vec3::splat(margin));

            if self.collision.broadphase.proxy_bounds(id).is_none() {
                let proxy = self.collision.broadphase.insert(id, aabb);
                if let Some(mut body) = self.bodies.get_mut(id) {
                    *body.broadphase_proxy = Some(proxy);
                }
            } else {
                self.collision.broadphase.update(id, aabb);
            }
        }
    }

    fn run_narrow_phase(&self, pairs: &[(EntityId, EntityId)]) -> Vec<(EntityId, EntityId, Vec<Contact>)> {
        let tasks = &self.dynamics.tasks;
        let results = tasks.parallel_range(pairs, |&(a, b)| self.collide_pair(a, b));
        results.into_iter().flatten().collect()
    }

    fn collide_pair(&self, a: EntityId, b: EntityId) -> Option<(EntityId, EntityId, Vec<Contact>)> {
        let body_a = self.bodies.get(a)?;
        let body_b = self.bodies.get(b)?;
        if body_a.is_static() && body_b.is_static() {
            return None;
        }
        if !body_a.is_awake() && !body_b.is_awake() {
            return None;
        }
        let collider_a = self.colliders.get(body_a.collider())?;
        let collider_b = self.colliders.get(body_b.collider())?;
        if collider_a.is_trigger || collider_b.is_trigger {
            return None;
        }
        if collider_a.collision_filter.layer & collider_b.collision_filter.mask == 0
            || collider_b.collision_filter.layer & collider_a.collision_filter.mask == 0
        {
            return None;
        }

        let rb_a = body_a.to_rigid_body();
        let rb_b = body_b.to_rigid_body();
        let points = NarrowPhase::collide_manifold(collider_a, &rb_a, collider_b, &rb_b);
        if points.is_empty() {
            None
        } else {
            Some((a, b, points))
        }
    }

    fn merge_contacts_and_islands(
        &mut self,
        manifolds: &[(EntityId, EntityId, Vec<Contact>)],
        timestamp_ns: u64,
    ) {
        let mut sorted: Vec<&(EntityId, EntityId, Vec<Contact>)> = manifolds.iter().collect();
        sorted.sort_by_key(|(a, b, _)| (*a, *b));

        for (a, b, points) in sorted {
            let is_new = !self.collision.contacts.contains(*a, *b);
            self.collision.contacts.add(*a, *b, points);
            if !is_new {
                continue;
            }
            self.push_event(EventKind::ContactNew, timestamp_ns, *a, Some(*b));

            let a_static = self.bodies.get(*a).map(|b| b.is_static()).unwrap_or(true);
            let b_static = self.bodies.get(*b).map(|b| b.is_static()).unwrap_or(true);
            let before_a = self.dynamics.islands.island_of(*a);
            let before_b = self.dynamics.islands.island_of(*b);
            let islands_before: HashSet<u32> = self.dynamics.islands.iter().map(|(id, _)| id).collect();

            self.dynamics.islands.add_contact_to_island(*a, *b, a_static, b_static);

            for (id, _) in self.dynamics.islands.iter() {
                if !islands_before.contains(&id) {
                    self.push_event(EventKind::IslandNew, timestamp_ns, island_id_subject(id), None);
                }
            }
            if before_a != ISLAND_NULL && before_b != ISLAND_NULL && before_a != before_b {
                let kept = self.dynamics.islands.island_of(*a);
                let dropped = if kept == before_a { before_b } else { before_a };
                self.push_event(
                    EventKind::IslandMergedInto,
                    timestamp_ns,
                    island_id_subject(dropped),
                    Some(island_id_subject(kept)),
                );
            }
        }
    }

    fn run_island_splits(&mut self, timestamp_ns: u64) {
        for (old_id, new_ids) in self.dynamics.islands.run_splits() {
            if new_ids.len() <= 1 {
                continue;
            }
            for &id in &new_ids {
                self.push_event(EventKind::IslandNew, timestamp_ns, island_id_subject(id), None);
            }
            let _ = old_id;
        }
    }

    /// Wakes every body belonging to an awake island whose body-level awake
    /// flag had drifted out of sync (e.g. a sleeping island just gained a
    /// new contact and was reactivated by `add_contact_to_island`).
    fn wake_active_islands(&mut self, timestamp_ns: u64) {
        let islands = &self.dynamics.islands;
        let bodies = &mut self.bodies;
        for (id, island) in islands.iter() {
            if !island.is_awake() {
                continue;
            }
            let mut woke_any = false;
            for &body_id in &island.bodies {
                if let Some(mut body) = bodies.get_mut(body_id) {
                    if !body.is_awake() {
                        body.set_awake(true);
                        *body.low_velocity_time = 0.0;
                        woke_any = true;
                    }
                }
            }
            if woke_any {
                self.events.push(island_event(EventKind::IslandAwake, timestamp_ns, id));
            }
        }
    }

    fn solve(&mut self, dt: f32, timestamp_ns: u64) {
        PgsSolver::integrate_velocities(&mut self.bodies, &self.config.solver, dt);

        let mut contacts = self
            .collision
            .contacts
            .collect_contacts(&self.bodies, self.config.solver.warmup_tangent_impulses);
        contacts.sort_by_key(|c| (c.body_a, c.body_b));

        let mut by_island: std::collections::HashMap<u32, Vec<Contact>> = std::collections::HashMap::new();
        for contact in contacts {
            let island_a = self.dynamics.islands.island_of(contact.body_a);
            let island_id = if island_a != ISLAND_NULL { island_a } else { self.dynamics.islands.island_of(contact.body_b) };
            if island_id == ISLAND_NULL {
                continue;
            }
            let awake = self.dynamics.islands.island(island_id).map(|i| i.is_awake()).unwrap_or(false);
            if !awake {
                continue;
            }
            by_island.entry(island_id).or_default().push(contact);
        }

        let island_contacts: Vec<(u32, Vec<Contact>)> = by_island.into_iter().collect();
        let (solved, _metrics) =
            self.dynamics
                .tasks
                .solve_islands(&mut self.bodies, island_contacts, &self.config.solver, dt);

        let mut solved_contacts = Vec::new();
        let mut solved_bodies: HashSet<EntityId> = HashSet::new();
        for (island_id, contacts) in &solved {
            if let Some(island) = self.dynamics.islands.island(*island_id) {
                for &id in &island.bodies {
                    solved_bodies.insert(id);
                }
            }
            solved_contacts.extend(contacts.iter().cloned());
        }
        self.collision.contacts.apply_impulses(&solved_contacts);

        for id in solved_bodies {
            self.push_event(EventKind::BodyOrientation, timestamp_ns, id, None);
        }
    }

    fn update_sleep_states(&mut self, timestamp_ns: u64) {
        if !self.config.solver.sleep_enabled {
            return;
        }
        let threshold = self.config.solver.sleep_time_threshold;
        let mut to_sleep = Vec::new();
        for (id, island) in self.dynamics.islands.iter() {
            if !island.is_awake() || island.bodies.is_empty() {
                continue;
            }
            let all_below = island.bodies.iter().all(|&body_id| {
                self.bodies
                    .get(body_id)
                    .map(|body| body.low_velocity_time() >= threshold)
                    .unwrap_or(true)
            });
            if all_below {
                to_sleep.push((id, island.bodies.clone()));
            }
        }
        for (id, members) in to_sleep {
            self.dynamics.islands.set_awake(id, false);
            for body_id in members {
                if let Some(mut body) = self.bodies.get_mut(body_id) {
                    body.set_awake(false);
                    body.velocity.linear = Vec3::ZERO;
                    body.velocity.angular = Vec3::ZERO;
                }
            }
            self.push_event(EventKind::IslandAsleep, timestamp_ns, island_id_subject(id), None);
        }
    }

    /// Mirrors each body's current island id into the SoA's cached `island`
    /// field, which `BodyRef::island` reads; the database's `body_island`
    /// map is the source of truth, this is purely a read-side convenience.
    fn sync_island_cache(&mut self) {
        let islands = &self.dynamics.islands;
        let bodies = &mut self.bodies;
        for (id, island) in islands.iter() {
            for &body_id in &island.bodies {
                if let Some(mut body) = bodies.get_mut(body_id) {
                    *body.island = id;
                }
            }
        }
    }
}

fn island_id_subject(island_id: u32) -> EntityId {
    EntityId::from_index(island_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::shapes::ShapePrefab;
    use crate::core::collider::ColliderShape;

    fn new_pipeline() -> Pipeline {
        let mut shape_db = ShapeDatabase::new();
        let sphere = shape_db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
        let mut floor = ShapePrefab::new(ColliderShape::ConvexHull(crate::core::hull::box_hull(Vec3::new(
            10.0, 0.5, 10.0,
        ))));
        floor.mass = 0.0;
        let floor = shape_db.register(floor);
        let mut pipeline = Pipeline::init(16, 1_000_000_000 / 60, 0, shape_db);
        pipeline.body_alloc(floor, Vec3::new(0.0, -0.5, 0.0), Quat::IDENTITY, 0).unwrap();
        pipeline.body_alloc(sphere, Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY, 1).unwrap();
        pipeline
    }

    #[test]
    fn sphere_settles_onto_static_floor() {
        let mut pipeline = new_pipeline();
        for _ in 0..240 {
            pipeline.tick().unwrap();
        }
        let id = pipeline.entities[1].0;
        let body = pipeline.bodies.get(id).unwrap();
        assert!(body.transform().position.y > 0.0);
        assert!(body.transform().position.y < 2.0);
        assert!(body.velocity().linear.length() < 1.0);
    }

    #[test]
    fn body_alloc_respects_capacity() {
        let mut shape_db = ShapeDatabase::new();
        let id = shape_db.register(ShapePrefab::new(ColliderShape::Sphere { radius: 0.5 }));
        let mut pipeline = Pipeline::init(1, 1_000_000_000 / 60, 0, shape_db);
        pipeline.body_alloc(id, Vec3::ZERO, Quat::IDENTITY, 0).unwrap();
        let err = pipeline.body_alloc(id, Vec3::ZERO, Quat::IDENTITY, 1);
        assert!(matches!(err, Err(PhysicsError::OutOfMemory { capacity: 1 })));
    }

    #[test]
    fn tagged_body_is_removed_on_next_tick() {
        let mut pipeline = new_pipeline();
        let id = pipeline.entities[1].0;
        pipeline.body_tag_for_removal(id).unwrap();
        assert!(pipeline.bodies.is_valid(id));
        pipeline.tick().unwrap();
        assert!(!pipeline.bodies.is_valid(id));
    }

    #[test]
    fn raycast_hits_allocated_body() {
        let pipeline = new_pipeline();
        let (hit_id, t) = pipeline.raycast(Vec3::new(0.0, 2.0, 5.0), Vec3::new(0.0, 0.0, -1.0), 20.0);
        assert!(!hit_id.is_null());
        assert!(t > 0.0 && t < 10.0);
    }

    #[test]
    fn flush_drains_body_new_events() {
        let mut pipeline = new_pipeline();
        let events = pipeline.flush();
        assert!(events.iter().any(|e| matches!(e.kind, EventKind::BodyNew)));
        assert!(pipeline.flush().is_empty());
    }
}
