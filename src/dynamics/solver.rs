//! Sequential-impulse (PGS) contact solver.
//!
//! Per tick: integrate velocities (gravity + Padé damping), build per-manifold
//! velocity constraints, warm-start from the previous tick's cached impulses,
//! run `iteration_count` passes of either a block-solved k-point normal LCP
//! (falling back to point-wise PGS when the block is ill-conditioned) plus a
//! per-point friction sub-solve, then integrate positions and normalize
//! orientations.

use std::collections::HashMap;

use glam::{Mat3, Vec3};

use crate::core::{soa::BodiesSoA, types::MaterialPairProperties};
use crate::dynamics::friction;
use crate::utils::allocator::EntityId;

/// A single manifold point shared between broad/narrow phase and the solver.
/// A full manifold between two bodies is represented as a short run of these
/// sharing the same `(body_a, body_b)` pair.
#[derive(Debug, Clone)]
pub struct Contact {
    pub body_a: EntityId,
    pub body_b: EntityId,
    pub point: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    /// Stable id of the contributing features (e.g. face/edge indices),
    /// used to carry warm-start impulses across frames for this point.
    pub feature_id: u64,
    pub material: MaterialPairProperties,
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
}

impl Contact {
    pub fn new(
        body_a: EntityId,
        body_b: EntityId,
        point: Vec3,
        normal: Vec3,
        depth: f32,
        feature_id: u64,
        material: MaterialPairProperties,
    ) -> Self {
        Self {
            body_a,
            body_b,
            point,
            normal,
            depth,
            feature_id,
            material,
            normal_impulse: 0.0,
            tangent_impulse: [0.0, 0.0],
        }
    }
}

/// Per-point data derived during constraint setup (spec.md's
/// `velocity_constraint_point`: `r1`, `r2`, accumulated impulses, masses).
#[derive(Debug, Clone, Copy)]
struct VelocityConstraintPoint {
    r1: Vec3,
    r2: Vec3,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    velocity_bias: f32,
}

struct VelocityConstraint {
    body_a: EntityId,
    body_b: EntityId,
    normal: Vec3,
    tangent: [Vec3; 2],
    friction: f32,
    points: Vec<VelocityConstraintPoint>,
    /// Indices into the manifold's contact slice, parallel to `points`.
    contact_indices: Vec<usize>,
    block_solve: bool,
}

/// Runtime-tunable solver parameters (spec.md §6 configuration table).
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub iteration_count: u32,
    pub block_solver: bool,
    pub warmup_solver: bool,
    pub gravity: Vec3,
    pub baumgarte_constant: f32,
    pub max_condition: f32,
    pub linear_dampening: f32,
    pub angular_dampening: f32,
    pub linear_slop: f32,
    pub restitution_threshold: f32,
    pub sleep_enabled: bool,
    pub sleep_time_threshold: f32,
    pub sleep_lin_sq: f32,
    pub sleep_ang_sq: f32,
    /// Whether tangent (friction) impulses are carried across ticks the same
    /// way normal impulses are. The source this crate's contact model is
    /// grounded on only ever warm-starts normal impulses; this toggle exists
    /// for callers who want the (less stable, friction-coupled) alternative.
    pub warmup_tangent_impulses: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iteration_count: 8,
            block_solver: true,
            warmup_solver: true,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            baumgarte_constant: 0.2,
            max_condition: 1000.0,
            linear_dampening: 0.02,
            angular_dampening: 0.02,
            linear_slop: 0.005,
            restitution_threshold: 1.0,
            sleep_enabled: true,
            sleep_time_threshold: 0.5,
            sleep_lin_sq: 0.0025,
            sleep_ang_sq: 0.0025,
            warmup_tangent_impulses: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SolverStepMetrics {
    pub contacts_solved: usize,
    pub manifolds_solved: usize,
    pub block_solves: usize,
    pub block_fallbacks: usize,
    pub normal_impulse_sum: f32,
    pub tangent_impulse_sum: f32,
}

impl SolverStepMetrics {
    pub fn merge(&mut self, other: &Self) {
        self.contacts_solved += other.contacts_solved;
        self.manifolds_solved += other.manifolds_solved;
        self.block_solves += other.block_solves;
        self.block_fallbacks += other.block_fallbacks;
        self.normal_impulse_sum += other.normal_impulse_sum;
        self.tangent_impulse_sum += other.tangent_impulse_sum;
    }
}

fn skew(r: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, r.z, -r.y),
        Vec3::new(-r.z, 0.0, r.x),
        Vec3::new(r.y, -r.x, 0.0),
    )
}

/// Effective inverse mass along `dir` for the relative-velocity response of
/// an impulse applied at offset `r`.
fn effective_mass_term(inv_mass: f32, inv_inertia: Mat3, r: Vec3, dir: Vec3) -> f32 {
    let rn = r.cross(dir);
    inv_mass + rn.dot(inv_inertia * rn)
}

#[derive(Debug, Clone, Copy)]
struct BodySnapshot {
    position: Vec3,
    rotation_inv_inertia: Mat3,
    inv_mass: f32,
    is_static: bool,
}

pub struct PgsSolver;

impl PgsSolver {
    /// Integration step 1: applies gravity and Padé-approximation damping to
    /// every awake, non-static body.
    pub fn integrate_velocities(bodies: &mut BodiesSoA, config: &SolverConfig, dt: f32) {
        for mut body in bodies.iter_mut() {
            if body.is_static() || !body.flags.awake {
                continue;
            }
            let gravity_accel = config.gravity * (*body.gravity_scale);
            body.velocity.linear += (gravity_accel + *body.acceleration) * dt;
            *body.acceleration = Vec3::ZERO;

            let lin_damp = config.linear_dampening + *body.linear_damping;
            let ang_damp = config.angular_dampening + *body.angular_damping;
            body.velocity.linear *= 1.0 / (1.0 + lin_damp * dt);
            body.velocity.angular *= 1.0 / (1.0 + ang_damp * dt);
        }
    }

    /// Integration step 2: integrates positions from the solved velocities
    /// and re-normalizes orientation quaternions.
    pub fn integrate_positions(bodies: &mut BodiesSoA, dt: f32) {
        for mut body in bodies.iter_mut() {
            if body.is_static() || !body.flags.awake {
                continue;
            }
            body.transform.position += body.velocity.linear * dt;
            let omega = body.velocity.angular;
            let angle = omega.length() * dt;
            if angle > 1e-8 {
                let axis = omega / omega.length();
                let delta = glam::Quat::from_axis_angle(axis, angle);
                body.transform.rotation = (delta * body.transform.rotation).normalize();
            } else {
                body.transform.rotation = body.transform.rotation.normalize();
            }
        }
    }

    /// Full per-island solve: integrate velocities, set up and solve
    /// constraints for `contacts` (all belonging to bodies in this island),
    /// integrate positions, and update sleep timers. `contacts` is sorted
    /// in place into manifold-contiguous order as a side effect.
    pub fn solve_island(
        bodies: &mut BodiesSoA,
        contacts: &mut [Contact],
        config: &SolverConfig,
        dt: f32,
    ) -> SolverStepMetrics {
        if dt <= 0.0 {
            return SolverStepMetrics::default();
        }

        Self::integrate_velocities(bodies, config, dt);
        let metrics = Self::solve_constraints(bodies, contacts, config, dt);
        Self::integrate_positions(bodies, dt);

        if config.sleep_enabled {
            Self::update_sleep_timers(bodies, config, dt);
        }

        metrics
    }

    /// Constraint-only pass: sets up, warm-starts and iterates velocity
    /// constraints for `contacts`, writing final impulses back into
    /// `contacts` in place, without touching gravity, position integration
    /// or sleep timers. Callers persist those impulses into the contact
    /// database themselves (see
    /// [`ContactDatabase::apply_impulses`](crate::collision::contact::ContactDatabase::apply_impulses)).
    /// Callers that already integrate velocities/positions globally (the
    /// [`Pipeline`](crate::world::Pipeline) tick loop) use this directly to
    /// avoid double-integrating bodies that belong to a solved island.
    pub fn solve_constraints(
        bodies: &mut BodiesSoA,
        contacts: &mut [Contact],
        config: &SolverConfig,
        dt: f32,
    ) -> SolverStepMetrics {
        let mut metrics = SolverStepMetrics::default();

        contacts.sort_by_key(|c| (c.body_a, c.body_b));

        let mut constraints = Self::setup_constraints(bodies, contacts, config, dt);

        if config.warmup_solver {
            Self::warm_start(bodies, &constraints, contacts, config);
        }

        for _ in 0..config.iteration_count {
            for vc in &mut constraints {
                Self::solve_velocity_constraint(bodies, vc, contacts, config, &mut metrics);
            }
        }

        metrics.manifolds_solved = constraints.len();
        metrics
    }

    fn snapshot(bodies: &BodiesSoA, id: EntityId) -> BodySnapshot {
        let b = bodies.get(id).expect("valid body id in constraint setup");
        BodySnapshot {
            position: b.transform().position,
            rotation_inv_inertia: {
                let r = Mat3::from_quat(b.transform().rotation);
                r * b.inverse_inertia() * r.transpose()
            },
            inv_mass: b.inverse_mass(),
            is_static: b.is_static(),
        }
    }

    fn setup_constraints(
        bodies: &BodiesSoA,
        contacts: &[Contact],
        config: &SolverConfig,
        dt: f32,
    ) -> Vec<VelocityConstraint> {
        let mut result = Vec::new();
        let mut i = 0;
        while i < contacts.len() {
            let key = (contacts[i].body_a, contacts[i].body_b);
            let mut j = i;
            while j < contacts.len() && (contacts[j].body_a, contacts[j].body_b) == key {
                j += 1;
            }
            let manifold = &contacts[i..j];
            if let Some(vc) = Self::setup_manifold(bodies, manifold, i, config, dt) {
                result.push(vc);
            }
            i = j;
        }
        result
    }

    fn setup_manifold(
        bodies: &BodiesSoA,
        manifold: &[Contact],
        base_index: usize,
        config: &SolverConfig,
        dt: f32,
    ) -> Option<VelocityConstraint> {
        let first = manifold.first()?;
        let snap_a = Self::snapshot(bodies, first.body_a);
        let snap_b = Self::snapshot(bodies, first.body_b);
        if snap_a.is_static && snap_b.is_static {
            return None;
        }

        let normal = first.normal;
        let tangent = orthonormal_tangents(normal);
        let body_a = bodies.get(first.body_a)?;
        let body_b = bodies.get(first.body_b)?;
        let vel_a = *body_a.velocity();
        let vel_b = *body_b.velocity();

        let mut points = Vec::with_capacity(manifold.len());
        let mut contact_indices = Vec::with_capacity(manifold.len());

        for (offset, contact) in manifold.iter().enumerate() {
            let r1 = contact.point - snap_a.position;
            let r2 = contact.point - snap_b.position;

            let normal_mass_inv = effective_mass_term(snap_a.inv_mass, snap_a.rotation_inv_inertia, r1, normal)
                + effective_mass_term(snap_b.inv_mass, snap_b.rotation_inv_inertia, r2, normal);
            let normal_mass = if normal_mass_inv > 1e-9 {
                1.0 / normal_mass_inv
            } else {
                0.0
            };

            let mut tangent_mass = [0.0f32; 2];
            for (k, t) in tangent.iter().enumerate() {
                let inv = effective_mass_term(snap_a.inv_mass, snap_a.rotation_inv_inertia, r1, *t)
                    + effective_mass_term(snap_b.inv_mass, snap_b.rotation_inv_inertia, r2, *t);
                tangent_mass[k] = if inv > 1e-9 { 1.0 / inv } else { 0.0 };
            }

            let rel_vel = (vel_b.linear + vel_b.angular.cross(r2))
                - (vel_a.linear + vel_a.angular.cross(r1));
            let closing_speed = rel_vel.dot(normal);

            let restitution = if -closing_speed > config.restitution_threshold {
                first.material.restitution
            } else {
                0.0
            };

            let baumgarte_bias = config.baumgarte_constant / dt
                * (contact.depth - config.linear_slop).max(0.0);
            let restitution_bias = -restitution * closing_speed;
            let velocity_bias = baumgarte_bias + restitution_bias;

            points.push(VelocityConstraintPoint {
                r1,
                r2,
                normal_mass,
                tangent_mass,
                velocity_bias,
            });
            contact_indices.push(base_index + offset);
        }

        let block_solve = config.block_solver && points.len() >= 2 && points.len() <= 4;

        Some(VelocityConstraint {
            body_a: first.body_a,
            body_b: first.body_b,
            normal,
            tangent,
            friction: first.material.friction,
            points,
            contact_indices,
            block_solve,
        })
    }

    fn warm_start(
        bodies: &mut BodiesSoA,
        constraints: &[VelocityConstraint],
        contacts: &[Contact],
        config: &SolverConfig,
    ) {
        for vc in constraints {
            let Some((mut a, mut b)) = bodies.get2_mut(vc.body_a, vc.body_b) else {
                continue;
            };
            for (point, &idx) in vc.points.iter().zip(&vc.contact_indices) {
                let c = &contacts[idx];
                let mut impulse = vc.normal * c.normal_impulse;
                if config.warmup_tangent_impulses {
                    impulse += vc.tangent[0] * c.tangent_impulse[0] + vc.tangent[1] * c.tangent_impulse[1];
                }
                apply_impulse_pair(&mut a, &mut b, point.r1, point.r2, impulse);
            }
        }
    }

    fn solve_velocity_constraint(
        bodies: &mut BodiesSoA,
        vc: &mut VelocityConstraint,
        contacts: &mut [Contact],
        config: &SolverConfig,
        metrics: &mut SolverStepMetrics,
    ) {
        let Some((mut a, mut b)) = bodies.get2_mut(vc.body_a, vc.body_b) else {
            return;
        };

        if vc.block_solve {
            if Self::solve_block_normal(&mut a, &mut b, vc, contacts, config) {
                metrics.block_solves += 1;
            } else {
                metrics.block_fallbacks += 1;
                Self::solve_pointwise_normal(&mut a, &mut b, vc, contacts);
            }
        } else {
            Self::solve_pointwise_normal(&mut a, &mut b, vc, contacts);
        }

        for (point, &idx) in vc.points.iter().zip(&vc.contact_indices) {
            let normal_impulse = contacts[idx].normal_impulse;
            friction::solve_tangent_point(
                &mut a,
                &mut b,
                point.r1,
                point.r2,
                vc.tangent,
                point.tangent_mass,
                vc.friction,
                normal_impulse,
                &mut contacts[idx].tangent_impulse,
            );
            metrics.contacts_solved += 1;
            metrics.normal_impulse_sum += contacts[idx].normal_impulse.abs();
            metrics.tangent_impulse_sum += contacts[idx].tangent_impulse[0].abs()
                + contacts[idx].tangent_impulse[1].abs();
        }
    }

    fn solve_pointwise_normal(
        a: &mut crate::core::soa::BodyMut,
        b: &mut crate::core::soa::BodyMut,
        vc: &VelocityConstraint,
        contacts: &mut [Contact],
    ) {
        for (point, &idx) in vc.points.iter().zip(&vc.contact_indices) {
            let rel_vel = (b.velocity.linear + b.velocity.angular.cross(point.r2))
                - (a.velocity.linear + a.velocity.angular.cross(point.r1));
            let vn = rel_vel.dot(vc.normal);

            let lambda = point.normal_mass * (-vn + point.velocity_bias);
            let old_impulse = contacts[idx].normal_impulse;
            let new_impulse = (old_impulse + lambda).max(0.0);
            let delta = new_impulse - old_impulse;
            contacts[idx].normal_impulse = new_impulse;

            let impulse = vc.normal * delta;
            apply_impulse_pair(a, b, point.r1, point.r2, impulse);
        }
    }

    /// Solves the k-point normal LCP `Ax = b + vn, x >= 0, vn >= 0, xᵀvn = 0`
    /// as a block by enumerating sign patterns in the deterministic order of
    /// spec.md §4.5 — empty-set, full-inverse, single-nonzero, pair-nonzero —
    /// accepting the first pattern whose solution is feasible (active
    /// impulses non-negative, inactive separating velocities non-negative).
    /// Returns `false` (signalling a point-wise fallback) if the block's
    /// condition number exceeds `config.max_condition` or no pattern in that
    /// list is feasible.
    fn solve_block_normal(
        a: &mut crate::core::soa::BodyMut,
        b: &mut crate::core::soa::BodyMut,
        vc: &VelocityConstraint,
        contacts: &mut [Contact],
        config: &SolverConfig,
    ) -> bool {
        let n = vc.points.len();
        debug_assert!((2..=4).contains(&n));

        // Build the n x n effective-mass matrix K (coupling between points
        // through the shared rigid bodies) and the current separating
        // velocities + bias for each point.
        let mut k = vec![0.0f32; n * n];
        let mut rhs = vec![0.0f32; n];

        for i in 0..n {
            let pi = &vc.points[i];
            let rel_vel_i = (b.velocity.linear + b.velocity.angular.cross(pi.r2))
                - (a.velocity.linear + a.velocity.angular.cross(pi.r1));
            rhs[i] = -rel_vel_i.dot(vc.normal) + pi.velocity_bias;

            for j in 0..n {
                let pj = &vc.points[j];
                let term_a = if a.flags.is_static || !a.flags.dynamic {
                    0.0
                } else {
                    let rn_i = pi.r1.cross(vc.normal);
                    let rn_j = pj.r1.cross(vc.normal);
                    *a.inverse_mass + rn_i.dot((*a.inverse_inertia) * rn_j)
                };
                let term_b = if b.flags.is_static || !b.flags.dynamic {
                    0.0
                } else {
                    let rn_i = pi.r2.cross(vc.normal);
                    let rn_j = pj.r2.cross(vc.normal);
                    *b.inverse_mass + rn_i.dot((*b.inverse_inertia) * rn_j)
                };
                k[i * n + j] = term_a + term_b;
            }
        }

        if condition_estimate(&k, n) > config.max_condition {
            return false;
        }

        for active in block_sign_patterns(n) {
            let Some(x) = solve_active_set(&k, &rhs, n, &active) else {
                continue;
            };
            for i in 0..n {
                let idx = vc.contact_indices[i];
                let old = contacts[idx].normal_impulse;
                let delta = x[i] - old;
                contacts[idx].normal_impulse = x[i];
                let impulse = vc.normal * delta;
                apply_impulse_pair(a, b, vc.points[i].r1, vc.points[i].r2, impulse);
            }
            return true;
        }

        // No sign pattern in the enumerated list is feasible; fall back to
        // point-wise PGS for this iteration.
        false
    }

    /// Accumulates (or resets) each awake body's time-below-threshold,
    /// the input [`IslandDatabase`](crate::dynamics::island::IslandDatabase)
    /// sleep decisions are taken from.
    pub fn update_sleep_timers(bodies: &mut BodiesSoA, config: &SolverConfig, dt: f32) {
        for mut body in bodies.iter_mut() {
            if body.is_static() || !body.flags.awake {
                continue;
            }
            let below_threshold = body.velocity.linear.length_squared() < config.sleep_lin_sq
                && body.velocity.angular.length_squared() < config.sleep_ang_sq;
            if below_threshold {
                *body.low_velocity_time += dt;
            } else {
                *body.low_velocity_time = 0.0;
            }
        }
    }
}

fn orthonormal_tangents(normal: Vec3) -> [Vec3; 2] {
    let (t1, t2) = normal.any_orthonormal_pair();
    [t1, t2]
}

fn apply_impulse_pair(
    a: &mut crate::core::soa::BodyMut,
    b: &mut crate::core::soa::BodyMut,
    r1: Vec3,
    r2: Vec3,
    impulse: Vec3,
) {
    if !(a.flags.is_static || !a.flags.dynamic) {
        a.velocity.linear -= impulse * (*a.inverse_mass);
        a.velocity.angular -= (*a.inverse_inertia) * r1.cross(impulse);
    }
    if !(b.flags.is_static || !b.flags.dynamic) {
        b.velocity.linear += impulse * (*b.inverse_mass);
        b.velocity.angular += (*b.inverse_inertia) * r2.cross(impulse);
    }
}

/// Gaussian elimination with partial pivoting for small dense systems (n <= 4).
fn solve_linear(a: &[f32], rhs: &[f32], n: usize) -> Option<Vec<f32>> {
    let mut m: Vec<f32> = a.to_vec();
    let mut x: Vec<f32> = rhs.to_vec();

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = m[col * n + col].abs();
        for row in (col + 1)..n {
            let v = m[row * n + col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = row;
            }
        }
        if pivot_val < 1e-9 {
            return None;
        }
        if pivot_row != col {
            for c in 0..n {
                m.swap(col * n + c, pivot_row * n + c);
            }
            x.swap(col, pivot_row);
        }

        let pivot = m[col * n + col];
        for row in (col + 1)..n {
            let factor = m[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                m[row * n + c] -= factor * m[col * n + c];
            }
            x[row] -= factor * x[col];
        }
    }

    let mut result = vec![0.0f32; n];
    for row in (0..n).rev() {
        let mut sum = x[row];
        for c in (row + 1)..n {
            sum -= m[row * n + c] * result[c];
        }
        result[row] = sum / m[row * n + row];
    }
    Some(result)
}

/// Active-set sign patterns tried by [`PgsSolver::solve_block_normal`], in
/// the deterministic order of spec.md §4.5: empty-set, full-inverse,
/// single-nonzero (one index active at a time), pair-nonzero (two indices
/// active at a time, only needed once `n` exceeds 2 since a 2-active subset
/// of an `n == 2` block is just the full-inverse case already tried).
fn block_sign_patterns(n: usize) -> Vec<Vec<usize>> {
    let mut patterns = vec![Vec::new(), (0..n).collect()];
    for i in 0..n {
        patterns.push(vec![i]);
    }
    if n >= 3 {
        for i in 0..n {
            for j in (i + 1)..n {
                patterns.push(vec![i, j]);
            }
        }
    }
    patterns
}

/// Solves the LCP sub-problem for one active set: the indices in `active`
/// are assumed to carry a non-negative impulse (`K_active x = rhs_active`),
/// every other index is assumed to be separating (`x_i = 0`). Returns the
/// full-length impulse vector (zero outside `active`) if both feasibility
/// conditions hold — active impulses non-negative, inactive separating
/// velocities `Kx - rhs` non-negative — else `None`.
fn solve_active_set(k: &[f32], rhs: &[f32], n: usize, active: &[usize]) -> Option<Vec<f32>> {
    if active.is_empty() {
        return (0..n).all(|i| rhs[i] <= 0.0).then(|| vec![0.0f32; n]);
    }

    let m = active.len();
    let mut sub_k = vec![0.0f32; m * m];
    let mut sub_rhs = vec![0.0f32; m];
    for (ii, &i) in active.iter().enumerate() {
        sub_rhs[ii] = rhs[i];
        for (jj, &j) in active.iter().enumerate() {
            sub_k[ii * m + jj] = k[i * n + j];
        }
    }

    let sub_x = solve_linear(&sub_k, &sub_rhs, m)?;
    if sub_x.iter().any(|&v| v < 0.0) {
        return None;
    }

    let mut x = vec![0.0f32; n];
    for (ii, &i) in active.iter().enumerate() {
        x[i] = sub_x[ii];
    }

    for i in 0..n {
        if active.contains(&i) {
            continue;
        }
        let vn: f32 = (0..n).map(|j| k[i * n + j] * x[j]).sum::<f32>() - rhs[i];
        if vn < 0.0 {
            return None;
        }
    }

    Some(x)
}

/// Cheap condition-number proxy: ratio of the largest to smallest diagonal
/// magnitude after the matrix is symmetrized. Diagonally-dominant blocks
/// (the common case for contact manifolds) are well approximated by this;
/// anything above `max_condition` is treated as ill-conditioned and falls
/// back to point-wise PGS rather than risking a near-singular solve.
fn condition_estimate(k: &[f32], n: usize) -> f32 {
    let mut max_diag = 0.0f32;
    let mut min_diag = f32::INFINITY;
    for i in 0..n {
        let d = k[i * n + i].abs();
        max_diag = max_diag.max(d);
        min_diag = min_diag.min(d);
    }
    if min_diag < 1e-9 {
        return f32::INFINITY;
    }
    max_diag / min_diag
}

/// Group key helper used by [`crate::collision::contact`] when it hands a
/// flat contact list to the solver island-by-island.
pub fn group_by_pair(contacts: &[Contact]) -> HashMap<(EntityId, EntityId), Vec<usize>> {
    let mut map: HashMap<(EntityId, EntityId), Vec<usize>> = HashMap::new();
    for (i, c) in contacts.iter().enumerate() {
        map.entry((c.body_a, c.body_b)).or_default().push(i);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBody;
    use crate::core::types::MaterialPairProperties;
    use crate::utils::allocator::EntityId;

    fn setup_sphere_on_floor() -> (BodiesSoA, EntityId, EntityId) {
        let mut bodies = BodiesSoA::new();
        let floor = RigidBody::builder().position(Vec3::ZERO).is_static(true).build();
        let floor_id = bodies.insert(floor);

        let ball = RigidBody::builder()
            .position(Vec3::new(0.0, 0.99, 0.0))
            .mass(1.0)
            .velocity(Vec3::new(0.0, -1.0, 0.0), Vec3::ZERO)
            .build();
        let ball_id = bodies.insert(ball);
        (bodies, floor_id, ball_id)
    }

    #[test]
    fn resting_contact_stops_penetration_velocity() {
        let (mut bodies, floor_id, ball_id) = setup_sphere_on_floor();
        let mut contacts = vec![Contact::new(
            floor_id,
            ball_id,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::Y,
            0.01,
            0,
            MaterialPairProperties { friction: 0.5, restitution: 0.0 },
        )];
        let config = SolverConfig::default();
        PgsSolver::solve_island(&mut bodies, &mut contacts, &config, 1.0 / 60.0);

        let ball = bodies.get(ball_id).unwrap();
        assert!(ball.velocity().linear.y >= -1e-3);
    }

    #[test]
    fn warm_started_normal_impulse_persists_across_ticks() {
        let (mut bodies, floor_id, ball_id) = setup_sphere_on_floor();
        let mut contacts = vec![Contact::new(
            floor_id,
            ball_id,
            Vec3::ZERO,
            Vec3::Y,
            0.01,
            0,
            MaterialPairProperties { friction: 0.5, restitution: 0.0 },
        )];
        let config = SolverConfig::default();
        PgsSolver::solve_island(&mut bodies, &mut contacts, &config, 1.0 / 60.0);
        assert!(contacts[0].normal_impulse > 0.0);
    }

    #[test]
    fn linear_solve_matches_hand_computed_2x2() {
        let k = [2.0, 0.0, 0.0, 2.0];
        let rhs = [4.0, 6.0];
        let x = solve_linear(&k, &rhs, 2).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-4);
        assert!((x[1] - 3.0).abs() < 1e-4);
    }
}
