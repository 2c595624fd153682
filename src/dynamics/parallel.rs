//! Task layer: a fixed worker pool used for two shapes of parallel work,
//! parallel-range over narrow-phase candidate pairs and task-stream over
//! independent awake islands. No locks are taken; each island job owns a
//! private clone of the bodies its contacts touch (static bodies shared
//! across islands are cloned once per job rather than aliased), so
//! concurrent per-island solves never hand out two live `&mut` references
//! into the same memory and are sound without `unsafe`. Island results are
//! merged back into the shared body store sequentially on the calling
//! thread once every job has finished. Completion is tracked with a plain
//! atomic counter rather than any synchronization primitive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::soa::BodiesSoA;
use crate::dynamics::solver::{Contact, PgsSolver, SolverConfig, SolverStepMetrics};
use crate::utils::allocator::EntityId;

/// One awake island's solve, entirely self-contained: its own `BodiesSoA`
/// (populated with clones of every body its `contacts` reference) plus the
/// id remapping needed to write results back into the shared store.
struct IslandJob {
    island_id: u32,
    bodies: BodiesSoA,
    /// Original id (in the shared store) -> local id (in `bodies`).
    id_map: HashMap<EntityId, EntityId>,
    /// Local id -> original id, the inverse of `id_map`.
    rev_map: HashMap<EntityId, EntityId>,
    contacts: Vec<Contact>,
}

/// Builds an [`IslandJob`] for `contacts`, cloning every body they reference
/// out of `source` and remapping each contact's body ids to the job's own
/// local ids. Returns `None` if a referenced body no longer exists.
fn build_island_job(island_id: u32, contacts: Vec<Contact>, source: &BodiesSoA) -> Option<IslandJob> {
    let mut bodies = BodiesSoA::new();
    let mut id_map = HashMap::new();
    let mut rev_map = HashMap::new();

    let local_id_for = |id: EntityId,
                             bodies: &mut BodiesSoA,
                             id_map: &mut HashMap<EntityId, EntityId>,
                             rev_map: &mut HashMap<EntityId, EntityId>|
     -> Option<EntityId> {
        if let Some(&local) = id_map.get(&id) {
            return Some(local);
        }
        let clone = source.get(id)?.to_rigid_body();
        let local_id = bodies.insert(clone);
        id_map.insert(id, local_id);
        rev_map.insert(local_id, id);
        Some(local_id)
    };

    let mut mapped_contacts = Vec::with_capacity(contacts.len());
    for mut contact in contacts {
        let local_a = local_id_for(contact.body_a, &mut bodies, &mut id_map, &mut rev_map)?;
        let local_b = local_id_for(contact.body_b, &mut bodies, &mut id_map, &mut rev_map)?;
        contact.body_a = local_a;
        contact.body_b = local_b;
        mapped_contacts.push(contact);
    }

    Some(IslandJob {
        island_id,
        bodies,
        id_map,
        rev_map,
        contacts: mapped_contacts,
    })
}

pub struct TaskLayer {
    completed: AtomicUsize,
}

impl Default for TaskLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLayer {
    pub fn new() -> Self {
        Self {
            completed: AtomicUsize::new(0),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Parallel-range: maps `f` over `items`, preserving input order in the
    /// returned vector regardless of which worker processed which item.
    #[cfg(feature = "parallel")]
    pub fn parallel_range<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        use rayon::prelude::*;
        let results: Vec<R> = items.par_iter().map(|item| f(item)).collect();
        self.completed.fetch_add(items.len(), Ordering::Relaxed);
        results
    }

    #[cfg(not(feature = "parallel"))]
    pub fn parallel_range<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        F: Fn(&T) -> R,
    {
        let results: Vec<R> = items.iter().map(&f).collect();
        self.completed.fetch_add(items.len(), Ordering::Relaxed);
        results
    }

    /// Task-stream: solves every `(island_id, contacts)` group concurrently,
    /// then merges per-island metrics back in ascending island-id order so
    /// the merged totals never depend on worker scheduling.
    pub fn solve_islands(
        &self,
        bodies: &mut BodiesSoA,
        mut island_contacts: Vec<(u32, Vec<Contact>)>,
        config: &SolverConfig,
        dt: f32,
    ) -> (Vec<(u32, Vec<Contact>)>, SolverStepMetrics) {
        island_contacts.sort_by_key(|(id, _)| *id);

        #[cfg(feature = "parallel")]
        {
            let mut jobs: Vec<IslandJob> = island_contacts
                .into_iter()
                .filter_map(|(island_id, contacts)| build_island_job(island_id, contacts, bodies))
                .collect();

            let results: Vec<SolverStepMetrics> = {
                use rayon::prelude::*;
                jobs.par_iter_mut()
                    .map(|job| PgsSolver::solve_constraints(&mut job.bodies, &mut job.contacts, config, dt))
                    .collect()
            };
            self.completed.fetch_add(jobs.len(), Ordering::Relaxed);

            let mut merged = SolverStepMetrics::default();
            for m in &results {
                merged.merge(m);
            }

            let mut island_contacts = Vec::with_capacity(jobs.len());
            for job in jobs {
                for (&orig_id, &local_id) in &job.id_map {
                    let Some(local_body) = job.bodies.get(local_id) else { continue };
                    let velocity = *local_body.velocity();
                    if let Some(mut orig_body) = bodies.get_mut(orig_id) {
                        *orig_body.velocity = velocity;
                    }
                }
                let mut contacts = job.contacts;
                for c in &mut contacts {
                    c.body_a = job.rev_map[&c.body_a];
                    c.body_b = job.rev_map[&c.body_b];
                }
                island_contacts.push((job.island_id, contacts));
            }

            (island_contacts, merged)
        }

        #[cfg(not(feature = "parallel"))]
        {
            let mut merged = SolverStepMetrics::default();
            for (_, contacts) in island_contacts.iter_mut() {
                let m = PgsSolver::solve_constraints(bodies, contacts, config, dt);
                merged.merge(&m);
            }
            self.completed.fetch_add(island_contacts.len(), Ordering::Relaxed);
            (island_contacts, merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_range_preserves_order() {
        let layer = TaskLayer::new();
        let items: Vec<i32> = (0..64).collect();
        let doubled = layer.parallel_range(&items, |x| x * 2);
        assert_eq!(doubled, items.iter().map(|x| x * 2).collect::<Vec<_>>());
        assert_eq!(layer.completed_count(), 64);
    }
}
