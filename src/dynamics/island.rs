//! Persistent island database.
//!
//! Bodies connected by at least one contact are kept in the same island so
//! the solver and sleep logic can operate on independent components without
//! re-deriving connectivity from scratch every tick. Islands are built up
//! incrementally as contacts are added (`add_contact_to_island`), merged when
//! two islands turn out to share a contact, and split back apart via
//! connected-components when enough contacts have broken that an island may
//! no longer be a single connected piece.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::utils::allocator::EntityId;

/// Sentinel meaning "this body has no island assigned yet".
pub const ISLAND_NULL: u32 = u32::MAX;
/// Sentinel meaning "this body is static/kinematic and does not itself own
/// an island" (a static body may be touched by many islands at once).
pub const ISLAND_STATIC: u32 = u32::MAX - 1;

/// The island is awake and should be solved this tick.
pub const ISLAND_AWAKE: u8 = 1 << 0;
/// A body in the island recently woke up; its low-velocity timers were reset
/// and `ISLAND_TRY_SLEEP` should not fire until they re-accumulate.
pub const ISLAND_SLEEP_RESET: u8 = 1 << 1;
/// A contact in the island broke this tick; the island is a split candidate
/// and should be re-partitioned by `IslandDatabase::split`.
pub const ISLAND_SPLIT: u8 = 1 << 2;
/// Every body in the island has been below the sleep thresholds for at least
/// `sleep_time_threshold`; the island should be put to sleep this tick.
pub const ISLAND_TRY_SLEEP: u8 = 1 << 3;

/// A contact edge between two bodies, keyed the same way the contact
/// database keys its hash map: `(min(a, b), max(a, b))`.
pub type BodyPairKey = (EntityId, EntityId);

pub fn pair_key(a: EntityId, b: EntityId) -> BodyPairKey {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Default)]
pub struct Island {
    pub bodies: Vec<EntityId>,
    pub contacts: Vec<BodyPairKey>,
    pub flags: u8,
}

impl Island {
    pub fn is_awake(&self) -> bool {
        self.flags & ISLAND_AWAKE != 0
    }
}

/// Persistent store of islands, indexed by a dense, reused id space.
///
/// Mirrors the original engine's `island_database`: a pool of island slots
/// with a free list for reuse, plus a map from body to the island (or
/// sentinel) it currently belongs to.
#[derive(Default)]
pub struct IslandDatabase {
    islands: Vec<Option<Island>>,
    free_list: VecDeque<u32>,
    body_island: HashMap<EntityId, u32>,
    /// Islands tagged `ISLAND_SPLIT` this tick, awaiting `run_splits`.
    split_candidates: HashSet<u32>,
}

impl IslandDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn island(&self, id: u32) -> Option<&Island> {
        self.islands.get(id as usize).and_then(|slot| slot.as_ref())
    }

    pub fn island_mut(&mut self, id: u32) -> Option<&mut Island> {
        self.islands.get_mut(id as usize).and_then(|slot| slot.as_mut())
    }

    pub fn island_of(&self, body: EntityId) -> u32 {
        self.body_island.get(&body).copied().unwrap_or(ISLAND_NULL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Island)> {
        self.islands
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|island| (i as u32, island)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut Island)> {
        self.islands
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|island| (i as u32, island)))
    }

    fn alloc(&mut self, island: Island) -> u32 {
        if let Some(id) = self.free_list.pop_front() {
            self.islands[id as usize] = Some(island);
            id
        } else {
            let id = self.islands.len() as u32;
            self.islands.push(Some(island));
            id
        }
    }

    fn free(&mut self, id: u32) {
        if let Some(island) = self.islands.get_mut(id as usize) {
            if let Some(removed) = island.take() {
                for body in &removed.bodies {
                    self.body_island.remove(body);
                }
            }
            self.free_list.push_back(id);
        }
        self.split_candidates.remove(&id);
    }

    /// Creates a fresh single-body island, used when a dynamic body first
    /// gains a contact and has no island of its own yet.
    pub fn init_island_from_body(&mut self, body: EntityId) -> u32 {
        let id = self.alloc(Island {
            bodies: vec![body],
            contacts: Vec::new(),
            flags: ISLAND_AWAKE,
        });
        self.body_island.insert(body, id);
        id
    }

    /// Drops a body from island bookkeeping entirely (used when a body is
    /// removed from the world).
    pub fn remove_body(&mut self, body: EntityId) {
        if let Some(id) = self.body_island.remove(&body) {
            if let Some(island) = self.island_mut(id) {
                island.bodies.retain(|&b| b != body);
                island.contacts.retain(|(a, c)| *a != body && *c != body);
                if island.bodies.is_empty() {
                    self.free(id);
                }
            }
        }
    }

    /// Registers a new contact between two bodies, creating, growing, or
    /// merging islands as needed. Static bodies never own an island and may
    /// be "duplicated" across every island that touches them.
    pub fn add_contact_to_island(
        &mut self,
        a: EntityId,
        b: EntityId,
        a_static: bool,
        b_static: bool,
    ) {
        if a_static && b_static {
            // Two static/kinematic bodies never share a solvable island.
            return;
        }

        let key = pair_key(a, b);

        if a_static || b_static {
            let (dynamic, static_body) = if a_static { (b, a) } else { (a, b) };
            let island_id = match self.island_of(dynamic) {
                ISLAND_NULL => self.init_island_from_body(dynamic),
                id => id,
            };
            if let Some(island) = self.island_mut(island_id) {
                if !island.contacts.contains(&key) {
                    island.contacts.push(key);
                }
                // The static body is shared across every island that
                // references it, so it's added to `bodies` here but never
                // registered in `body_island` (which tracks sole ownership
                // for dynamic bodies only).
                if !island.bodies.contains(&static_body) {
                    island.bodies.push(static_body);
                }
            }
            return;
        }

        let island_a = self.island_of(a);
        let island_b = self.island_of(b);

        let merged_id = match (island_a, island_b) {
            (ISLAND_NULL, ISLAND_NULL) => {
                let id = self.init_island_from_body(a);
                self.body_island.insert(b, id);
                if let Some(island) = self.island_mut(id) {
                    island.bodies.push(b);
                }
                id
            }
            (ISLAND_NULL, id) => {
                self.body_island.insert(a, id);
                if let Some(island) = self.island_mut(id) {
                    island.bodies.push(a);
                }
                id
            }
            (id, ISLAND_NULL) => {
                self.body_island.insert(b, id);
                if let Some(island) = self.island_mut(id) {
                    island.bodies.push(b);
                }
                id
            }
            (ida, idb) if ida == idb => ida,
            (ida, idb) => self.merge(ida, idb),
        };

        if let Some(island) = self.island_mut(merged_id) {
            if !island.contacts.contains(&key) {
                island.contacts.push(key);
            }
            island.flags |= ISLAND_AWAKE;
            island.flags &= !ISLAND_TRY_SLEEP;
        }
    }

    /// Merges the smaller island into the larger, keeping the larger's id
    /// (minimizes how many bodies need their `body_island` entry rewritten).
    pub fn merge(&mut self, ida: u32, idb: u32) -> u32 {
        if ida == idb {
            return ida;
        }
        let len_a = self.island(ida).map(|i| i.bodies.len()).unwrap_or(0);
        let len_b = self.island(idb).map(|i| i.bodies.len()).unwrap_or(0);
        let (keep, drop) = if len_a >= len_b { (ida, idb) } else { (idb, ida) };

        if let Some(dropped) = self.islands.get_mut(drop as usize).and_then(|s| s.take()) {
            self.free_list.push_back(drop);
            self.split_candidates.remove(&drop);
            for body in &dropped.bodies {
                self.body_island.insert(*body, keep);
            }
            if let Some(keep_island) = self.island_mut(keep) {
                keep_island.bodies.extend(dropped.bodies);
                for contact in dropped.contacts {
                    if !keep_island.contacts.contains(&contact) {
                        keep_island.contacts.push(contact);
                    }
                }
                keep_island.flags |= ISLAND_AWAKE;
                keep_island.flags &= !ISLAND_TRY_SLEEP;
            }
        }
        keep
    }

    /// Marks an island as a split candidate because one of its contacts
    /// broke this tick. The actual connected-components pass runs later via
    /// `run_splits`, once all contact removals for the tick are known.
    pub fn tag_for_splitting(&mut self, id: u32) {
        if let Some(island) = self.island_mut(id) {
            island.flags |= ISLAND_SPLIT;
        }
        self.split_candidates.insert(id);
    }

    pub fn remove_contact(&mut self, a: EntityId, b: EntityId) {
        let key = pair_key(a, b);
        let id_a = self.island_of(a);
        let id_b = self.island_of(b);
        let id = if id_a != ISLAND_NULL && id_a != ISLAND_STATIC {
            id_a
        } else {
            id_b
        };
        if id == ISLAND_NULL || id == ISLAND_STATIC {
            return;
        }
        if let Some(island) = self.island_mut(id) {
            island.contacts.retain(|c| *c != key);
        }
        self.tag_for_splitting(id);
    }

    /// Runs connected-components over every split candidate island and
    /// partitions it back into one island per connected component. The
    /// largest resulting component keeps the original id; the rest are
    /// allocated fresh ids. Static bodies are duplicated into every
    /// component that still references them via a surviving contact.
    pub fn run_splits(&mut self) -> Vec<(u32, Vec<u32>)> {
        let candidates: Vec<u32> = self.split_candidates.drain().collect();
        let mut results = Vec::new();

        for id in candidates {
            let Some(island) = self.islands.get_mut(id as usize).and_then(|s| s.take()) else {
                continue;
            };
            self.free_list.push_back(id);

            let mut adjacency: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
            for &(a, b) in &island.contacts {
                adjacency.entry(a).or_default().push(b);
                adjacency.entry(b).or_default().push(a);
            }

            let mut visited: HashSet<EntityId> = HashSet::new();
            let mut components: Vec<Vec<EntityId>> = Vec::new();
            for &body in &island.bodies {
                if visited.contains(&body) {
                    continue;
                }
                let mut stack = vec![body];
                let mut component = Vec::new();
                while let Some(node) = stack.pop() {
                    if !visited.insert(node) {
                        continue;
                    }
                    component.push(node);
                    if let Some(neighbors) = adjacency.get(&node) {
                        stack.extend(neighbors.iter().copied());
                    }
                }
                components.push(component);
            }

            if components.len() <= 1 {
                // Nothing actually split; restore the island unchanged.
                let restored_id = self.alloc(island.clone());
                for body in &island.bodies {
                    self.body_island.insert(*body, restored_id);
                }
                // Keep the original id where possible by swapping.
                if restored_id != id {
                    self.islands.swap(id as usize, restored_id as usize);
                    self.free_list.retain(|&x| x != id);
                    self.free_list.push_back(restored_id);
                    for body in &island.bodies {
                        self.body_island.insert(*body, id);
                    }
                }
                results.push((id, vec![id]));
                continue;
            }

            components.sort_by_key(|c| std::cmp::Reverse(c.len()));
            let mut new_ids = Vec::with_capacity(components.len());

            for (i, component) in components.into_iter().enumerate() {
                let component_set: HashSet<EntityId> = component.iter().copied().collect();
                let contacts: Vec<BodyPairKey> = island
                    .contacts
                    .iter()
                    .copied()
                    .filter(|(a, b)| component_set.contains(a) && component_set.contains(b))
                    .collect();

                let new_island = Island {
                    bodies: component.clone(),
                    contacts,
                    flags: ISLAND_AWAKE,
                };

                let assigned_id = if i == 0 {
                    // Largest component reuses the original id.
                    self.islands[id as usize] = Some(new_island);
                    self.free_list.retain(|&x| x != id);
                    id
                } else {
                    self.alloc(new_island)
                };

                for body in &component {
                    self.body_island.insert(*body, assigned_id);
                }
                new_ids.push(assigned_id);
            }

            results.push((id, new_ids));
        }

        results
    }

    pub fn set_awake(&mut self, id: u32, awake: bool) {
        if let Some(island) = self.island_mut(id) {
            if awake {
                island.flags |= ISLAND_AWAKE | ISLAND_SLEEP_RESET;
                island.flags &= !ISLAND_TRY_SLEEP;
            } else {
                island.flags &= !(ISLAND_AWAKE | ISLAND_TRY_SLEEP);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.islands.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::allocator::GenerationalId;

    fn eid(i: usize) -> EntityId {
        EntityId(GenerationalId::new(i, 0))
    }

    #[test]
    fn two_dynamic_bodies_share_an_island() {
        let mut db = IslandDatabase::new();
        db.add_contact_to_island(eid(0), eid(1), false, false);
        let id = db.island_of(eid(0));
        assert_eq!(id, db.island_of(eid(1)));
        assert_eq!(db.island(id).unwrap().bodies.len(), 2);
    }

    #[test]
    fn merging_two_islands_keeps_the_larger_id() {
        let mut db = IslandDatabase::new();
        db.add_contact_to_island(eid(0), eid(1), false, false);
        db.add_contact_to_island(eid(2), eid(3), false, false);
        db.add_contact_to_island(eid(3), eid(4), false, false);
        let big = db.island_of(eid(2));

        db.add_contact_to_island(eid(1), eid(2), false, false);
        let merged = db.island_of(eid(0));
        assert_eq!(merged, big);
        assert_eq!(db.island(merged).unwrap().bodies.len(), 5);
    }

    #[test]
    fn static_bodies_never_own_an_island() {
        let mut db = IslandDatabase::new();
        db.add_contact_to_island(eid(0), eid(1), false, true);
        assert_eq!(db.island_of(eid(1)), ISLAND_NULL);
        assert_ne!(db.island_of(eid(0)), ISLAND_NULL);
    }

    #[test]
    fn removing_the_bridging_contact_splits_the_island() {
        let mut db = IslandDatabase::new();
        db.add_contact_to_island(eid(0), eid(1), false, false);
        db.add_contact_to_island(eid(1), eid(2), false, false);
        let id = db.island_of(eid(0));
        assert_eq!(db.island(id).unwrap().bodies.len(), 3);

        db.remove_contact(eid(1), eid(2));
        let splits = db.run_splits();
        assert_eq!(splits.len(), 1);
        let (_, new_ids) = &splits[0];
        assert_eq!(new_ids.len(), 2);
        assert_ne!(db.island_of(eid(0)), db.island_of(eid(2)));
    }
}
