//! Persistent contact database.
//!
//! A hash map keyed by ordered body-pair backs a pool of contact records;
//! two 64-bit-block bit vectors (`persistent`, `frame`) track which records
//! were alive as of last tick versus touched by this tick's narrow-phase.
//! `end_frame` computes `broken = persistent AND NOT frame` to find contacts
//! that silently stopped being produced (the pair separated, or one body was
//! removed) without the caller having to diff two full contact lists.
//! Bodies reference their contacts only indirectly through the island
//! database's own contact lists (`dynamics::island`); this module keeps the
//! manifold data (points, warm-start impulses, material) that the solver
//! reads and writes back each tick.
//!
//! The SAT cache is a second, separately-aged pool keyed by the same pair,
//! reserved for the hull-hull separating axis found last tick (a cheap
//! starting guess for the next SAT query); entries not refreshed for
//! `sat_cache_max_age` ticks are reclaimed.

use std::collections::HashMap;

use glam::Vec3;

use crate::core::soa::BodiesSoA;
use crate::dynamics::island::{pair_key, BodyPairKey};
use crate::dynamics::solver::Contact;
use crate::utils::allocator::EntityId;

const MAX_MANIFOLD_POINTS: usize = 4;
const DEFAULT_SAT_CACHE_MAX_AGE: u32 = 16;

/// Growable vector of 64-bit blocks addressed by a dense record index.
#[derive(Debug, Clone, Default)]
struct BitSet {
    blocks: Vec<u64>,
}

impl BitSet {
    fn ensure(&mut self, index: usize) {
        let block = index / 64;
        if block >= self.blocks.len() {
            self.blocks.resize(block + 1, 0);
        }
    }

    fn set(&mut self, index: usize) {
        self.ensure(index);
        self.blocks[index / 64] |= 1u64 << (index % 64);
    }

    fn clear(&mut self, index: usize) {
        if index / 64 < self.blocks.len() {
            self.blocks[index / 64] &= !(1u64 << (index % 64));
        }
    }

    fn get(&self, index: usize) -> bool {
        self.blocks
            .get(index / 64)
            .map(|b| b & (1u64 << (index % 64)) != 0)
            .unwrap_or(false)
    }

    fn clear_all(&mut self) {
        self.blocks.iter_mut().for_each(|b| *b = 0);
    }

    /// Indices set in `self` but not in `other`, iterated block-at-a-time.
    fn and_not(&self, other: &BitSet) -> Vec<usize> {
        let mut out = Vec::new();
        for (block_index, &block) in self.blocks.iter().enumerate() {
            let other_block = other.blocks.get(block_index).copied().unwrap_or(0);
            let mut bits = block & !other_block;
            while bits != 0 {
                let bit = bits.trailing_zeros();
                out.push(block_index * 64 + bit as usize);
                bits &= bits - 1;
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
struct ManifoldPoint {
    feature_id: u64,
    point: Vec3,
    normal: Vec3,
    depth: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct ContactRecord {
    pub body_a: EntityId,
    pub body_b: EntityId,
    points: Vec<ManifoldPoint>,
}

impl ContactRecord {
    fn new(body_a: EntityId, body_b: EntityId) -> Self {
        Self {
            body_a,
            body_b,
            points: Vec::new(),
        }
    }

    /// Merges freshly generated points into the persisted set, carrying
    /// forward accumulated impulses for points whose `feature_id` survives
    /// and dropping ones that don't (the warm-start cache).
    fn update(&mut self, fresh: &[Contact]) {
        let mut updated = Vec::with_capacity(fresh.len());
        for contact in fresh {
            let carried = self
                .points
                .iter()
                .find(|p| p.feature_id == contact.feature_id);
            updated.push(ManifoldPoint {
                feature_id: contact.feature_id,
                point: contact.point,
                normal: contact.normal,
                depth: contact.depth,
                normal_impulse: carried.map(|p| p.normal_impulse).unwrap_or(0.0),
                tangent_impulse: carried.map(|p| p.tangent_impulse).unwrap_or([0.0, 0.0]),
            });
        }
        if updated.len() > MAX_MANIFOLD_POINTS {
            updated.sort_unstable_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap());
            updated.truncate(MAX_MANIFOLD_POINTS);
        }
        self.points = updated;
    }

    fn to_contacts(
        &self,
        material: crate::core::types::MaterialPairProperties,
        warmup_tangent_impulses: bool,
    ) -> Vec<Contact> {
        self.points
            .iter()
            .map(|p| {
                let mut contact = Contact::new(
                    self.body_a,
                    self.body_b,
                    p.point,
                    p.normal,
                    p.depth,
                    p.feature_id,
                    material,
                );
                contact.normal_impulse = p.normal_impulse;
                if warmup_tangent_impulses {
                    contact.tangent_impulse = p.tangent_impulse;
                }
                contact
            })
            .collect()
    }

    fn apply_impulses(&mut self, contact: &Contact) {
        if let Some(p) = self.points.iter_mut().find(|p| p.feature_id == contact.feature_id) {
            p.normal_impulse = contact.normal_impulse;
            p.tangent_impulse = contact.tangent_impulse;
        }
    }
}

struct SatCacheEntry {
    axis: Vec3,
    last_touched: u32,
}

pub struct ContactDatabase {
    records: Vec<Option<ContactRecord>>,
    free_list: Vec<u32>,
    index_of: HashMap<BodyPairKey, u32>,
    persistent: BitSet,
    frame: BitSet,
    sat_cache: HashMap<BodyPairKey, SatCacheEntry>,
    sat_cache_max_age: u32,
    tick: u32,
}

impl Default for ContactDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactDatabase {
    pub fn new() -> Self {
        Self::with_sat_cache_max_age(DEFAULT_SAT_CACHE_MAX_AGE)
    }

    pub fn with_sat_cache_max_age(sat_cache_max_age: u32) -> Self {
        Self {
            records: Vec::new(),
            free_list: Vec::new(),
            index_of: HashMap::new(),
            persistent: BitSet::default(),
            frame: BitSet::default(),
            sat_cache: HashMap::new(),
            sat_cache_max_age,
            tick: 0,
        }
    }

    fn alloc(&mut self, key: BodyPairKey) -> u32 {
        if let Some(index) = self.free_list.pop() {
            self.records[index as usize] = Some(ContactRecord::new(key.0, key.1));
            index
        } else {
            let index = self.records.len() as u32;
            self.records.push(Some(ContactRecord::new(key.0, key.1)));
            index
        }
    }

    /// Adds fresh narrow-phase points for `(a, b)`, allocating a record if
    /// this is a new pair. Marks the record's frame bit; never duplicates
    /// a record for the same pair.
    pub fn add(&mut self, a: EntityId, b: EntityId, points: &[Contact]) {
        if points.is_empty() {
            return;
        }
        let key = pair_key(a, b);
        let index = *self
            .index_of
            .entry(key)
            .or_insert_with(|| self.records.len() as u32);
        if self.records.get(index as usize).map(|r| r.is_none()).unwrap_or(true) {
            let allocated = self.alloc(key);
            self.index_of.insert(key, allocated);
            self.records[allocated as usize].as_mut().unwrap().update(points);
            self.frame.set(allocated as usize);
            return;
        }
        self.records[index as usize].as_mut().unwrap().update(points);
        self.frame.set(index as usize);
    }

    /// Whether a record already exists for `(a, b)` (from a prior tick or
    /// earlier this tick).
    pub fn contains(&self, a: EntityId, b: EntityId) -> bool {
        self.index_of.contains_key(&pair_key(a, b))
    }

    /// Unlinks and frees the record for `(a, b)`, if any.
    pub fn remove(&mut self, a: EntityId, b: EntityId) {
        let key = pair_key(a, b);
        if let Some(index) = self.index_of.remove(&key) {
            self.records[index as usize] = None;
            self.free_list.push(index);
            self.persistent.clear(index as usize);
            self.frame.clear(index as usize);
        }
        self.sat_cache.remove(&key);
    }

    /// Drops every contact touching `body` (used when a body is removed
    /// from the world), returning the peer bodies whose pairs were dropped.
    pub fn remove_body(&mut self, body: EntityId) -> Vec<EntityId> {
        let stale: Vec<BodyPairKey> = self
            .index_of
            .keys()
            .copied()
            .filter(|(a, b)| *a == body || *b == body)
            .collect();
        let mut peers = Vec::with_capacity(stale.len());
        for (a, b) in stale {
            peers.push(if a == body { b } else { a });
            self.remove(a, b);
        }
        peers
    }

    /// Computes `broken = persistent AND NOT frame`, removes those records,
    /// then sets `persistent := frame` and clears the frame bitset for the
    /// next tick. Returns the body pairs whose contact broke this tick so
    /// the caller can tag their island for splitting.
    pub fn end_frame(&mut self) -> Vec<BodyPairKey> {
        let broken_indices = self.persistent.and_not(&self.frame);
        let mut broken_pairs = Vec::with_capacity(broken_indices.len());
        for index in broken_indices {
            if let Some(record) = self.records.get(index as usize).and_then(|r| r.as_ref()) {
                broken_pairs.push(pair_key(record.body_a, record.body_b));
            }
        }
        for &(a, b) in &broken_pairs {
            self.remove(a, b);
        }

        self.persistent = self.frame.clone();
        self.frame.clear_all();

        self.tick = self.tick.wrapping_add(1);
        self.sat_cache
            .retain(|_, entry| self.tick.saturating_sub(entry.last_touched) <= self.sat_cache_max_age);

        broken_pairs
    }

    /// Flattens every persisted record into solver-ready [`Contact`]s,
    /// computing each pair's combined material from the live bodies.
    /// `warmup_tangent_impulses` mirrors
    /// [`SolverConfig::warmup_tangent_impulses`](crate::dynamics::solver::SolverConfig::warmup_tangent_impulses):
    /// when false, cached tangent impulses are dropped rather than carried
    /// into the fresh `Contact`s, so the friction sub-solve's accumulator
    /// starts at zero instead of silently resuming from last tick's value.
    pub fn collect_contacts(&self, bodies: &BodiesSoA, warmup_tangent_impulses: bool) -> Vec<Contact> {
        let mut out = Vec::new();
        for record in self.records.iter().flatten() {
            let material = match (bodies.get(record.body_a), bodies.get(record.body_b)) {
                (Some(a), Some(b)) => crate::core::types::MaterialPairProperties::from_materials(
                    a.material(),
                    b.material(),
                ),
                _ => crate::core::types::MaterialPairProperties::default(),
            };
            out.extend(record.to_contacts(material, warmup_tangent_impulses));
        }
        out
    }

    /// Writes solved impulses back into the persisted records for next
    /// tick's warm start.
    pub fn apply_impulses(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            let key = pair_key(contact.body_a, contact.body_b);
            if let Some(&index) = self.index_of.get(&key) {
                if let Some(record) = self.records[index as usize].as_mut() {
                    record.apply_impulses(contact);
                }
            }
        }
    }

    /// Returns the separating axis cached from the last SAT query for this
    /// pair, if it hasn't aged out.
    pub fn sat_axis(&self, a: EntityId, b: EntityId) -> Option<Vec3> {
        self.sat_cache.get(&pair_key(a, b)).map(|e| e.axis)
    }

    pub fn cache_sat_axis(&mut self, a: EntityId, b: EntityId, axis: Vec3) {
        self.sat_cache.insert(
            pair_key(a, b),
            SatCacheEntry {
                axis,
                last_touched: self.tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.index_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_of.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MaterialPairProperties;
    use crate::utils::allocator::GenerationalId;

    fn eid(i: usize) -> EntityId {
        EntityId(GenerationalId::new(i, 0))
    }

    fn sample_contact(a: EntityId, b: EntityId, feature: u64) -> Contact {
        Contact::new(
            a,
            b,
            Vec3::ZERO,
            Vec3::Y,
            0.01,
            feature,
            MaterialPairProperties::default(),
        )
    }

    #[test]
    fn add_then_remove_round_trips_through_the_pool() {
        let mut db = ContactDatabase::new();
        db.add(eid(0), eid(1), &[sample_contact(eid(0), eid(1), 1)]);
        assert_eq!(db.len(), 1);
        db.remove(eid(0), eid(1));
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn contact_not_refreshed_is_reported_broken_after_end_frame() {
        let mut db = ContactDatabase::new();
        db.add(eid(0), eid(1), &[sample_contact(eid(0), eid(1), 1)]);
        let broken_first = db.end_frame();
        assert!(broken_first.is_empty(), "freshly added contact should survive its first frame");

        // Not re-added this tick: should be reported broken.
        let broken_second = db.end_frame();
        assert_eq!(broken_second, vec![pair_key(eid(0), eid(1))]);
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn warm_start_impulse_survives_when_feature_id_is_stable() {
        let mut db = ContactDatabase::new();
        db.add(eid(0), eid(1), &[sample_contact(eid(0), eid(1), 7)]);
        let mut solved = sample_contact(eid(0), eid(1), 7);
        solved.normal_impulse = 2.5;
        db.apply_impulses(&[solved]);

        db.add(eid(0), eid(1), &[sample_contact(eid(0), eid(1), 7)]);
        let record = db.records[*db.index_of.get(&pair_key(eid(0), eid(1))).unwrap() as usize]
            .as_ref()
            .unwrap();
        assert_eq!(record.points[0].normal_impulse, 2.5);
    }

    #[test]
    fn sat_cache_ages_out_after_max_age_ticks() {
        let mut db = ContactDatabase::new();
        db.sat_cache_max_age = 2;
        db.cache_sat_axis(eid(0), eid(1), Vec3::X);
        assert!(db.sat_axis(eid(0), eid(1)).is_some());
        for _ in 0..4 {
            db.end_frame();
        }
        assert!(db.sat_axis(eid(0), eid(1)).is_none());
    }
}
