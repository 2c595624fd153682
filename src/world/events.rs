//! The pipeline's output event stream.
//!
//! Every [`Pipeline::tick`](super::Pipeline::tick) call appends events in
//! the order its stages ran; [`Pipeline::flush`](super::Pipeline::flush)
//! drains and returns them. Consumers are expected to call `flush` once per
//! frame, the same cadence the core advances `tick` at.

use crate::utils::allocator::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ContactNew,
    ContactRemoved,
    IslandNew,
    IslandMergedInto,
    IslandRemoved,
    IslandAwake,
    IslandAsleep,
    BodyNew,
    BodyRemoved,
    BodyOrientation,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineEvent {
    pub kind: EventKind,
    /// Tick-aligned nanosecond timestamp.
    pub timestamp_ns: u64,
    /// Primary subject: a body id for `BODY_*`/`CONTACT_*`, an island id
    /// (cast to the low 32 bits, high bits zero) for `ISLAND_*`.
    pub subject: EntityId,
    /// Second body for `CONTACT_*` events, the surviving island id for
    /// `ISLAND_MERGED_INTO`; otherwise `EntityId::default()` (null).
    pub secondary: EntityId,
}

impl PipelineEvent {
    pub fn new(kind: EventKind, timestamp_ns: u64, subject: EntityId) -> Self {
        Self {
            kind,
            timestamp_ns,
            subject,
            secondary: EntityId::default(),
        }
    }

    pub fn with_secondary(mut self, secondary: EntityId) -> Self {
        self.secondary = secondary;
        self
    }
}

fn island_subject(island_id: u32) -> EntityId {
    EntityId::from_index(island_id)
}

pub(crate) fn island_event(kind: EventKind, timestamp_ns: u64, island_id: u32) -> PipelineEvent {
    PipelineEvent::new(kind, timestamp_ns, island_subject(island_id))
}
