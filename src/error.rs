//! Fatal and host-misuse error conditions.
//!
//! Most of the error taxonomy this engine distinguishes — degenerate input
//! (e.g. a zero-length ray, a manifold with coincident points) and numerical
//! non-convergence (a block solve whose matrix turned out singular) — is
//! handled locally at the point it occurs: the offending computation falls
//! back to a safe default and execution continues. Only conditions the
//! caller must be told about surface here, as a `Result` from [`Pipeline`]
//! (see `world.rs`).
//!
//! [`Pipeline`]: crate::world::Pipeline

use thiserror::Error;

use crate::collision::shapes::PrefabId;
use crate::utils::allocator::EntityId;

#[derive(Debug, Error)]
pub enum PhysicsError {
    /// The body pool was created with a fixed capacity (via
    /// [`Pipeline::init`](crate::world::Pipeline::init)) and is full.
    #[error("body pool exhausted: capacity is {capacity}")]
    OutOfMemory { capacity: usize },

    /// A body handle was used that is unknown or stale (already removed).
    #[error("invalid body handle: {0:?}")]
    InvalidBody(EntityId),

    /// A collider handle was used that is unknown or stale.
    #[error("invalid collider handle: {0:?}")]
    InvalidCollider(EntityId),

    /// `body_alloc` was called with a prefab id not present in the shape
    /// database it was initialized with.
    #[error("unknown shape prefab: {0}")]
    UnknownPrefab(PrefabId),
}
