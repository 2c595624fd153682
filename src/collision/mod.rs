//! Collision detection modules: broad-phase (dynamic BVH), narrow-phase
//! (GJK + SAT), contact database, and spatial queries.

pub mod shapes;
pub mod broadphase;
pub mod narrowphase;
pub mod sat;
pub mod clipping;
pub mod contact;
pub mod queries;

pub use broadphase::{Dbvh, DbvhNode, NO_NODE};
pub use contact::ContactDatabase;
pub use narrowphase::NarrowPhase;
pub use queries::{Raycast, RaycastHit, RaycastQuery};
pub use sat::{hull_hull_contact, hull_hull_manifold};
pub use shapes::{PrefabId, ShapeDatabase, ShapePrefab};
