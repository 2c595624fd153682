//! Core types describing physics entities, components, and shared data.

pub mod collider;
pub mod hull;
pub mod mesh;
pub mod rigidbody;
pub mod soa;
pub mod types;

pub use collider::{Collider, ColliderShape, CollisionFilter};
pub use hull::{box_hull, Face, HalfEdge, Hull, HullBuilder};
pub use mesh::{Aabb, MeshBuilder, MeshBvh, TriangleMesh};
pub use rigidbody::{BodyFlags, RigidBody, RigidBodyBuilder};
pub use soa::BodiesSoA;
pub use types::{MassProperties, Material, Transform, Velocity};
