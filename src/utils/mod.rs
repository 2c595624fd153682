//! Utility helpers including math extensions, allocators, logging, and SIMD helpers.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod profiling;
pub mod simd;

pub use allocator::{Arena, EntityId, GenerationalId};
pub use math::*;
