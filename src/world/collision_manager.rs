use crate::collision::{broadphase::Dbvh, contact::ContactDatabase};
use crate::config::PipelineConfig;

pub struct CollisionManager {
    pub broadphase: Dbvh,
    pub contacts: ContactDatabase,
}

impl Default for CollisionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionManager {
    pub fn new() -> Self {
        Self {
            broadphase: Dbvh::new(),
            contacts: ContactDatabase::new(),
        }
    }

    pub fn with_config(config: &PipelineConfig) -> Self {
        Self {
            broadphase: Dbvh::new(),
            contacts: ContactDatabase::with_sat_cache_max_age(config.sat_cache_max_age),
        }
    }
}
