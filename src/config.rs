//! Pipeline-wide configuration.
//!
//! `PipelineConfig` aggregates every tunable the tick pipeline reads: the
//! solver knobs (iteration count, Baumgarte constant, sleep thresholds,
//! whether tangential impulses are warm-started alongside normal impulses,
//! ..., see [`SolverConfig`]) plus the structural constants that sit above
//! the solver (fixed timestep, broad-phase AABB fattening margin, contact
//! database cache aging).

use glam::Vec3;

use crate::dynamics::solver::SolverConfig;

/// Default fixed timestep (in seconds), matching a 60 Hz tick rate.
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Default AABB fattening margin applied to broad-phase proxies so that
/// small motions don't force a tree update every tick.
pub const DEFAULT_BROADPHASE_MARGIN: f32 = 0.1;

/// Default number of ticks a cached SAT separating axis is trusted before
/// being recomputed from scratch.
pub const DEFAULT_SAT_CACHE_MAX_AGE: u32 = 16;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub solver: SolverConfig,
    pub time_step: f32,
    pub broadphase_margin: f32,
    pub sat_cache_max_age: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            time_step: DEFAULT_TIME_STEP,
            broadphase_margin: DEFAULT_BROADPHASE_MARGIN,
            sat_cache_max_age: DEFAULT_SAT_CACHE_MAX_AGE,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn time_step(mut self, dt: f32) -> Self {
        self.config.time_step = if dt <= 0.0 { DEFAULT_TIME_STEP } else { dt };
        self
    }

    pub fn gravity(mut self, gravity: Vec3) -> Self {
        self.config.solver.gravity = gravity;
        self
    }

    pub fn iteration_count(mut self, count: u32) -> Self {
        self.config.solver.iteration_count = count;
        self
    }

    pub fn block_solver(mut self, enabled: bool) -> Self {
        self.config.solver.block_solver = enabled;
        self
    }

    pub fn warmup_solver(mut self, enabled: bool) -> Self {
        self.config.solver.warmup_solver = enabled;
        self
    }

    pub fn warmup_tangent_impulses(mut self, enabled: bool) -> Self {
        self.config.solver.warmup_tangent_impulses = enabled;
        self
    }

    pub fn baumgarte_constant(mut self, value: f32) -> Self {
        self.config.solver.baumgarte_constant = value;
        self
    }

    pub fn max_condition(mut self, value: f32) -> Self {
        self.config.solver.max_condition = value;
        self
    }

    pub fn linear_slop(mut self, value: f32) -> Self {
        self.config.solver.linear_slop = value;
        self
    }

    pub fn restitution_threshold(mut self, value: f32) -> Self {
        self.config.solver.restitution_threshold = value;
        self
    }

    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.config.solver.linear_dampening = linear;
        self.config.solver.angular_dampening = angular;
        self
    }

    pub fn sleep_enabled(mut self, enabled: bool) -> Self {
        self.config.solver.sleep_enabled = enabled;
        self
    }

    pub fn sleep_time_threshold(mut self, value: f32) -> Self {
        self.config.solver.sleep_time_threshold = value;
        self
    }

    pub fn sleep_thresholds(mut self, lin_sq: f32, ang_sq: f32) -> Self {
        self.config.solver.sleep_lin_sq = lin_sq;
        self.config.solver.sleep_ang_sq = ang_sq;
        self
    }

    pub fn broadphase_margin(mut self, margin: f32) -> Self {
        self.config.broadphase_margin = margin;
        self
    }

    pub fn sat_cache_max_age(mut self, ticks: u32) -> Self {
        self.config.sat_cache_max_age = ticks;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_tick_rate() {
        let config = PipelineConfig::default();
        assert!((config.time_step - 1.0 / 60.0).abs() < 1e-6);
        assert!(config.solver.sleep_enabled);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = PipelineConfig::builder()
            .iteration_count(12)
            .gravity(Vec3::new(0.0, -3.71, 0.0))
            .sleep_enabled(false)
            .build();
        assert_eq!(config.solver.iteration_count, 12);
        assert!((config.solver.gravity.y + 3.71).abs() < 1e-6);
        assert!(!config.solver.sleep_enabled);
    }
}
