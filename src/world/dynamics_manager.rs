use crate::dynamics::forces::ForceRegistry;
use crate::dynamics::island::IslandDatabase;
use crate::dynamics::parallel::TaskLayer;
use crate::dynamics::solver::SolverConfig;

pub struct DynamicsManager {
    pub config: SolverConfig,
    pub islands: IslandDatabase,
    pub tasks: TaskLayer,
    pub force_registry: ForceRegistry,
}

impl Default for DynamicsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicsManager {
    pub fn new() -> Self {
        Self {
            config: SolverConfig::default(),
            islands: IslandDatabase::new(),
            tasks: TaskLayer::new(),
            force_registry: ForceRegistry::new(),
        }
    }
}
