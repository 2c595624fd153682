//! Simulation dynamics modules: forces, the contact solver, islands, and tasks.

pub mod forces;
pub mod friction;
pub mod island;
pub mod parallel;
pub mod solver;

pub use forces::{DragForce, ForceGenerator, ForceRegistry, GravityForce, SpringForce};
pub use island::{Island, IslandDatabase, ISLAND_AWAKE, ISLAND_NULL, ISLAND_SLEEP_RESET, ISLAND_SPLIT, ISLAND_STATIC, ISLAND_TRY_SLEEP};
pub use parallel::TaskLayer;
pub use solver::{Contact, PgsSolver, SolverConfig, SolverStepMetrics};
