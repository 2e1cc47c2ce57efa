//! DungeonSim - Action Game Simulation Core
//!
//! The gameplay core of a top-down dungeon action game: a fixed-rate tick
//! scheduler, a status-effect engine, a combat resolver with melee arcs and
//! projectiles, and the per-tick orchestration tying them together.
//!
//! This library exposes the core modules for testing and reuse.

pub mod cli;
pub mod combat;
pub mod config;
pub mod error;
pub mod headless;
pub mod scheduler;
pub mod services;
pub mod sim;
pub mod simulation;

// Re-export commonly used types
pub use combat::log::{CombatLog, CombatLogEventType};
pub use config::GameConfig;
pub use error::{ConfigError, TickError};
pub use headless::HeadlessRunConfig;
pub use scheduler::{Scheduler, SharedStats, SimulationStep, StepStatus};
pub use services::RunSummary;
pub use sim::Outcome;
pub use simulation::{SimCommand, Simulation, SimulationBuilder, SimulationHandle};
