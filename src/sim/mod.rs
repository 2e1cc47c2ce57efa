//! Simulation core
//!
//! The entity model, status-effect engine and combat resolver, all living in a
//! bevy ECS world and advanced by the per-tick schedule from [`systems`].

use bevy::prelude::*;

pub mod auras;
pub mod combat_core;
pub mod components;
pub mod geometry;
pub mod input;
pub mod map;
pub mod match_flow;
pub mod movement;
pub mod projectiles;
pub mod status_effects;
pub mod systems;
pub mod traps;
pub mod weapons;

pub use combat_core::{AttackOutcome, CombatManager, Hit};
pub use components::{
    Boss, Combatant, DeathTimer, Enemy, GameRng, LevelEntity, MatchState, Outcome, Player, SimClock,
    TickFaults, Wander,
};
pub use geometry::{Aabb, Facing, MeleeArc};
pub use input::{InputProvider, InputSnapshot, InputState, InputStep, Intent, ScriptedInput};
pub use map::{CurrentLevel, LevelMap, TileGrid};
pub use projectiles::{Projectile, ProjectileState};
pub use status_effects::{ActiveEffects, EffectKind, EffectPending, EffectState, StatusEffect};
pub use systems::{build_schedule, SimPhase};
pub use weapons::{AttackStrategy, Equipment, Weapon};

use crate::combat::log::CombatLog;
use crate::config::GameConfig;
use crate::services::Audio;

/// Inserts the resources the simulation systems need.
///
/// Levels are not loaded here; call [`match_flow::load_level`] once the app is
/// built.
pub struct SimPlugin {
    pub config: GameConfig,
    /// Seed for enemy wandering; entropy when `None`
    pub seed: Option<u64>,
}

impl Plugin for SimPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(GameRng::from_optional_seed(self.seed))
            .insert_resource(CombatManager::new(self.config.enemy_attack_cooldown()))
            .init_resource::<SimClock>()
            .init_resource::<MatchState>()
            .init_resource::<TickFaults>()
            .init_resource::<InputState>()
            .init_resource::<CombatLog>()
            .init_resource::<Audio>();
    }
}
