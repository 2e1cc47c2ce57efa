//! Trap System
//!
//! Traps are one-shot floor triggers placed by level layouts. The first time
//! the player's box overlaps a trap, the trap queues its status effect on the
//! player and is despawned.

use bevy::prelude::*;

use super::components::*;
use super::geometry::Aabb;
use super::status_effects::EffectPending;
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::config::GameConfig;

#[derive(Component, Debug, Clone)]
pub struct Trap {
    /// Name of the effect in the game config
    pub effect: String,
    pub bounds: Aabb,
}

pub fn trap_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut combat_log: ResMut<CombatLog>,
    traps: Query<(Entity, &Trap)>,
    player: Query<(Entity, &Combatant), (With<Player>, Without<DeathTimer>)>,
) {
    let Ok((player_entity, player)) = player.get_single() else {
        return;
    };
    if !player.is_alive() {
        return;
    }
    let player_bounds = player.bounds();

    for (trap_entity, trap) in traps.iter() {
        if !trap.bounds.intersects(&player_bounds) {
            continue;
        }

        match config.effect(&trap.effect) {
            Ok(effect) => {
                combat_log.log(
                    CombatLogEventType::MatchEvent,
                    format!("{} triggers a {} trap", player.name, trap.effect),
                );
                commands.spawn(EffectPending {
                    target: player_entity,
                    effect,
                });
            }
            // Names are validated at load, so this only happens with a
            // config swapped out mid-run.
            Err(e) => warn!("Trap could not build its effect: {}", e),
        }
        commands.entity(trap_entity).despawn();
    }
}
