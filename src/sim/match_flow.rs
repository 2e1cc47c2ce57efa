//! Run Flow
//!
//! Level loading, deaths, portal transitions and the win/loss decision.
//!
//! A run is over when the boss dies (victory) or the player dies (defeat).
//! Reaching a portal while holding `Interact` loads the next level; the
//! player entity survives the transition along with its weapon and active
//! effects, everything else spawned by the previous level is despawned.

use bevy::prelude::*;

use super::combat_core::CombatManager;
use super::components::*;
use super::geometry::Aabb;
use super::input::{InputState, Intent};
use super::map::{CurrentLevel, LevelMap, SpawnMarker, PORTAL};
use super::status_effects::ActiveEffects;
use super::traps::Trap;
use super::weapons::Equipment;
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::config::{EnemyConfig, GameConfig};
use crate::error::{ConfigError, TickError};
use crate::services::{Audio, SoundCue};

/// Top-left position that centers a box of `size` on a tile.
fn centered_in_tile(tile_origin: Vec2, tile_size: f32, size: Vec2) -> Vec2 {
    tile_origin + (Vec2::splat(tile_size) - size) * 0.5
}

fn spawn_hostile(world: &mut World, def: &EnemyConfig, name: String, position: Vec2, is_boss: bool) -> Entity {
    let combatant = Combatant::new(
        name,
        position,
        Vec2::new(def.size.0, def.size.1),
        def.health,
        def.attack,
        def.speed,
    );
    let mut entity = world.spawn((combatant, ActiveEffects::default(), Wander::default(), LevelEntity));
    if is_boss {
        entity.insert(Boss);
    } else {
        entity.insert(Enemy);
    }
    entity.id()
}

/// Replace the current level with level `index` from the config.
///
/// Fails without touching the world if the level cannot be built.
pub fn load_level(world: &mut World, index: usize) -> Result<(), ConfigError> {
    let config = world.resource::<GameConfig>().clone();
    let parsed = config.parse_level(index)?;
    let level = &config.levels[index];
    let enemy_def = config.enemy(&level.enemy)?.clone();
    let trap_effect = match &level.trap_effect {
        Some(name) => {
            config.effect(name)?;
            Some(name.clone())
        }
        None => None,
    };
    let starting_weapon = match &config.player.weapon {
        Some(name) => Some(config.weapon(name)?),
        None => None,
    };

    let (px, py) = parsed
        .player_spawn()
        .ok_or_else(|| ConfigError::InvalidLevel {
            level: level.name.clone(),
            reason: "missing player start".to_string(),
        })?;

    let stale: Vec<Entity> = world
        .query_filtered::<Entity, With<LevelEntity>>()
        .iter(world)
        .collect();
    for entity in stale {
        world.despawn(entity);
    }
    world.resource_mut::<CombatManager>().reset();

    let tile_size = config.tile_size;
    let grid = &parsed.grid;

    let player_size = Vec2::new(config.player.size.0, config.player.size.1);
    let player_position = centered_in_tile(grid.tile_origin(px, py), tile_size, player_size);

    let existing = world
        .query_filtered::<Entity, With<Player>>()
        .iter(world)
        .next();
    match existing {
        Some(entity) => {
            if let Some(mut player) = world.get_mut::<Combatant>(entity) {
                player.position = player_position;
            }
        }
        None => {
            let player = Combatant::new(
                config.player.name.clone(),
                player_position,
                player_size,
                config.player.health,
                config.player.attack,
                config.player.speed,
            );
            let equipment = match starting_weapon {
                Some(weapon) => Equipment::with_weapon(weapon),
                None => Equipment::default(),
            };
            world.spawn((Player, player, equipment, ActiveEffects::default()));
        }
    }

    let enemy_size = Vec2::new(enemy_def.size.0, enemy_def.size.1);
    let boss_size = Vec2::new(config.boss.size.0, config.boss.size.1);
    let mut enemy_count = 0;
    let mut boss_present = false;

    for &(marker, x, y) in parsed.spawns.iter() {
        let origin = grid.tile_origin(x, y);
        match marker {
            SpawnMarker::Player => {}
            SpawnMarker::Enemy => {
                enemy_count += 1;
                let name = format!("{} {}", enemy_def.name, enemy_count);
                spawn_hostile(world, &enemy_def, name, centered_in_tile(origin, tile_size, enemy_size), false);
            }
            SpawnMarker::Boss => {
                boss_present = true;
                let position = centered_in_tile(origin, tile_size, boss_size);
                spawn_hostile(world, &config.boss, config.boss.name.clone(), position, true);
            }
            SpawnMarker::Trap => match &trap_effect {
                Some(effect) => {
                    world.spawn((
                        Trap {
                            effect: effect.clone(),
                            bounds: Aabb::new(origin, Vec2::splat(tile_size)),
                        },
                        LevelEntity,
                    ));
                }
                None => warn!("Level {} places a trap at ({}, {}) but has no trap effect", level.name, x, y),
            },
        }
    }

    {
        let mut state = world.resource_mut::<MatchState>();
        state.boss_present = boss_present;
        state.pending_transition = None;
    }

    world.insert_resource(CurrentLevel {
        index,
        name: level.name.clone(),
        map: Box::new(parsed.grid),
    });

    world.resource_mut::<CombatLog>().log(
        CombatLogEventType::LevelEvent,
        format!("Entered {} ({} enemies{})", level.name, enemy_count, if boss_present { ", boss" } else { "" }),
    );
    info!("Loaded level {} ({}): {} enemies, boss: {}", index, level.name, enemy_count, boss_present);

    Ok(())
}

/// Flag combatants whose health reached zero. Their effects are cleared so
/// no reversal hook is left pending on a corpse.
pub fn mark_deaths(
    mut commands: Commands,
    clock: Res<SimClock>,
    audio: Res<Audio>,
    mut state: ResMut<MatchState>,
    mut combat_log: ResMut<CombatLog>,
    mut fallen: Query<(Entity, &mut Combatant, &mut ActiveEffects, Has<Player>), Without<DeathTimer>>,
) {
    for (entity, mut combatant, mut effects, is_player) in fallen.iter_mut() {
        if combatant.is_alive() {
            continue;
        }

        effects.clear(&mut combatant);
        commands.entity(entity).insert(DeathTimer { died_at: clock.now });
        audio.play(SoundCue::Death);
        combat_log.log(CombatLogEventType::Death, format!("{} has died", combatant.name));
        info!("{} has died", combatant.name);

        if !is_player {
            state.enemies_defeated += 1;
        }
    }
}

/// Despawn dead hostiles once the death grace period has passed. The player
/// entity is never despawned.
pub fn despawn_dead(
    mut commands: Commands,
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    mut manager: ResMut<CombatManager>,
    dead: Query<(Entity, &DeathTimer), Without<Player>>,
) {
    let grace = config.death_grace();
    for (entity, timer) in dead.iter() {
        if clock.now.saturating_sub(timer.died_at) >= grace {
            manager.forget(entity);
            commands.entity(entity).despawn();
        }
    }
}

/// Request the next level when the player stands on a portal holding `Interact`.
pub fn check_portal(
    input: Res<InputState>,
    config: Res<GameConfig>,
    level: Res<CurrentLevel>,
    mut state: ResMut<MatchState>,
    player: Query<&Combatant, (With<Player>, Without<DeathTimer>)>,
) {
    if state.outcome.is_some() || !input.is_held(Intent::Interact) {
        return;
    }
    let Ok(player) = player.get_single() else {
        return;
    };
    let next = level.index + 1;
    if next >= config.levels.len() {
        return;
    }
    if level.map.touches_tile(&player.bounds(), PORTAL) {
        state.pending_transition = Some(next);
    }
}

/// Load a level requested this tick. Load failures are reported as tick
/// faults and leave the current level in place.
pub fn apply_level_transition(world: &mut World) {
    let Some(index) = world.resource_mut::<MatchState>().pending_transition.take() else {
        return;
    };

    world.resource::<Audio>().play(SoundCue::Portal);
    match load_level(world, index) {
        Ok(()) => {}
        Err(source) => {
            error!("Level transition to {} failed: {}", index, source);
            world
                .resource_mut::<TickFaults>()
                .0
                .push(TickError::LevelLoad { index, source });
        }
    }
}

/// Decide the run: defeat when the player is dead, victory when the level's
/// boss is dead. Player death wins a tie.
pub fn evaluate_outcome(
    audio: Res<Audio>,
    mut state: ResMut<MatchState>,
    mut combat_log: ResMut<CombatLog>,
    player: Query<&Combatant, With<Player>>,
    bosses: Query<&Combatant, (With<Boss>, Without<Player>)>,
) {
    if state.outcome.is_some() {
        return;
    }

    let player_dead = player.get_single().map_or(false, |p| !p.is_alive());
    let outcome = if player_dead {
        Some(Outcome::Defeat)
    } else if state.boss_present && bosses.iter().all(|b| !b.is_alive()) {
        Some(Outcome::Victory)
    } else {
        None
    };

    if let Some(outcome) = outcome {
        state.outcome = Some(outcome);
        audio.play(match outcome {
            Outcome::Victory => SoundCue::Victory,
            _ => SoundCue::Defeat,
        });
        combat_log.log(CombatLogEventType::MatchEvent, format!("Run ended: {:?}", outcome));
        info!("Run ended: {:?}", outcome);
    }
}
