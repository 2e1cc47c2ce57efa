//! Movement Systems
//!
//! Player movement from held intents and enemy AI (chase inside the aggro
//! radius, random wandering outside it). Both slide along walls by resolving
//! each axis separately against the level map.

use bevy::prelude::*;

use super::components::*;
use super::geometry::{Aabb, Facing};
use super::input::InputState;
use super::map::{CurrentLevel, LevelMap};
use crate::config::GameConfig;

/// Shortest and longest wander leg, in ticks.
const WANDER_TICKS: (u32, u32) = (30, 90);
/// Chance that a new wander leg is spent standing still.
const WANDER_IDLE_CHANCE: f32 = 0.3;

/// Move `bounds` by `delta`, one axis at a time, skipping any axis whose move
/// would touch a solid tile. Returns the new top-left position.
pub fn slide(bounds: Aabb, delta: Vec2, map: &dyn LevelMap) -> Vec2 {
    let mut current = bounds;

    if delta.x != 0.0 {
        let moved = current.translated(Vec2::new(delta.x, 0.0));
        if !map.is_area_solid(&moved) {
            current = moved;
        }
    }
    if delta.y != 0.0 {
        let moved = current.translated(Vec2::new(0.0, delta.y));
        if !map.is_area_solid(&moved) {
            current = moved;
        }
    }

    current.min
}

pub fn move_player(
    input: Res<InputState>,
    level: Res<CurrentLevel>,
    mut player: Query<&mut Combatant, (With<Player>, Without<DeathTimer>)>,
) {
    let Ok(mut player) = player.get_single_mut() else {
        return;
    };
    if !player.is_alive() {
        return;
    }

    let direction = input.current.movement();
    let Some(facing) = Facing::from_vector(direction) else {
        return;
    };
    player.facing = facing;

    let delta = direction.normalize_or_zero() * player.effective_speed();
    player.position = slide(player.bounds(), delta, level.map.as_ref());
}

pub fn enemy_ai(
    config: Res<GameConfig>,
    level: Res<CurrentLevel>,
    mut rng: ResMut<GameRng>,
    player: Query<&Combatant, With<Player>>,
    mut enemies: Query<
        (&mut Combatant, &mut Wander),
        (Or<(With<Enemy>, With<Boss>)>, Without<Player>, Without<DeathTimer>),
    >,
) {
    let target = player
        .get_single()
        .ok()
        .filter(|p| p.is_alive())
        .map(|p| (p.bounds(), p.center()));
    let map = level.map.as_ref();

    for (mut enemy, mut wander) in enemies.iter_mut() {
        if !enemy.is_alive() {
            continue;
        }

        if let Some((player_bounds, player_center)) = target {
            // Already in contact: hold position and let contact attacks work.
            if enemy.bounds().intersects(&player_bounds) {
                continue;
            }

            let to_player = player_center - enemy.center();
            if to_player.length() <= config.aggro_radius {
                if let Some(facing) = Facing::from_vector(to_player) {
                    enemy.facing = facing;
                }
                let delta = to_player.normalize_or_zero() * enemy.effective_speed();
                enemy.position = slide(enemy.bounds(), delta, map);
                wander.ticks_left = 0;
                continue;
            }
        }

        if wander.ticks_left == 0 {
            wander.direction = if rng.chance(WANDER_IDLE_CHANCE) {
                None
            } else {
                Some(rng.random_facing())
            };
            wander.ticks_left = rng.random_range(WANDER_TICKS.0, WANDER_TICKS.1);
        }
        wander.ticks_left -= 1;

        if let Some(facing) = wander.direction {
            enemy.facing = facing;
            let before = enemy.position;
            enemy.position = slide(enemy.bounds(), facing.unit() * enemy.effective_speed(), map);
            if enemy.position == before {
                // Bumped into a wall, pick a new leg next tick.
                wander.ticks_left = 0;
            }
        }
    }
}
