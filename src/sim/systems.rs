//! Simulation Systems API
//!
//! Builds the schedule run once per tick. Systems run in four ordered phases:
//!
//! 1. **InputAndMovement** - Player movement, enemy AI, trap triggers
//! 2. **Effects** - Pending effects attached, periodic ticks, expiry
//! 3. **Combat** - Player attacks, projectiles, enemy contact attacks
//! 4. **Resolution** - Deaths, portal transitions, win/loss decision
//!
//! Deferred commands are flushed between phases, so an entity spawned in one
//! phase (a projectile, a pending effect) is visible to the next.

use bevy::ecs::schedule::ExecutorKind;
use bevy::prelude::*;

pub use super::auras::{apply_pending_effects, tick_status_effects};
pub use super::combat_core::{enemy_contact_attacks, player_attack};
pub use super::match_flow::{apply_level_transition, check_portal, despawn_dead, evaluate_outcome, mark_deaths};
pub use super::movement::{enemy_ai, move_player};
pub use super::projectiles::{move_projectiles, process_projectile_hits, purge_spent_projectiles};
pub use super::traps::trap_system;

/// System set labels for the per-tick phases.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimPhase {
    InputAndMovement,
    Effects,
    Combat,
    Resolution,
}

/// Adds every simulation system to `schedule`, in phase order.
pub fn add_simulation_systems(schedule: &mut Schedule) {
    schedule.configure_sets(
        (
            SimPhase::InputAndMovement,
            SimPhase::Effects,
            SimPhase::Combat,
            SimPhase::Resolution,
        )
            .chain(),
    );

    // Phase 1: Input and Movement
    schedule.add_systems(
        (move_player, enemy_ai, trap_system)
            .chain()
            .in_set(SimPhase::InputAndMovement),
    );

    // Phase 2: Effects
    schedule.add_systems(
        (apply_pending_effects, tick_status_effects)
            .chain()
            .in_set(SimPhase::Effects),
    );

    // Phase 3: Combat
    schedule.add_systems(
        (
            player_attack,
            move_projectiles,
            process_projectile_hits,
            purge_spent_projectiles,
            enemy_contact_attacks,
        )
            .chain()
            .in_set(SimPhase::Combat),
    );

    // Phase 4: Resolution
    schedule.add_systems(
        (
            mark_deaths,
            despawn_dead,
            check_portal,
            apply_level_transition,
            evaluate_outcome,
        )
            .chain()
            .in_set(SimPhase::Resolution),
    );

    // Flush deferred commands between phases
    schedule.add_systems(
        apply_deferred
            .after(SimPhase::InputAndMovement)
            .before(SimPhase::Effects),
    );
    schedule.add_systems(
        apply_deferred
            .after(SimPhase::Effects)
            .before(SimPhase::Combat),
    );
    schedule.add_systems(
        apply_deferred
            .after(SimPhase::Combat)
            .before(SimPhase::Resolution),
    );
}

/// The per-tick schedule, single threaded so system order is exactly the
/// declared order.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    add_simulation_systems(&mut schedule);
    schedule
}
