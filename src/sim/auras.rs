//! Status Effect Systems
//!
//! - Applying pending effects queued by traps and inventory commands
//! - Periodic ticks and expiry for every combatant's [`ActiveEffects`]

use bevy::prelude::*;
use smallvec::SmallVec;

use super::components::*;
use super::status_effects::{ActiveEffects, EffectPending};
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::services::{Audio, SoundCue};

/// Attach queued effects to their targets.
///
/// Pending effects whose target is gone or dead are dropped.
pub fn apply_pending_effects(
    mut commands: Commands,
    clock: Res<SimClock>,
    audio: Res<Audio>,
    mut combat_log: ResMut<CombatLog>,
    pending_effects: Query<(Entity, &EffectPending)>,
    mut combatants: Query<(&mut Combatant, &mut ActiveEffects)>,
) {
    for (pending_entity, pending) in pending_effects.iter() {
        commands.entity(pending_entity).despawn();

        let Ok((mut combatant, mut effects)) = combatants.get_mut(pending.target) else {
            continue;
        };
        if !combatant.is_alive() {
            continue;
        }

        let effect = pending.effect.clone();
        let name = effect.name().to_string();
        let is_buff = effect.kind().is_buff();

        if let Some(replaced) = effects.apply(effect, &mut combatant, clock.now) {
            combat_log.log(
                CombatLogEventType::EffectRemoved,
                format!("{} on {} is replaced", replaced.name(), combatant.name),
            );
        }

        audio.play(SoundCue::EffectApplied);
        combat_log.log(
            CombatLogEventType::EffectApplied,
            format!(
                "{} gains {} {}",
                combatant.name,
                if is_buff { "buff" } else { "debuff" },
                name
            ),
        );
        info!("{} gains {}", combatant.name, name);
    }
}

/// Run periodic hooks and expire finished effects.
pub fn tick_status_effects(
    clock: Res<SimClock>,
    mut combat_log: ResMut<CombatLog>,
    mut combatants: Query<(&mut Combatant, &mut ActiveEffects)>,
) {
    for (mut combatant, mut effects) in combatants.iter_mut() {
        if effects.is_empty() {
            continue;
        }

        let mut ticks: SmallVec<[(String, i32); 4]> = SmallVec::new();
        let expired = effects.update_with(&mut combatant, clock.now, |effect, change| {
            ticks.push((effect.name().to_string(), change));
        });

        for (effect, change) in ticks {
            if change < 0 {
                combat_log.log(
                    CombatLogEventType::Damage,
                    format!("{} takes {} damage from {}", combatant.name, -change, effect),
                );
            } else if change > 0 {
                combat_log.log(
                    CombatLogEventType::Healing,
                    format!("{} heals {} from {}", combatant.name, change, effect),
                );
            }
        }

        for effect in expired {
            combat_log.log(
                CombatLogEventType::EffectExpired,
                format!("{} fades from {}", effect.name(), combatant.name),
            );
        }
    }
}
