//! Combat Core
//!
//! Turns attack intents into damage:
//! - Player weapon attacks gated by the weapon cooldown
//! - Melee swings hitting every live hostile inside the arc
//! - Ranged attacks spawning a projectile entity
//! - Enemy contact attacks against the player
//!
//! Cooldown bookkeeping lives in the [`CombatManager`] resource, keyed by
//! entity. It only ever holds handles, never copies of combatant state.

use std::collections::HashMap;
use std::ops::DerefMut;
use std::time::Duration;

use bevy::prelude::*;

use super::components::*;
use super::geometry::MeleeArc;
use super::projectiles::Projectile;
use super::input::{InputState, Intent};
use super::status_effects::ActiveEffects;
use super::weapons::{AttackStrategy, Equipment};
use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::services::{Audio, SoundCue};

/// Cooldown state for every attacker in the current level.
#[derive(Resource, Debug)]
pub struct CombatManager {
    last_attack: HashMap<Entity, Duration>,
    last_contact: HashMap<Entity, Duration>,
    enemy_attack_cooldown: Duration,
}

/// Result of an attack attempt. Refusals are ordinary outcomes, not errors.
#[derive(Debug, Clone)]
pub enum AttackOutcome {
    NoWeapon,
    CoolingDown { remaining: Duration },
    Melee { arc: MeleeArc, damage: i32 },
    Ranged { projectile: Projectile },
}

/// One landed hit. `entity` and `name` identify the other party: the target
/// for player attacks, the attacker for contact attacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub entity: Entity,
    pub name: String,
    pub dealt: i32,
}

impl CombatManager {
    pub fn new(enemy_attack_cooldown: Duration) -> Self {
        Self {
            last_attack: HashMap::new(),
            last_contact: HashMap::new(),
            enemy_attack_cooldown,
        }
    }

    /// Forget all cooldowns (new level).
    pub fn reset(&mut self) {
        self.last_attack.clear();
        self.last_contact.clear();
    }

    /// Drop the bookkeeping of a despawned entity.
    pub fn forget(&mut self, entity: Entity) {
        self.last_attack.remove(&entity);
        self.last_contact.remove(&entity);
    }

    pub fn last_attack(&self, entity: Entity) -> Option<Duration> {
        self.last_attack.get(&entity).copied()
    }

    pub fn enemy_attack_cooldown(&self) -> Duration {
        self.enemy_attack_cooldown
    }

    /// Attempt a weapon attack at `now`.
    ///
    /// An attack exactly one cooldown after the previous one is allowed.
    /// Successful attempts stamp the attacker's last attack time.
    pub fn try_to_attack(
        &mut self,
        attacker: Entity,
        combatant: &Combatant,
        equipment: &Equipment,
        effects: Option<&ActiveEffects>,
        now: Duration,
    ) -> AttackOutcome {
        let Some(weapon) = equipment.weapon() else {
            return AttackOutcome::NoWeapon;
        };

        if let Some(last) = self.last_attack.get(&attacker) {
            let elapsed = now.saturating_sub(*last);
            if elapsed < weapon.cooldown() {
                return AttackOutcome::CoolingDown {
                    remaining: weapon.cooldown() - elapsed,
                };
            }
        }

        let damage = effects.map_or(weapon.damage(), |e| e.modify_attack_power(weapon.damage()));
        self.last_attack.insert(attacker, now);

        match weapon.strategy() {
            AttackStrategy::Melee { range } => AttackOutcome::Melee {
                arc: MeleeArc::new(&combatant.bounds(), combatant.facing, range),
                damage,
            },
            AttackStrategy::Ranged { speed, size } => AttackOutcome::Ranged {
                projectile: Projectile::centered(attacker, combatant.center(), combatant.facing, speed, size, damage),
            },
        }
    }

    /// Let every live hostile touching the player hit it, each at most once
    /// per contact cooldown.
    pub fn check_enemy_attacks<'a>(
        &mut self,
        player: &mut Combatant,
        enemies: impl IntoIterator<Item = (Entity, &'a Combatant, Option<&'a ActiveEffects>)>,
        now: Duration,
    ) -> Vec<Hit> {
        let mut hits = Vec::new();
        let player_bounds = player.bounds();

        for (entity, enemy, effects) in enemies {
            if !player.is_alive() {
                break;
            }
            if !enemy.is_alive() || !enemy.bounds().intersects(&player_bounds) {
                continue;
            }
            if let Some(last) = self.last_contact.get(&entity) {
                if now.saturating_sub(*last) < self.enemy_attack_cooldown {
                    continue;
                }
            }

            let power = effects.map_or(enemy.base_attack, |e| e.modify_attack_power(enemy.base_attack));
            let dealt = player.take_damage(power);
            self.last_contact.insert(entity, now);
            hits.push(Hit {
                entity,
                name: enemy.name.clone(),
                dealt,
            });
        }
        hits
    }
}

/// Apply a melee swing to every live target whose box intersects the arc.
pub fn resolve_melee<M>(arc: &MeleeArc, damage: i32, targets: impl IntoIterator<Item = (Entity, M)>) -> Vec<Hit>
where
    M: DerefMut<Target = Combatant>,
{
    let mut hits = Vec::new();
    for (entity, mut target) in targets {
        if !target.is_alive() || !arc.intersects(&target.bounds()) {
            continue;
        }
        let dealt = target.take_damage(damage);
        hits.push(Hit {
            entity,
            name: target.name.clone(),
            dealt,
        });
    }
    hits
}

/// Player weapon attack while `Attack` is held.
pub fn player_attack(
    mut commands: Commands,
    clock: Res<SimClock>,
    input: Res<InputState>,
    audio: Res<Audio>,
    mut manager: ResMut<CombatManager>,
    mut combat_log: ResMut<CombatLog>,
    player: Query<(Entity, &Combatant, &Equipment, &ActiveEffects), (With<Player>, Without<DeathTimer>)>,
    mut targets: Query<(Entity, &mut Combatant), (Or<(With<Enemy>, With<Boss>)>, Without<Player>)>,
) {
    if !input.is_held(Intent::Attack) {
        return;
    }
    let Ok((entity, combatant, equipment, effects)) = player.get_single() else {
        return;
    };
    if !combatant.is_alive() {
        return;
    }

    match manager.try_to_attack(entity, combatant, equipment, Some(effects), clock.now) {
        AttackOutcome::NoWeapon => {
            // Holding the button should not flood the log.
            if input.just_pressed(Intent::Attack) {
                combat_log.log(
                    CombatLogEventType::AttackRejected,
                    format!("{} has no weapon equipped", combatant.name),
                );
            }
        }
        AttackOutcome::CoolingDown { remaining } => {
            debug!("{} attack on cooldown ({:?} left)", combatant.name, remaining);
        }
        AttackOutcome::Melee { arc, damage } => {
            audio.play(SoundCue::Swing);
            combat_log.log(
                CombatLogEventType::AttackStarted,
                format!("{} swings ({} damage)", combatant.name, damage),
            );
            let hits = resolve_melee(&arc, damage, targets.iter_mut());
            if !hits.is_empty() {
                audio.play(SoundCue::Hit);
            }
            for hit in hits {
                combat_log.log(
                    CombatLogEventType::Damage,
                    format!("{} hits {} for {} damage", combatant.name, hit.name, hit.dealt),
                );
            }
        }
        AttackOutcome::Ranged { projectile } => {
            audio.play(SoundCue::Shoot);
            combat_log.log(
                CombatLogEventType::AttackStarted,
                format!("{} fires a projectile ({} damage)", combatant.name, projectile.damage),
            );
            commands.spawn((projectile, LevelEntity));
        }
    }
}

/// Contact damage from enemies and the boss. Runs every tick regardless of input.
pub fn enemy_contact_attacks(
    clock: Res<SimClock>,
    audio: Res<Audio>,
    mut manager: ResMut<CombatManager>,
    mut combat_log: ResMut<CombatLog>,
    mut player: Query<&mut Combatant, (With<Player>, Without<DeathTimer>)>,
    enemies: Query<
        (Entity, &Combatant, Option<&ActiveEffects>),
        (Or<(With<Enemy>, With<Boss>)>, Without<Player>, Without<DeathTimer>),
    >,
) {
    let Ok(mut player) = player.get_single_mut() else {
        return;
    };

    let hits = manager.check_enemy_attacks(&mut player, enemies.iter(), clock.now);
    if !hits.is_empty() {
        audio.play(SoundCue::PlayerHurt);
    }
    for hit in hits {
        combat_log.log(
            CombatLogEventType::Damage,
            format!("{} hits {} for {} damage", hit.name, player.name, hit.dealt),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::Facing;
    use crate::sim::status_effects::{EffectKind, StatusEffect};
    use crate::sim::weapons::Weapon;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn hero() -> Combatant {
        let mut c = Combatant::new("Hero", Vec2::new(0.0, 0.0), Vec2::splat(20.0), 100, 5, 2.0);
        c.facing = Facing::Right;
        c
    }

    fn sword() -> Equipment {
        Equipment::with_weapon(Weapon::new(
            "Sword",
            10,
            ms(500),
            AttackStrategy::Melee { range: 30.0 },
        ))
    }

    fn attacker() -> Entity {
        Entity::from_raw(1)
    }

    #[test]
    fn test_no_weapon_is_an_outcome() {
        let mut manager = CombatManager::new(ms(1000));
        let outcome = manager.try_to_attack(attacker(), &hero(), &Equipment::default(), None, ms(0));
        assert!(matches!(outcome, AttackOutcome::NoWeapon));
        assert_eq!(manager.last_attack(attacker()), None);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let mut manager = CombatManager::new(ms(1000));
        let (hero, sword) = (hero(), sword());

        assert!(matches!(
            manager.try_to_attack(attacker(), &hero, &sword, None, ms(100)),
            AttackOutcome::Melee { damage: 10, .. }
        ));
        match manager.try_to_attack(attacker(), &hero, &sword, None, ms(400)) {
            AttackOutcome::CoolingDown { remaining } => assert_eq!(remaining, ms(200)),
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert!(matches!(
            manager.try_to_attack(attacker(), &hero, &sword, None, ms(600)),
            AttackOutcome::Melee { .. }
        ));
        assert_eq!(manager.last_attack(attacker()), Some(ms(600)));
    }

    #[test]
    fn test_attack_damage_uses_effect_modifiers() {
        let mut manager = CombatManager::new(ms(1000));
        let mut hero = hero();
        let mut effects = ActiveEffects::default();
        let strength = StatusEffect::new("Strength", EffectKind::Strength { bonus: 5 }, ms(5000), None).unwrap();
        effects.apply(strength, &mut hero, ms(0));

        let outcome = manager.try_to_attack(attacker(), &hero, &sword(), Some(&effects), ms(0));
        assert!(matches!(outcome, AttackOutcome::Melee { damage: 15, .. }));
    }

    #[test]
    fn test_ranged_attack_builds_projectile() {
        let mut manager = CombatManager::new(ms(1000));
        let bow = Equipment::with_weapon(Weapon::new(
            "Bow",
            8,
            ms(700),
            AttackStrategy::Ranged { speed: 6.0, size: 4.0 },
        ));

        match manager.try_to_attack(attacker(), &hero(), &bow, None, ms(0)) {
            AttackOutcome::Ranged { projectile } => {
                assert_eq!(projectile.owner, attacker());
                assert_eq!(projectile.direction, Facing::Right);
                assert_eq!(projectile.damage, 8);
                assert_eq!(projectile.bounds().center(), Vec2::new(10.0, 10.0));
            }
            other => panic!("expected projectile, got {other:?}"),
        }
    }

    #[test]
    fn test_melee_hits_every_target_in_arc() {
        let hero = hero();
        let arc = MeleeArc::new(&hero.bounds(), Facing::Right, 30.0);

        let mut near = Combatant::new("Near", Vec2::new(22.0, 2.0), Vec2::splat(16.0), 20, 1, 1.0);
        let mut also_near = Combatant::new("AlsoNear", Vec2::new(25.0, 6.0), Vec2::splat(8.0), 20, 1, 1.0);
        let mut behind = Combatant::new("Behind", Vec2::new(-40.0, 2.0), Vec2::splat(16.0), 20, 1, 1.0);

        let hits = resolve_melee(
            &arc,
            12,
            vec![
                (Entity::from_raw(2), &mut near),
                (Entity::from_raw(3), &mut also_near),
                (Entity::from_raw(4), &mut behind),
            ],
        );

        assert_eq!(hits.len(), 2);
        assert_eq!(near.health(), 8);
        assert_eq!(also_near.health(), 8);
        assert_eq!(behind.health(), 20);
    }

    #[test]
    fn test_contact_attacks_respect_cooldown() {
        let mut manager = CombatManager::new(ms(1000));
        let mut player = hero();
        let goblin = Combatant::new("Goblin", Vec2::new(10.0, 10.0), Vec2::splat(16.0), 20, 4, 1.0);
        let far = Combatant::new("Far", Vec2::new(200.0, 200.0), Vec2::splat(16.0), 20, 4, 1.0);
        let goblin_id = Entity::from_raw(5);

        let roster = || vec![(goblin_id, &goblin, None::<&ActiveEffects>), (Entity::from_raw(6), &far, None)];

        assert_eq!(manager.check_enemy_attacks(&mut player, roster(), ms(0)).len(), 1);
        assert!(manager.check_enemy_attacks(&mut player, roster(), ms(999)).is_empty());
        let hits = manager.check_enemy_attacks(&mut player, roster(), ms(1000));
        assert_eq!(hits, vec![Hit { entity: goblin_id, name: "Goblin".to_string(), dealt: 4 }]);
        assert_eq!(player.health(), 92);
    }

    #[test]
    fn test_dead_enemies_do_not_attack() {
        let mut manager = CombatManager::new(ms(0));
        let mut player = hero();
        let mut ghost = Combatant::new("Ghost", Vec2::new(5.0, 5.0), Vec2::splat(16.0), 10, 9, 1.0);
        ghost.take_damage(10);

        let hits = manager.check_enemy_attacks(&mut player, vec![(Entity::from_raw(7), &ghost, None::<&ActiveEffects>)], ms(0));
        assert!(hits.is_empty());
        assert_eq!(player.health(), 100);
    }
}
