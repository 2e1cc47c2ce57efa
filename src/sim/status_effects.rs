//! Status Effect Engine
//!
//! Time-bounded modifiers attached to combatants. Each combatant carries an
//! [`ActiveEffects`] component holding its effects in activation order; at most
//! one effect per name is active at a time and re-applying a name replaces the
//! old effect (last applied wins).
//!
//! Every effect passes through `Inactive -> Active -> (Expired | Removed)`.
//! Leaving the active state always runs the kind's removal hook before the
//! effect is detached, so temporary attribute changes never leak.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::components::Combatant;
use crate::error::ConfigError;

/// What an effect does. One dispatch function per hook.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Periodic damage
    Poison { damage: i32 },
    /// Periodic healing
    Regeneration { heal: i32 },
    /// Flat attack bonus
    Strength { bonus: i32 },
    /// Attack multiplier, rounded to the nearest integer
    Empower { factor: f32 },
    /// Movement speed change in percent while active
    Haste { percent: f32 },
    /// Temporary max health increase
    Fortify { max_health: i32 },
}

impl EffectKind {
    pub fn on_activate(&self, owner: &mut Combatant) {
        match *self {
            EffectKind::Haste { percent } => owner.add_speed_modifier(percent / 100.0),
            EffectKind::Fortify { max_health } => owner.raise_max_health(max_health),
            EffectKind::Poison { .. }
            | EffectKind::Regeneration { .. }
            | EffectKind::Strength { .. }
            | EffectKind::Empower { .. } => {}
        }
    }

    /// Returns the signed health change caused by the tick.
    pub fn on_tick(&self, owner: &mut Combatant) -> i32 {
        match *self {
            EffectKind::Poison { damage } => -owner.take_damage(damage),
            EffectKind::Regeneration { heal } => owner.heal(heal),
            _ => 0,
        }
    }

    pub fn on_remove(&self, owner: &mut Combatant) {
        match *self {
            EffectKind::Haste { percent } => owner.add_speed_modifier(-percent / 100.0),
            EffectKind::Fortify { max_health } => owner.lower_max_health(max_health),
            EffectKind::Poison { .. }
            | EffectKind::Regeneration { .. }
            | EffectKind::Strength { .. }
            | EffectKind::Empower { .. } => {}
        }
    }

    pub fn modify_attack(&self, value: i32) -> i32 {
        match *self {
            EffectKind::Strength { bonus } => value.saturating_add(bonus),
            EffectKind::Empower { factor } => (value as f32 * factor).round() as i32,
            _ => value,
        }
    }

    pub fn is_buff(&self) -> bool {
        !matches!(self, EffectKind::Poison { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Inactive,
    Active,
    Expired,
    Removed,
}

#[derive(Debug, Clone)]
pub struct StatusEffect {
    name: String,
    kind: EffectKind,
    duration: Duration,
    tick_interval: Option<Duration>,
    started_at: Duration,
    last_tick: Duration,
    state: EffectState,
}

impl StatusEffect {
    /// Build an inactive effect. A zero tick interval is rejected.
    pub fn new(
        name: impl Into<String>,
        kind: EffectKind,
        duration: Duration,
        tick_interval: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if tick_interval == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidTickInterval { name, interval_ms: 0 });
        }
        Ok(Self {
            name,
            kind,
            duration,
            tick_interval,
            started_at: Duration::ZERO,
            last_tick: Duration::ZERO,
            state: EffectState::Inactive,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EffectState::Active
    }

    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    /// Time left before expiry, clamped at zero.
    pub fn remaining(&self, now: Duration) -> Duration {
        self.duration.saturating_sub(now.saturating_sub(self.started_at))
    }

    pub fn is_expired(&self, now: Duration) -> bool {
        !self.is_active() || self.remaining(now).is_zero()
    }

    fn activate(&mut self, owner: &mut Combatant, now: Duration) {
        self.started_at = now;
        self.last_tick = now;
        self.state = EffectState::Active;
        self.kind.on_activate(owner);
    }

    fn deactivate(&mut self, owner: &mut Combatant, end_state: EffectState) {
        if self.is_active() {
            self.kind.on_remove(owner);
        }
        self.state = end_state;
    }

    /// Fire the periodic hook once per whole interval elapsed since the last
    /// tick, never past the end of the effect.
    fn run_ticks(&mut self, owner: &mut Combatant, now: Duration, on_tick: &mut impl FnMut(&StatusEffect, i32)) {
        let Some(interval) = self.tick_interval else {
            return;
        };
        let horizon = now.min(self.started_at + self.duration);
        while horizon.saturating_sub(self.last_tick) >= interval {
            self.last_tick += interval;
            let change = self.kind.on_tick(owner);
            on_tick(self, change);
        }
    }
}

/// The effects currently attached to one combatant, in activation order.
#[derive(Component, Debug, Default)]
pub struct ActiveEffects {
    effects: Vec<StatusEffect>,
}

/// Expired effects handed back by one update pass.
pub type ExpiredEffects = SmallVec<[StatusEffect; 4]>;

impl ActiveEffects {
    /// Attach an effect, replacing a same-name effect if one is active.
    ///
    /// The replaced effect's removal hook runs before the new effect's
    /// activation hook. Returns the replaced effect.
    pub fn apply(&mut self, effect: StatusEffect, owner: &mut Combatant, now: Duration) -> Option<StatusEffect> {
        self.apply_with(effect, owner, now, |_, _| {})
    }

    /// Like [`ActiveEffects::apply`], handing the replaced effect and its owner
    /// to `on_replaced` between the removal and activation hooks.
    pub fn apply_with(
        &mut self,
        mut effect: StatusEffect,
        owner: &mut Combatant,
        now: Duration,
        on_replaced: impl FnOnce(&StatusEffect, &Combatant),
    ) -> Option<StatusEffect> {
        let replaced = self.remove(effect.name(), owner);
        if let Some(old) = &replaced {
            on_replaced(old, owner);
        }
        effect.activate(owner, now);
        self.effects.push(effect);
        replaced
    }

    /// Tick and expire effects, returning the ones that expired this pass.
    pub fn update(&mut self, owner: &mut Combatant, now: Duration) -> ExpiredEffects {
        self.update_with(owner, now, |_, _| {})
    }

    /// Like [`ActiveEffects::update`], reporting each periodic tick and its
    /// health change to `on_tick`.
    pub fn update_with(
        &mut self,
        owner: &mut Combatant,
        now: Duration,
        mut on_tick: impl FnMut(&StatusEffect, i32),
    ) -> ExpiredEffects {
        let mut expired = ExpiredEffects::new();
        let mut i = 0;
        while i < self.effects.len() {
            self.effects[i].run_ticks(owner, now, &mut on_tick);
            if self.effects[i].is_expired(now) {
                let mut effect = self.effects.remove(i);
                effect.deactivate(owner, EffectState::Expired);
                expired.push(effect);
            } else {
                i += 1;
            }
        }
        expired
    }

    /// Fold the attack modifiers of all active effects over `base`, in
    /// activation order.
    pub fn modify_attack_power(&self, base: i32) -> i32 {
        self.effects
            .iter()
            .filter(|e| e.is_active())
            .fold(base, |value, e| e.kind.modify_attack(value))
    }

    pub fn remove(&mut self, name: &str, owner: &mut Combatant) -> Option<StatusEffect> {
        let index = self.effects.iter().position(|e| e.name() == name)?;
        let mut effect = self.effects.remove(index);
        effect.deactivate(owner, EffectState::Removed);
        Some(effect)
    }

    /// Remove every effect, running removal hooks in activation order.
    pub fn clear(&mut self, owner: &mut Combatant) -> Vec<StatusEffect> {
        let mut removed: Vec<StatusEffect> = self.effects.drain(..).collect();
        for effect in removed.iter_mut() {
            effect.deactivate(owner, EffectState::Removed);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effects.iter().any(|e| e.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Pending effect waiting to be attached by the effects phase.
/// Spawned as its own entity by traps and inventory commands.
#[derive(Component, Debug)]
pub struct EffectPending {
    pub target: Entity,
    pub effect: StatusEffect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Vec2;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn owner(health: i32) -> Combatant {
        Combatant::new("Owner", Vec2::ZERO, Vec2::splat(16.0), health, 10, 2.0)
    }

    fn effect(name: &str, kind: EffectKind, duration: u64, interval: Option<u64>) -> StatusEffect {
        StatusEffect::new(name, kind, ms(duration), interval.map(ms)).unwrap()
    }

    #[test]
    fn test_poison_ticks_then_expires() {
        let mut target = owner(100);
        let mut effects = ActiveEffects::default();
        effects.apply(
            effect("Poison", EffectKind::Poison { damage: 5 }, 5000, Some(1000)),
            &mut target,
            ms(0),
        );

        for t in 1..=4 {
            let expired = effects.update(&mut target, ms(t * 1000));
            assert!(expired.is_empty());
        }
        assert_eq!(target.health(), 80);
        assert!(effects.contains("Poison"));

        let expired = effects.update(&mut target, ms(5000));
        assert_eq!(target.health(), 75);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].state(), EffectState::Expired);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_late_update_catches_up_but_not_past_expiry() {
        let mut target = owner(100);
        let mut effects = ActiveEffects::default();
        effects.apply(
            effect("Poison", EffectKind::Poison { damage: 5 }, 3000, Some(1000)),
            &mut target,
            ms(0),
        );

        let mut ticks = 0;
        let expired = effects.update_with(&mut target, ms(10_000), |_, _| ticks += 1);
        assert_eq!(ticks, 3);
        assert_eq!(target.health(), 85);
        assert_eq!(expired.len(), 1);
    }

    #[test]
    fn test_reapply_replaces_and_reverses_first() {
        let mut target = owner(50);
        let mut effects = ActiveEffects::default();
        effects.apply(effect("Fortify", EffectKind::Fortify { max_health: 20 }, 5000, None), &mut target, ms(0));
        assert_eq!(target.max_health(), 70);

        let replaced = effects.apply(
            effect("Fortify", EffectKind::Fortify { max_health: 10 }, 5000, None),
            &mut target,
            ms(1000),
        );

        assert_eq!(replaced.map(|e| e.state()), Some(EffectState::Removed));
        assert_eq!(effects.len(), 1);
        assert_eq!(target.max_health(), 60);
        assert_eq!(effects.get("Fortify").map(|e| e.started_at()), Some(ms(1000)));
    }

    #[test]
    fn test_replaced_effect_is_reversed_before_new_one_activates() {
        let mut target = owner(50);
        let mut effects = ActiveEffects::default();
        effects.apply(effect("Fortify", EffectKind::Fortify { max_health: 20 }, 5000, None), &mut target, ms(0));

        let mut seen = None;
        effects.apply_with(
            effect("Fortify", EffectKind::Fortify { max_health: 10 }, 5000, None),
            &mut target,
            ms(1000),
            |old, owner| seen = Some((old.state(), owner.max_health())),
        );

        // First bonus already gone, second not yet applied.
        assert_eq!(seen, Some((EffectState::Removed, 50)));
        assert_eq!(target.max_health(), 60);
    }

    #[test]
    fn test_first_application_skips_replacement_callback() {
        let mut target = owner(50);
        let mut effects = ActiveEffects::default();
        let mut called = false;
        let replaced = effects.apply_with(
            effect("Fortify", EffectKind::Fortify { max_health: 20 }, 5000, None),
            &mut target,
            ms(0),
            |_, _| called = true,
        );
        assert!(replaced.is_none());
        assert!(!called);
    }

    #[test]
    fn test_huge_bonuses_saturate() {
        assert_eq!(EffectKind::Strength { bonus: i32::MAX }.modify_attack(10), i32::MAX);
        assert_eq!(EffectKind::Strength { bonus: i32::MIN }.modify_attack(-10), i32::MIN);

        let mut target = owner(50);
        let mut effects = ActiveEffects::default();
        effects.apply(effect("Fortify", EffectKind::Fortify { max_health: i32::MAX }, 1000, None), &mut target, ms(0));
        assert_eq!(target.max_health(), i32::MAX);
        assert_eq!(target.health(), i32::MAX);

        effects.update(&mut target, ms(1000));
        assert!(target.max_health() >= 1);
        assert!(target.health() <= target.max_health());
    }

    #[test]
    fn test_attack_modifiers_fold_in_activation_order() {
        let mut target = owner(50);

        let mut effects = ActiveEffects::default();
        effects.apply(effect("Strength", EffectKind::Strength { bonus: 5 }, 5000, None), &mut target, ms(0));
        effects.apply(effect("Empower", EffectKind::Empower { factor: 1.0 }, 5000, None), &mut target, ms(0));
        assert_eq!(effects.modify_attack_power(10), 15);

        let mut add_then_double = ActiveEffects::default();
        add_then_double.apply(effect("Strength", EffectKind::Strength { bonus: 5 }, 5000, None), &mut target, ms(0));
        add_then_double.apply(effect("Empower", EffectKind::Empower { factor: 2.0 }, 5000, None), &mut target, ms(0));

        let mut double_then_add = ActiveEffects::default();
        double_then_add.apply(effect("Empower", EffectKind::Empower { factor: 2.0 }, 5000, None), &mut target, ms(0));
        double_then_add.apply(effect("Strength", EffectKind::Strength { bonus: 5 }, 5000, None), &mut target, ms(0));

        assert_eq!(add_then_double.modify_attack_power(10), 30);
        assert_eq!(double_then_add.modify_attack_power(10), 25);
    }

    #[test]
    fn test_no_effects_leaves_attack_unchanged() {
        assert_eq!(ActiveEffects::default().modify_attack_power(12), 12);
    }

    #[test]
    fn test_zero_duration_expires_on_next_update() {
        let mut target = owner(50);
        let mut effects = ActiveEffects::default();
        effects.apply(effect("Haste", EffectKind::Haste { percent: 50.0 }, 0, None), &mut target, ms(100));
        assert!((target.effective_speed() - 3.0).abs() < 1e-6);

        let expired = effects.update(&mut target, ms(100));
        assert_eq!(expired.len(), 1);
        assert!((target.effective_speed() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let err = StatusEffect::new("Broken", EffectKind::Poison { damage: 1 }, ms(1000), Some(Duration::ZERO));
        assert!(matches!(err, Err(ConfigError::InvalidTickInterval { .. })));
    }

    #[test]
    fn test_inactive_effect_counts_as_expired() {
        let fresh = effect("Poison", EffectKind::Poison { damage: 1 }, 1000, Some(100));
        assert_eq!(fresh.state(), EffectState::Inactive);
        assert!(fresh.is_expired(ms(0)));
    }

    #[test]
    fn test_manual_remove_and_clear_run_reversal() {
        let mut target = owner(50);
        let mut effects = ActiveEffects::default();
        effects.apply(effect("Haste", EffectKind::Haste { percent: 25.0 }, 5000, None), &mut target, ms(0));
        effects.apply(effect("Fortify", EffectKind::Fortify { max_health: 10 }, 5000, None), &mut target, ms(0));

        let removed = effects.remove("Haste", &mut target).unwrap();
        assert_eq!(removed.state(), EffectState::Removed);
        assert_eq!(target.speed_modifier(), 0.0);
        assert!(effects.remove("Haste", &mut target).is_none());

        let cleared = effects.clear(&mut target);
        assert_eq!(cleared.len(), 1);
        assert_eq!(target.max_health(), 50);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_regeneration_heals_on_interval() {
        let mut target = owner(40);
        target.take_damage(20);
        let mut effects = ActiveEffects::default();
        effects.apply(
            effect("Regeneration", EffectKind::Regeneration { heal: 4 }, 2000, Some(500)),
            &mut target,
            ms(0),
        );

        effects.update(&mut target, ms(1200));
        assert_eq!(target.health(), 28);
    }
}
