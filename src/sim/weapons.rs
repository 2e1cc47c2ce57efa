//! Weapons and equipment
//!
//! A [`Weapon`] is immutable once built and owned by exactly one entity at a
//! time. It is not `Clone`: moving it between the inventory and an
//! [`Equipment`] slot is the only way to hand it over.

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// How a weapon turns an attack into hits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackStrategy {
    /// Swing hitting everything inside the arc in front of the attacker.
    /// `range` is the reach in pixels past the attacker's center.
    Melee { range: f32 },
    /// Fire a projectile travelling `speed` pixels per tick with a square
    /// hitbox of `size` pixels.
    Ranged { speed: f32, size: f32 },
}

#[derive(Debug)]
pub struct Weapon {
    name: String,
    damage: i32,
    cooldown: Duration,
    strategy: AttackStrategy,
}

impl Weapon {
    pub fn new(name: impl Into<String>, damage: i32, cooldown: Duration, strategy: AttackStrategy) -> Self {
        Self {
            name: name.into(),
            damage,
            cooldown,
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn strategy(&self) -> AttackStrategy {
        self.strategy
    }
}

/// Weapon slot of a combatant.
#[derive(Component, Debug, Default)]
pub struct Equipment {
    weapon: Option<Weapon>,
}

impl Equipment {
    pub fn with_weapon(weapon: Weapon) -> Self {
        Self { weapon: Some(weapon) }
    }

    pub fn weapon(&self) -> Option<&Weapon> {
        self.weapon.as_ref()
    }

    /// Put a weapon in the slot, handing back whatever was there.
    pub fn equip(&mut self, weapon: Weapon) -> Option<Weapon> {
        self.weapon.replace(weapon)
    }

    pub fn unequip(&mut self) -> Option<Weapon> {
        self.weapon.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sword() -> Weapon {
        Weapon::new("Sword", 12, Duration::from_millis(400), AttackStrategy::Melee { range: 20.0 })
    }

    #[test]
    fn test_equip_swaps_out_previous_weapon() {
        let mut slot = Equipment::with_weapon(sword());
        let bow = Weapon::new(
            "Bow",
            8,
            Duration::from_millis(600),
            AttackStrategy::Ranged { speed: 6.0, size: 6.0 },
        );

        let previous = slot.equip(bow).expect("sword was equipped");
        assert_eq!(previous.name(), "Sword");
        assert_eq!(slot.weapon().map(Weapon::name), Some("Bow"));
    }

    #[test]
    fn test_unequip_empties_slot() {
        let mut slot = Equipment::with_weapon(sword());
        assert!(slot.unequip().is_some());
        assert!(slot.weapon().is_none());
        assert!(slot.unequip().is_none());
    }
}
