//! Component Definitions
//!
//! ECS components and resources shared by the simulation systems: the
//! combatant entity model, role markers, the simulation clock and match state.

use std::time::Duration;

use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::geometry::{Aabb, Facing};
use crate::error::TickError;

// ============================================================================
// Resources
// ============================================================================

/// Simulation time. Advanced by the tick delta only, so paused wall-clock time
/// never reaches effect timers or cooldowns.
#[derive(Resource, Debug, Clone, Default)]
pub struct SimClock {
    /// Total simulated time since the run started
    pub now: Duration,
    /// Delta of the tick being processed
    pub delta: Duration,
    /// Number of ticks processed so far
    pub tick: u64,
}

impl SimClock {
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.now += delta;
        self.tick += 1;
    }
}

/// Seeded random number generator for enemy behaviour.
///
/// When a seed is provided (e.g., via headless config), enemy wandering is
/// reproducible. Without a seed, uses system entropy.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn random_range(&mut self, min: u32, max: u32) -> u32 {
        self.rng.gen_range(min..=max)
    }

    pub fn random_facing(&mut self) -> Facing {
        match self.rng.gen_range(0..4) {
            0 => Facing::Up,
            1 => Facing::Down,
            2 => Facing::Left,
            _ => Facing::Right,
        }
    }

    /// True with probability `chance` (0.0-1.0).
    pub fn chance(&mut self, chance: f32) -> bool {
        self.rng.gen::<f32>() < chance
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Errors raised by systems during the current tick; drained by the step.
#[derive(Resource, Default)]
pub struct TickFaults(pub Vec<TickError>);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Victory,
    Defeat,
    /// The run hit its time limit without a decision (headless runs only)
    Timeout,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Victory => 1,
            Outcome::Defeat => 2,
            Outcome::Timeout => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Outcome::Victory),
            2 => Some(Outcome::Defeat),
            3 => Some(Outcome::Timeout),
            _ => None,
        }
    }
}

/// Progress of the current run.
#[derive(Resource, Debug, Default)]
pub struct MatchState {
    /// Set once; terminal
    pub outcome: Option<Outcome>,
    /// Level index requested by a portal this tick
    pub pending_transition: Option<usize>,
    /// Whether the current level contains a boss
    pub boss_present: bool,
    pub enemies_defeated: u32,
}

// ============================================================================
// Entity model
// ============================================================================

/// Marker for the player character.
#[derive(Component, Debug)]
pub struct Player;

/// Marker for regular enemies.
#[derive(Component, Debug)]
pub struct Enemy;

/// Marker for the level boss.
#[derive(Component, Debug)]
pub struct Boss;

/// Marker for everything spawned by a level load (enemies, traps,
/// projectiles); despawned when the next level loads.
#[derive(Component, Debug)]
pub struct LevelEntity;

/// Added when a combatant's health reaches zero; the entity is despawned once
/// the death grace period has elapsed.
#[derive(Component, Debug)]
pub struct DeathTimer {
    pub died_at: Duration,
}

/// Idle movement state for enemies outside aggro range.
#[derive(Component, Debug, Default)]
pub struct Wander {
    pub direction: Option<Facing>,
    pub ticks_left: u32,
}

/// Any entity that fights: player, enemies and the boss.
///
/// Health only changes through [`Combatant::take_damage`], [`Combatant::heal`]
/// and the max-health adjustments used by status effects, so
/// `is_alive() == (health > 0)` always holds.
#[derive(Component, Debug, Clone)]
pub struct Combatant {
    /// Display name used in the combat log
    pub name: String,
    /// Top-left corner in pixels
    pub position: Vec2,
    /// Bounding box size in pixels
    pub size: Vec2,
    pub facing: Facing,
    health: i32,
    max_health: i32,
    /// Attack power before status-effect modifiers
    pub base_attack: i32,
    /// Pixels per tick before modifiers
    pub base_speed: f32,
    /// Sum of active speed modifiers as fractions (0.25 = +25%)
    speed_modifier: f32,
}

impl Combatant {
    pub fn new(name: impl Into<String>, position: Vec2, size: Vec2, health: i32, base_attack: i32, base_speed: f32) -> Self {
        let health = health.max(1);
        Self {
            name: name.into(),
            position,
            size,
            facing: Facing::default(),
            health,
            max_health: health,
            base_attack,
            base_speed,
            speed_modifier: 0.0,
        }
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Fraction of max health remaining, 0.0-1.0.
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }

    /// Apply damage, returning the amount actually removed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let dealt = amount.max(0).min(self.health);
        self.health -= dealt;
        dealt
    }

    /// Heal a living combatant up to max health, returning the amount restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let restored = amount.max(0).min(self.max_health - self.health);
        self.health += restored;
        restored
    }

    /// Raise max health, granting the same amount of current health.
    pub fn raise_max_health(&mut self, amount: i32) {
        let amount = amount.max(0);
        self.max_health = self.max_health.saturating_add(amount);
        if self.is_alive() {
            self.health = self.health.saturating_add(amount);
        }
    }

    /// Lower max health (never below 1), clamping current health to it.
    pub fn lower_max_health(&mut self, amount: i32) {
        self.max_health = self.max_health.saturating_sub(amount.max(0)).max(1);
        self.health = self.health.min(self.max_health);
    }

    pub fn speed_modifier(&self) -> f32 {
        self.speed_modifier
    }

    pub fn add_speed_modifier(&mut self, delta: f32) {
        self.speed_modifier += delta;
    }

    /// Movement per tick after modifiers; never negative.
    pub fn effective_speed(&self) -> f32 {
        (self.base_speed * (1.0 + self.speed_modifier)).max(0.0)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.bounds().center()
    }
}
