//! Data-driven game configuration
//!
//! Tick rate, player stats, weapons, status effects, enemies and levels are
//! defined in `assets/config/game.ron` instead of being hardcoded. The file is
//! validated as a whole at load time, so a bad name or a malformed layout is
//! reported before the first tick runs.
//!
//! ## Usage
//! ```ignore
//! let config = GameConfig::load(Path::new("assets/config/game.ron"))?;
//! let sword = config.weapon("Sword")?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::map::{parse_layout, ParsedLayout};
use crate::sim::{AttackStrategy, EffectKind, StatusEffect, Weapon};

/// Default path of the game config, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "assets/config/game.ron";

const BUILTIN_CONFIG: &str = include_str!("../assets/config/game.ron");

fn default_tile_size() -> f32 {
    32.0
}

fn default_max_frame_delta_ms() -> u64 {
    250
}

/// Root of `game.ron`.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Target ticks per second
    pub tick_rate: u32,
    /// Edge length of a tile in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    /// Minimum time between two contact attacks of the same enemy
    pub enemy_attack_cooldown_ms: u64,
    /// How long a dead enemy stays in the world before it is despawned
    pub death_grace_ms: u64,
    /// Enemies closer than this (pixels, center to center) chase the player
    pub aggro_radius: f32,
    /// Upper bound on a single tick's delta, so a stall does not fast-forward
    /// the world
    #[serde(default = "default_max_frame_delta_ms")]
    pub max_frame_delta_ms: u64,
    pub player: PlayerConfig,
    pub weapons: HashMap<String, WeaponConfig>,
    pub effects: HashMap<String, EffectConfig>,
    pub enemies: HashMap<String, EnemyConfig>,
    pub boss: EnemyConfig,
    pub levels: Vec<LevelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    pub health: i32,
    pub attack: i32,
    /// Pixels per tick
    pub speed: f32,
    pub size: (f32, f32),
    /// Weapon equipped at the start of the run
    #[serde(default)]
    pub weapon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponConfig {
    pub damage: i32,
    pub cooldown_ms: u64,
    pub strategy: AttackStrategy,
}

impl WeaponConfig {
    /// Projectiles must move and have a hitbox, or they would never leave the
    /// world.
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidWeapon {
            name: name.to_string(),
            reason,
        };
        if self.damage < 0 {
            return Err(invalid(format!("damage must not be negative, got {}", self.damage)));
        }
        match self.strategy {
            AttackStrategy::Melee { range } => {
                if !(range.is_finite() && range > 0.0) {
                    return Err(invalid(format!("melee range must be positive, got {range}")));
                }
            }
            AttackStrategy::Ranged { speed, size } => {
                if !(speed.is_finite() && speed > 0.0) {
                    return Err(invalid(format!("projectile speed must be positive, got {speed}")));
                }
                if !(size.is_finite() && size > 0.0) {
                    return Err(invalid(format!("projectile size must be positive, got {size}")));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectConfig {
    pub kind: EffectKind,
    pub duration_ms: u64,
    /// Periodic hook interval; must be positive when present
    #[serde(default)]
    pub tick_interval_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyConfig {
    pub name: String,
    pub health: i32,
    pub attack: i32,
    pub speed: f32,
    pub size: (f32, f32),
}

impl EnemyConfig {
    fn validate(&self, kind: &str) -> Result<(), ConfigError> {
        if self.health <= 0 {
            return Err(ConfigError::Invalid(format!(
                "{kind} `{}` health must be positive, got {}",
                self.name, self.health
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    /// ASCII rows, see [`parse_layout`]
    pub layout: Vec<String>,
    /// Enemy kind spawned at every `e`
    pub enemy: String,
    /// Effect applied by every `T`
    #[serde(default)]
    pub trap_effect: Option<String>,
}

impl GameConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source_name = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: source_name.clone(),
            source,
        })?;
        let config = Self::from_ron_str(&contents, &source_name)?;
        info!(
            "Loaded game config from {} ({} levels, {} weapons, {} effects)",
            source_name,
            config.levels.len(),
            config.weapons.len(),
            config.effects.len()
        );
        Ok(config)
    }

    /// The config bundled into the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_ron_str(BUILTIN_CONFIG, "<builtin>")
    }

    pub fn from_ron_str(text: &str, source_name: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = ron::from_str(text).map_err(|e| ConfigError::Parse {
            path: source_name.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every cross reference and layout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        if self.tile_size <= 0.0 {
            return Err(ConfigError::Invalid(format!("tile_size must be positive, got {}", self.tile_size)));
        }
        if self.player.health <= 0 {
            return Err(ConfigError::Invalid("player health must be positive".to_string()));
        }
        if let Some(weapon) = &self.player.weapon {
            self.weapon(weapon)?;
        }

        for (name, weapon) in &self.weapons {
            weapon.validate(name)?;
        }
        for (kind, enemy) in &self.enemies {
            enemy.validate(kind)?;
        }
        self.boss.validate("boss")?;

        for name in self.effects.keys() {
            self.effect(name)?;
        }

        if self.levels.is_empty() {
            return Err(ConfigError::Invalid("at least one level is required".to_string()));
        }
        for index in 0..self.levels.len() {
            let level = &self.levels[index];
            self.enemy(&level.enemy)?;
            if let Some(effect) = &level.trap_effect {
                self.effect(effect)?;
            }
            self.parse_level(index)?;
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn enemy_attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.enemy_attack_cooldown_ms)
    }

    pub fn death_grace(&self) -> Duration {
        Duration::from_millis(self.death_grace_ms)
    }

    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }

    /// Build a fresh weapon by name.
    pub fn weapon(&self, name: &str) -> Result<Weapon, ConfigError> {
        let def = self
            .weapons
            .get(name)
            .ok_or_else(|| ConfigError::UnknownWeapon(name.to_string()))?;
        Ok(Weapon::new(name, def.damage, Duration::from_millis(def.cooldown_ms), def.strategy))
    }

    /// Build a fresh, inactive status effect by name.
    pub fn effect(&self, name: &str) -> Result<StatusEffect, ConfigError> {
        let def = self
            .effects
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEffect(name.to_string()))?;

        let interval = match def.tick_interval_ms {
            None => None,
            Some(ms) if ms <= 0 => {
                return Err(ConfigError::InvalidTickInterval {
                    name: name.to_string(),
                    interval_ms: ms,
                })
            }
            Some(ms) => Some(Duration::from_millis(ms as u64)),
        };

        StatusEffect::new(name, def.kind, Duration::from_millis(def.duration_ms), interval)
    }

    pub fn enemy(&self, kind: &str) -> Result<&EnemyConfig, ConfigError> {
        self.enemies
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownEnemy(kind.to_string()))
    }

    pub fn parse_level(&self, index: usize) -> Result<ParsedLayout, ConfigError> {
        let level = self
            .levels
            .get(index)
            .ok_or_else(|| ConfigError::Invalid(format!("no level with index {index}")))?;
        parse_layout(&level.name, &level.layout, self.tile_size)
    }
}
