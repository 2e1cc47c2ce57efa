//! Error types
//!
//! Two families of failures exist in the simulation core:
//! - [`ConfigError`]: bad data or wiring detected while building the game.
//!   These are fatal and surface before the first tick runs.
//! - [`TickError`]: a single simulation step could not complete. The scheduler
//!   logs these and carries on with the next tick.
//!
//! Missing resources during play (no weapon equipped, nothing in range) are not
//! errors at all; they show up as [`crate::sim::AttackOutcome`] variants and
//! combat log entries.

use thiserror::Error;

/// Fatal configuration and construction errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("tick rate must be positive, got {0}")]
    InvalidTickRate(u32),

    #[error("status effect `{name}` has a non-positive tick interval ({interval_ms} ms)")]
    InvalidTickInterval { name: String, interval_ms: i64 },

    #[error("weapon `{name}`: {reason}")]
    InvalidWeapon { name: String, reason: String },

    #[error("unknown weapon `{0}`")]
    UnknownWeapon(String),

    #[error("unknown status effect `{0}`")]
    UnknownEffect(String),

    #[error("unknown enemy kind `{0}`")]
    UnknownEnemy(String),

    #[error("level `{level}`: {reason}")]
    InvalidLevel { level: String, reason: String },

    #[error("{0}")]
    Invalid(String),
}

/// Transient per-tick failures. The tick is abandoned, state is left as-is.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("player entity is missing from the world")]
    MissingPlayer,

    #[error("level transition to index {index} failed: {source}")]
    LevelLoad {
        index: usize,
        #[source]
        source: ConfigError,
    },

    #[error("simulation step panicked: {0}")]
    Panicked(String),
}
