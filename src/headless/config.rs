//! JSON configuration for headless runs
//!
//! A run file names the game config to use and scripts the player: held
//! intents per tick range plus inventory commands at given ticks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::ConfigError;
use crate::sim::InputStep;
use crate::simulation::SimCommand;

/// An inventory command sent before the given tick runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedCommand {
    pub at_tick: u64,
    pub command: SimCommand,
}

/// Headless run configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessRunConfig {
    /// Path of the RON game config
    #[serde(default = "default_game_config")]
    pub game_config: PathBuf,
    /// Simulated seconds before the run ends as a timeout (default: 300)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Random seed for reproducible enemy wandering
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Where to write the run summary JSON (optional)
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Scripted player input
    #[serde(default)]
    pub input: Vec<InputStep>,
    #[serde(default)]
    pub commands: Vec<TimedCommand>,
    /// Run on the scheduler thread at the configured tick rate instead of as
    /// fast as possible
    #[serde(default)]
    pub realtime: bool,
}

fn default_game_config() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

fn default_max_duration() -> f32 {
    300.0
}

impl Default for HeadlessRunConfig {
    fn default() -> Self {
        Self {
            game_config: default_game_config(),
            max_duration_secs: default_max_duration(),
            random_seed: None,
            output_path: None,
            input: Vec::new(),
            commands: Vec::new(),
            realtime: false,
        }
    }
}

impl HeadlessRunConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json_str(&contents, &display)
    }

    pub fn from_json_str(text: &str, source_name: &str) -> Result<Self, ConfigError> {
        let config: HeadlessRunConfig = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            path: source_name.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_duration_secs.is_finite() && self.max_duration_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_duration_secs must be a positive number of seconds, got {}",
                self.max_duration_secs
            )));
        }
        self.max_duration()?;
        Ok(())
    }

    /// The run's time limit as a `Duration`.
    pub fn max_duration(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f32(self.max_duration_secs)
            .map_err(|e| ConfigError::Invalid(format!("max_duration_secs {}: {e}", self.max_duration_secs)))
    }
}
