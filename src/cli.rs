//! Command-line interface for DungeonSim
//!
//! Runs scripted headless sessions, or just checks a game config.

use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::ConfigError;
use crate::headless::HeadlessRunConfig;

/// Dungeon action game simulator
#[derive(Parser, Debug)]
#[command(name = "dungeonsim")]
#[command(about = "Headless dungeon action game simulator")]
#[command(version)]
pub struct Args {
    /// RON game config (tick rate, weapons, effects, levels)
    #[arg(long, value_name = "GAME_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// JSON run file with scripted input and commands
    #[arg(long, value_name = "RUN_FILE")]
    pub run: Option<PathBuf>,

    /// Output path for the run summary
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum simulated run duration in seconds
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tick at the configured rate on the scheduler thread
    #[arg(long)]
    pub realtime: bool,

    /// Only load and validate the game config, then exit
    #[arg(long)]
    pub validate: bool,
}

impl Args {
    /// The run configuration: the run file if given, then command-line overrides.
    pub fn run_config(&self) -> Result<HeadlessRunConfig, ConfigError> {
        let mut config = match &self.run {
            Some(path) => HeadlessRunConfig::load_from_file(path)?,
            None => HeadlessRunConfig {
                game_config: self.config.clone(),
                ..Default::default()
            },
        };

        if self.config != PathBuf::from(DEFAULT_CONFIG_PATH) {
            config.game_config = self.config.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = Some(output.clone());
        }
        if let Some(secs) = self.max_duration {
            config.max_duration_secs = secs;
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }
        if self.realtime {
            config.realtime = true;
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn parse_args() -> Args {
    Args::parse()
}
