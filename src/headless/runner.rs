//! Headless run execution
//!
//! Runs the game without any presentation, driven by scripted input. By
//! default ticks are stepped back to back with a fixed delta; with `realtime`
//! the run goes through the [`Scheduler`] thread at the configured tick rate.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bevy::prelude::*;

use crate::config::GameConfig;
use crate::error::ConfigError;
use crate::scheduler::{Scheduler, SharedStats, SimulationStep, StepStatus};
use crate::services::{Audio, JsonRunRecorder, LoggingAudio, RunRecorder, RunSummary};
use crate::sim::ScriptedInput;
use crate::simulation::{SimulationBuilder, SimulationHandle};

use super::config::{HeadlessRunConfig, TimedCommand};

/// How often the realtime runner checks for due commands and the end of the run.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Forwards the summary to the runner and optionally writes it to disk.
struct HeadlessRecorder {
    file: Option<JsonRunRecorder>,
    tx: Sender<RunSummary>,
}

impl RunRecorder for HeadlessRecorder {
    fn save_run(&mut self, summary: &RunSummary) -> Result<(), ConfigError> {
        let _ = self.tx.send(summary.clone());
        match self.file.as_mut() {
            Some(file) => file.save_run(summary),
            None => Ok(()),
        }
    }
}

/// Sends every command scheduled at or before `tick` that has not gone out yet.
fn send_due_commands(handle: &SimulationHandle, commands: &[TimedCommand], next: &mut usize, tick: u64) {
    while let Some(timed) = commands.get(*next) {
        if timed.at_tick > tick {
            break;
        }
        handle.send(timed.command.clone());
        *next += 1;
    }
}

/// Run a headless game with the given configuration
pub fn run_headless(config: &HeadlessRunConfig, logging: bool) -> Result<RunSummary, ConfigError> {
    config.validate()?;
    let game = GameConfig::load(&config.game_config)?;
    run_headless_with(config, game, logging)
}

/// Like [`run_headless`] with an already loaded game config.
pub fn run_headless_with(
    config: &HeadlessRunConfig,
    game: GameConfig,
    logging: bool,
) -> Result<RunSummary, ConfigError> {
    let tick_rate = game.tick_rate;
    let tick_interval = game.tick_interval();
    let max_delta = game.max_frame_delta();
    config.validate()?;
    let max_duration = config.max_duration()?;

    let mut commands = config.commands.clone();
    commands.sort_by_key(|c| c.at_tick);

    let (summary_tx, summary_rx) = mpsc::channel();
    let recorder = HeadlessRecorder {
        file: config.output_path.as_ref().map(|path| JsonRunRecorder::new(path.clone())),
        tx: summary_tx,
    };

    let stats = Arc::new(SharedStats::default());
    let builder = SimulationBuilder::new(game)
        .seed(config.random_seed)
        .input(ScriptedInput::new(config.input.clone()))
        .recorder(recorder)
        .audio(Audio::new(LoggingAudio))
        .stats(Arc::clone(&stats))
        .max_duration(Some(max_duration))
        .with_logging(logging);
    let handle = builder.handle();

    match config.random_seed {
        Some(seed) => info!("Using deterministic RNG with seed: {}", seed),
        None => info!("Using non-deterministic RNG (no seed provided)"),
    }

    let mut next_command = 0;
    if config.realtime {
        let mut scheduler = Scheduler::new(tick_rate, Arc::clone(&stats))?.with_max_delta(max_delta);
        scheduler.start(move || builder.build())?;
        while scheduler.is_running() {
            send_due_commands(&handle, &commands, &mut next_command, stats.ticks() + 1);
            thread::sleep(POLL_INTERVAL);
        }
        scheduler.wait();
    } else {
        let mut simulation = builder.build()?;
        // Ticks that fail outright do not advance simulated time, so bound the
        // loop by tick count as well.
        let max_ticks = (max_duration.as_secs_f64() / tick_interval.as_secs_f64()).ceil() as u64 + 1;
        for tick in 1..=max_ticks {
            send_due_commands(&handle, &commands, &mut next_command, tick);
            match simulation.step(tick_interval) {
                Ok(StepStatus::Finished) => break,
                Ok(StepStatus::Running) => {}
                Err(e) => error!("Tick {} failed: {}", tick, e),
            }
        }
    }

    summary_rx
        .try_recv()
        .map_err(|_| ConfigError::Invalid("run ended without an outcome".to_string()))
}
