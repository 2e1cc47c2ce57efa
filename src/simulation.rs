//! Simulation step orchestrator
//!
//! [`Simulation`] owns the bevy `App` holding the game world and runs the
//! per-tick schedule. Each step:
//!
//! 1. applies queued inventory commands,
//! 2. advances simulation time and polls input once,
//! 3. runs the system phases,
//! 4. publishes stats and asks the presentation layer to redraw,
//! 5. records the run once it reaches a terminal outcome.
//!
//! Other threads talk to it only through a [`SimulationHandle`] (commands in)
//! and [`SharedStats`] (state out).

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::log::{CombatLog, CombatLogEventType};
use crate::config::GameConfig;
use crate::error::{ConfigError, TickError};
use crate::scheduler::{SharedStats, SimulationStep, StepStatus};
use crate::services::{Audio, NoopNotifier, NoopRecorder, PresentationNotifier, RunRecorder, RunSummary};
use crate::sim::match_flow::load_level;
use crate::sim::{
    build_schedule, ActiveEffects, Combatant, CurrentLevel, EffectPending, Equipment, InputProvider, InputState,
    MatchState, Outcome, Player, ScriptedInput, SimClock, SimPlugin, TickFaults,
};

/// Inventory requests from outside the simulation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimCommand {
    /// Apply a configured status effect to the player (consumable use)
    ApplyEffect(String),
    /// Equip a configured weapon, replacing the current one
    Equip(String),
    Unequip,
}

/// Cloneable sender for [`SimCommand`]s.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    tx: Sender<SimCommand>,
}

impl SimulationHandle {
    /// Returns false when the simulation is gone.
    pub fn send(&self, command: SimCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn apply_effect(&self, name: impl Into<String>) -> bool {
        self.send(SimCommand::ApplyEffect(name.into()))
    }

    pub fn equip(&self, weapon: impl Into<String>) -> bool {
        self.send(SimCommand::Equip(weapon.into()))
    }

    pub fn unequip(&self) -> bool {
        self.send(SimCommand::Unequip)
    }
}

/// Everything needed to build a [`Simulation`]. `Send`, so it can be moved
/// into the scheduler's factory and built on the simulation thread.
pub struct SimulationBuilder {
    config: GameConfig,
    seed: Option<u64>,
    input: Box<dyn InputProvider>,
    notifier: Box<dyn PresentationNotifier>,
    recorder: Box<dyn RunRecorder>,
    audio: Audio,
    stats: Arc<SharedStats>,
    max_duration: Option<Duration>,
    logging: bool,
    tx: Sender<SimCommand>,
    rx: Receiver<SimCommand>,
}

impl SimulationBuilder {
    pub fn new(config: GameConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            seed: None,
            input: Box::new(ScriptedInput::default()),
            notifier: Box::new(NoopNotifier),
            recorder: Box::new(NoopRecorder),
            audio: Audio::silent(),
            stats: Arc::new(SharedStats::default()),
            max_duration: None,
            logging: false,
            tx,
            rx,
        }
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn input(mut self, input: impl InputProvider + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn notifier(mut self, notifier: impl PresentationNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn recorder(mut self, recorder: impl RunRecorder + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    pub fn audio(mut self, audio: Audio) -> Self {
        self.audio = audio;
        self
    }

    pub fn stats(mut self, stats: Arc<SharedStats>) -> Self {
        self.stats = stats;
        self
    }

    /// End the run as a timeout after this much simulated time.
    pub fn max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Install bevy's `LogPlugin` in the simulation app.
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// A handle that stays connected to the simulation built from this builder.
    pub fn handle(&self) -> SimulationHandle {
        SimulationHandle { tx: self.tx.clone() }
    }

    pub fn build(self) -> Result<Simulation, ConfigError> {
        self.config.validate()?;

        let mut app = App::new();
        if self.logging {
            app.add_plugins(LogPlugin::default());
        }
        app.insert_resource(self.audio);
        app.add_plugins(SimPlugin {
            config: self.config,
            seed: self.seed,
        });

        load_level(app.world_mut(), 0)?;
        app.world_mut()
            .resource_mut::<CombatLog>()
            .log(CombatLogEventType::MatchEvent, "Run started".to_string());

        let mut simulation = Simulation {
            app,
            schedule: build_schedule(),
            input: self.input,
            notifier: self.notifier,
            recorder: self.recorder,
            stats: self.stats,
            max_duration: self.max_duration,
            commands: self.rx,
            tx: self.tx,
            recorded: false,
        };
        simulation.publish();
        Ok(simulation)
    }
}

pub struct Simulation {
    app: App,
    schedule: Schedule,
    input: Box<dyn InputProvider>,
    notifier: Box<dyn PresentationNotifier>,
    recorder: Box<dyn RunRecorder>,
    stats: Arc<SharedStats>,
    max_duration: Option<Duration>,
    commands: Receiver<SimCommand>,
    tx: Sender<SimCommand>,
    recorded: bool,
}

impl Simulation {
    pub fn handle(&self) -> SimulationHandle {
        SimulationHandle { tx: self.tx.clone() }
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn stats(&self) -> &Arc<SharedStats> {
        &self.stats
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.world().resource::<MatchState>().outcome
    }

    pub fn now(&self) -> Duration {
        self.world().resource::<SimClock>().now
    }

    pub fn combat_log(&self) -> &CombatLog {
        self.world().resource::<CombatLog>()
    }

    pub fn current_level(&self) -> &CurrentLevel {
        self.world().resource::<CurrentLevel>()
    }

    fn player_entity(&mut self) -> Option<Entity> {
        let world = self.app.world_mut();
        world.query_filtered::<Entity, With<Player>>().iter(world).next()
    }

    pub fn player(&mut self) -> Option<&Combatant> {
        let entity = self.player_entity()?;
        self.world().get::<Combatant>(entity)
    }

    pub fn player_effects(&mut self) -> Option<&ActiveEffects> {
        let entity = self.player_entity()?;
        self.world().get::<ActiveEffects>(entity)
    }

    pub fn summary(&mut self) -> RunSummary {
        let player_health = self.player().map_or(0, Combatant::health);
        let world = self.app.world();
        let clock = world.resource::<SimClock>();
        let state = world.resource::<MatchState>();
        let level = world.resource::<CurrentLevel>();
        RunSummary {
            outcome: state.outcome.unwrap_or(Outcome::Timeout),
            elapsed_secs: clock.now.as_secs_f32(),
            level_reached: level.index,
            level_name: level.name.clone(),
            enemies_defeated: state.enemies_defeated,
            player_health,
            ticks: clock.tick,
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: SimCommand) {
        let Some(player) = self.player_entity() else {
            warn!("Dropping {:?}: no player", command);
            return;
        };
        let world = self.app.world_mut();

        match command {
            SimCommand::ApplyEffect(name) => match world.resource::<GameConfig>().effect(&name) {
                Ok(effect) => {
                    world.spawn(EffectPending { target: player, effect });
                }
                Err(e) => warn!("Cannot apply effect: {}", e),
            },
            SimCommand::Equip(name) => match world.resource::<GameConfig>().weapon(&name) {
                Ok(weapon) => {
                    if let Some(mut equipment) = world.get_mut::<Equipment>(player) {
                        let previous = equipment.equip(weapon);
                        let message = match previous {
                            Some(old) => format!("Equipped {} (was {})", name, old.name()),
                            None => format!("Equipped {}", name),
                        };
                        world.resource_mut::<CombatLog>().log(CombatLogEventType::MatchEvent, message);
                    }
                }
                Err(e) => warn!("Cannot equip: {}", e),
            },
            SimCommand::Unequip => {
                if let Some(mut equipment) = world.get_mut::<Equipment>(player) {
                    if let Some(old) = equipment.unequip() {
                        let message = format!("Unequipped {}", old.name());
                        world.resource_mut::<CombatLog>().log(CombatLogEventType::MatchEvent, message);
                    }
                }
            }
        }
    }

    fn publish(&mut self) {
        let health = self.player().map_or(0.0, Combatant::health_fraction);
        let world = self.app.world();
        let clock = world.resource::<SimClock>();
        self.stats.record_tick(clock.tick, clock.now);
        self.stats.set_outcome(world.resource::<MatchState>().outcome);
        self.stats.set_player_health(health);
    }

    fn record_outcome(&mut self) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        let summary = self.summary();
        if let Err(e) = self.recorder.save_run(&summary) {
            error!("Failed to record run: {}", e);
        }
    }
}

impl SimulationStep for Simulation {
    fn step(&mut self, dt: Duration) -> Result<StepStatus, TickError> {
        if self.recorded {
            return Ok(StepStatus::Finished);
        }

        self.drain_commands();
        if self.player_entity().is_none() {
            return Err(TickError::MissingPlayer);
        }

        let snapshot = self.input.poll();
        let world = self.app.world_mut();
        let now = {
            let mut clock = world.resource_mut::<SimClock>();
            clock.advance(dt);
            clock.now
        };
        world.resource_mut::<CombatLog>().match_time = now.as_secs_f32();
        world.resource_mut::<InputState>().push(snapshot);

        self.schedule.run(world);

        let faults = std::mem::take(&mut world.resource_mut::<TickFaults>().0);

        let timed_out = self
            .max_duration
            .is_some_and(|limit| now >= limit && world.resource::<MatchState>().outcome.is_none());
        if timed_out {
            world.resource_mut::<MatchState>().outcome = Some(Outcome::Timeout);
            world
                .resource_mut::<CombatLog>()
                .log(CombatLogEventType::MatchEvent, "Run ended: Timeout".to_string());
            info!("Run timed out after {:.1}s", now.as_secs_f32());
        }

        self.publish();
        self.notifier.request_redraw();

        let finished = self.outcome().is_some();
        if finished {
            self.record_outcome();
        }

        let mut faults = faults.into_iter();
        if let Some(first) = faults.next() {
            for extra in faults {
                error!("Additional tick fault: {}", extra);
            }
            return Err(first);
        }

        Ok(if finished { StepStatus::Finished } else { StepStatus::Running })
    }
}
