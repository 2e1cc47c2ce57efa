//! Lock-free state published by the simulation thread.
//!
//! The simulation thread is the only writer. Observers (a renderer, the
//! headless runner, tests) read individual values or a [`StatsSnapshot`];
//! none of them can block a tick.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use crate::sim::Outcome;

#[derive(Debug, Default)]
pub struct SharedStats {
    fps: AtomicU32,
    ticks: AtomicU64,
    sim_millis: AtomicU64,
    /// `f32` bits of the player's health fraction
    player_health: AtomicU32,
    /// 0 while the run is undecided, otherwise [`Outcome::code`]
    outcome: AtomicU8,
}

/// Point-in-time copy of [`SharedStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub fps: u32,
    pub ticks: u64,
    pub sim_time: Duration,
    pub player_health: f32,
    pub outcome: Option<Outcome>,
}

impl SharedStats {
    pub fn set_fps(&self, fps: u32) {
        self.fps.store(fps, Ordering::Relaxed);
    }

    pub fn fps(&self) -> u32 {
        self.fps.load(Ordering::Relaxed)
    }

    pub fn record_tick(&self, tick: u64, sim_time: Duration) {
        self.sim_millis.store(sim_time.as_millis() as u64, Ordering::Relaxed);
        self.ticks.store(tick, Ordering::Release);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn sim_time(&self) -> Duration {
        Duration::from_millis(self.sim_millis.load(Ordering::Relaxed))
    }

    pub fn set_player_health(&self, fraction: f32) {
        self.player_health.store(fraction.to_bits(), Ordering::Relaxed);
    }

    pub fn player_health(&self) -> f32 {
        f32::from_bits(self.player_health.load(Ordering::Relaxed))
    }

    pub fn set_outcome(&self, outcome: Option<Outcome>) {
        self.outcome.store(outcome.map_or(0, Outcome::code), Ordering::Release);
    }

    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::from_code(self.outcome.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fps: self.fps(),
            ticks: self.ticks(),
            sim_time: self.sim_time(),
            player_health: self.player_health(),
            outcome: self.outcome(),
        }
    }
}
