//! Tick scheduler
//!
//! Drives a [`SimulationStep`] at a fixed cadence on a dedicated thread:
//!
//! - `start` spawns the thread and builds the simulation on it
//! - `pause` / `resume` stop simulated time without stopping the thread
//! - `stop` ends the loop after the in-flight tick and joins the thread
//!
//! The loop never propagates a failure. A step that returns an error or
//! panics is logged and the next tick runs as usual. Overrunning ticks are not
//! banked: the next tick starts immediately with whatever delta accrued.

pub mod clock;
pub mod stats;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bevy::prelude::*;

pub use clock::{FpsMeter, FrameClock};
pub use stats::{SharedStats, StatsSnapshot};

use crate::error::{ConfigError, TickError};

/// How long a paused loop sleeps before checking the flags again.
pub const PAUSE_PARK: Duration = Duration::from_millis(10);

const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    /// The run reached a terminal outcome; the loop ends
    Finished,
}

/// One tick of game logic.
pub trait SimulationStep {
    fn step(&mut self, dt: Duration) -> Result<StepStatus, TickError>;
}

pub struct Scheduler {
    tick_interval: Duration,
    max_delta: Duration,
    stats: Arc<SharedStats>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Fails when `tick_rate` is zero.
    pub fn new(tick_rate: u32, stats: Arc<SharedStats>) -> Result<Self, ConfigError> {
        if tick_rate == 0 {
            return Err(ConfigError::InvalidTickRate(tick_rate));
        }
        Ok(Self {
            tick_interval: Duration::from_secs_f64(1.0 / tick_rate as f64),
            max_delta: DEFAULT_MAX_DELTA,
            stats,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    pub fn with_max_delta(mut self, max_delta: Duration) -> Self {
        self.max_delta = max_delta;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn stats(&self) -> &Arc<SharedStats> {
        &self.stats
    }

    /// Spawn the simulation thread.
    ///
    /// `factory` runs on the new thread, so the simulation itself never has to
    /// be `Send`. Returns once the factory has finished; a factory error is
    /// returned here and no loop runs.
    pub fn start<S, F>(&mut self, factory: F) -> Result<(), ConfigError>
    where
        S: SimulationStep + 'static,
        F: FnOnce() -> Result<S, ConfigError> + Send + 'static,
    {
        if self.is_running() {
            return Err(ConfigError::Invalid("scheduler already started".to_string()));
        }
        // A loop that finished on its own leaves its handle behind.
        self.join();

        self.running.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), ConfigError>>();
        let control = LoopControl {
            tick_interval: self.tick_interval,
            max_delta: self.max_delta,
            stats: Arc::clone(&self.stats),
            running: Arc::clone(&self.running),
            paused: Arc::clone(&self.paused),
        };

        let handle = thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || {
                let sim = match factory() {
                    Ok(sim) => {
                        let _ = ready_tx.send(Ok(()));
                        sim
                    }
                    Err(e) => {
                        control.running.store(false, Ordering::Release);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_loop(sim, control);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                ConfigError::Invalid(format!("failed to spawn simulation thread: {e}"))
            })?;
        self.thread = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Scheduler started at {:?} per tick", self.tick_interval);
                Ok(())
            }
            Ok(Err(e)) => {
                self.join();
                Err(e)
            }
            Err(_) => {
                self.join();
                Err(ConfigError::Invalid("simulation thread exited during startup".to_string()))
            }
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// True while the loop thread is ticking (or parked in pause).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// End the loop after the in-flight tick and join the thread.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.join();
    }

    /// Block until the loop ends on its own (terminal outcome).
    pub fn wait(&mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Simulation thread panicked outside a tick");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct LoopControl {
    tick_interval: Duration,
    max_delta: Duration,
    stats: Arc<SharedStats>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn run_loop<S: SimulationStep>(mut sim: S, control: LoopControl) {
    let mut clock = FrameClock::new(control.max_delta);
    let mut fps = FpsMeter::default();
    // Pretend one tick just elapsed so the first step gets a real delta.
    let now = Instant::now();
    clock.start(now.checked_sub(control.tick_interval).unwrap_or(now));

    while control.running.load(Ordering::Acquire) {
        let frame_start = Instant::now();

        if control.paused.load(Ordering::Acquire) {
            clock.pause(frame_start);
            thread::sleep(PAUSE_PARK);
            continue;
        }
        if clock.is_paused() {
            clock.resume(frame_start);
        }

        let dt = clock.tick(frame_start);
        match catch_unwind(AssertUnwindSafe(|| sim.step(dt))) {
            Ok(Ok(StepStatus::Running)) => {}
            Ok(Ok(StepStatus::Finished)) => {
                info!("Simulation finished after {:.1}s", clock.elapsed().as_secs_f32());
                control.running.store(false, Ordering::Release);
                break;
            }
            Ok(Err(e)) => error!("Tick failed: {}", e),
            Err(payload) => error!("{}", TickError::Panicked(panic_message(payload.as_ref()))),
        }

        if let Some(rate) = fps.frame(Instant::now()) {
            control.stats.set_fps(rate);
        }

        let spent = frame_start.elapsed();
        if spent < control.tick_interval {
            thread::sleep(control.tick_interval - spent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct Counter {
        steps: Arc<AtomicU32>,
        finish_after: Option<u32>,
        panic_on: Option<u32>,
    }

    impl SimulationStep for Counter {
        fn step(&mut self, _dt: Duration) -> Result<StepStatus, TickError> {
            let n = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_on == Some(n) {
                panic!("step {n} exploded");
            }
            if n % 2 == 0 {
                return Err(TickError::MissingPlayer);
            }
            match self.finish_after {
                Some(limit) if n >= limit => Ok(StepStatus::Finished),
                _ => Ok(StepStatus::Running),
            }
        }
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let result = Scheduler::new(0, Arc::new(SharedStats::default()));
        assert!(matches!(result, Err(ConfigError::InvalidTickRate(0))));
    }

    #[test]
    fn test_loop_survives_errors_and_panics_until_finished() {
        let steps = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new(500, Arc::new(SharedStats::default())).unwrap();
        let counter = Counter {
            steps: Arc::clone(&steps),
            finish_after: Some(7),
            panic_on: Some(3),
        };

        scheduler.start(move || Ok(counter)).unwrap();
        scheduler.wait();

        assert_eq!(steps.load(Ordering::SeqCst), 7);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_restart_after_loop_finishes() {
        let steps = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new(500, Arc::new(SharedStats::default())).unwrap();
        let first = Counter {
            steps: Arc::clone(&steps),
            finish_after: Some(1),
            panic_on: None,
        };
        scheduler.start(move || Ok(first)).unwrap();
        while scheduler.is_running() {
            thread::sleep(Duration::from_millis(5));
        }

        steps.store(0, Ordering::SeqCst);
        let second = Counter {
            steps: Arc::clone(&steps),
            finish_after: Some(3),
            panic_on: None,
        };
        scheduler.start(move || Ok(second)).unwrap();
        scheduler.wait();
        assert_eq!(steps.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let mut scheduler = Scheduler::new(200, Arc::new(SharedStats::default())).unwrap();
        let make = || Counter {
            steps: Arc::new(AtomicU32::new(0)),
            finish_after: None,
            panic_on: None,
        };
        let counter = make();
        scheduler.start(move || Ok(counter)).unwrap();
        let again = make();
        assert!(scheduler.start(move || Ok(again)).is_err());
        scheduler.stop();
    }

    #[test]
    fn test_factory_error_is_returned_from_start() {
        let mut scheduler = Scheduler::new(60, Arc::new(SharedStats::default())).unwrap();
        let result = scheduler.start(|| -> Result<Counter, ConfigError> {
            Err(ConfigError::Invalid("no world".to_string()))
        });
        assert!(result.is_err());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_pause_holds_steps_and_stop_joins() {
        let steps = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new(200, Arc::new(SharedStats::default())).unwrap();
        let counter = Counter {
            steps: Arc::clone(&steps),
            finish_after: None,
            panic_on: None,
        };

        scheduler.start(move || Ok(counter)).unwrap();
        scheduler.pause();
        // Let any in-flight tick land before sampling.
        thread::sleep(Duration::from_millis(50));
        let paused_count = steps.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(steps.load(Ordering::SeqCst), paused_count);

        scheduler.resume();
        thread::sleep(Duration::from_millis(100));
        assert!(steps.load(Ordering::SeqCst) > paused_count);

        scheduler.stop();
        assert!(!scheduler.is_running());
    }
}
