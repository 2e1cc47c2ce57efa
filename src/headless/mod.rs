//! Headless mode for automated runs
//!
//! Runs the simulation without any presentation, driven by a scripted input
//! file. Suitable for testing and balancing.
//!
//! ## Usage
//!
//! ```bash
//! # Run with a scripted player
//! cargo run --release -- --run run.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "game_config": "assets/config/game.ron",
//!   "max_duration_secs": 120,
//!   "random_seed": 42,
//!   "input": [ { "ticks": 60, "intents": ["Right", "Attack"] } ],
//!   "commands": [ { "at_tick": 30, "command": { "ApplyEffect": "Strength" } } ]
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{HeadlessRunConfig, TimedCommand};
pub use runner::{run_headless, run_headless_with};
