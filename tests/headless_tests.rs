//! Integration tests for headless run execution
//!
//! These tests verify that:
//! - Headless runs end with a summary even when nothing happens
//! - Summaries are written to the output path
//! - The realtime path through the scheduler thread finishes as well
//! - Seeded runs are reproducible

use dungeonsim::headless::{run_headless_with, TimedCommand};
use dungeonsim::sim::{InputStep, Intent};
use dungeonsim::{GameConfig, HeadlessRunConfig, Outcome, RunSummary, SimCommand};

fn run_config(max_duration_secs: f32, seed: Option<u64>) -> HeadlessRunConfig {
    HeadlessRunConfig {
        max_duration_secs,
        random_seed: seed,
        ..Default::default()
    }
}

#[test]
fn test_idle_run_times_out() {
    let config = run_config(1.0, Some(3));
    let summary = run_headless_with(&config, GameConfig::builtin().unwrap(), false).unwrap();

    assert_eq!(summary.outcome, Outcome::Timeout);
    assert_eq!(summary.level_reached, 0);
    assert_eq!(summary.level_name, "Cellar");
    assert_eq!(summary.player_health, 100);
    assert!(summary.elapsed_secs >= 1.0);
    assert!((60..=62).contains(&summary.ticks));
}

#[test]
fn test_summary_written_to_output_path() {
    let path = std::env::temp_dir().join(format!("dungeonsim-summary-{}.json", std::process::id()));
    let mut config = run_config(0.5, Some(3));
    config.output_path = Some(path.clone());

    let summary = run_headless_with(&config, GameConfig::builtin().unwrap(), false).unwrap();

    let written: RunSummary = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, summary);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_realtime_run_finishes_on_scheduler_thread() {
    let mut config = run_config(0.25, Some(3));
    config.realtime = true;

    let summary = run_headless_with(&config, GameConfig::builtin().unwrap(), false).unwrap();

    assert_eq!(summary.outcome, Outcome::Timeout);
    assert!(summary.ticks > 0);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let mut config = run_config(3.0, Some(42));
    config.input = vec![InputStep {
        ticks: 40,
        intents: vec![Intent::Down, Intent::Attack],
    }];
    config.commands = vec![TimedCommand {
        at_tick: 5,
        command: SimCommand::ApplyEffect("Haste".to_string()),
    }];

    let first = run_headless_with(&config, GameConfig::builtin().unwrap(), false).unwrap();
    let second = run_headless_with(&config, GameConfig::builtin().unwrap(), false).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_unbounded_duration_is_an_error_not_a_panic() {
    let config = run_config(f32::INFINITY, Some(3));
    let result = run_headless_with(&config, GameConfig::builtin().unwrap(), false);
    assert!(result.is_err());
}
