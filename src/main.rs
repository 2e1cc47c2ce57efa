//! DungeonSim - headless action game simulation
//!
//! Runs a scripted session against the configured dungeon and prints the run
//! summary as JSON.

use dungeonsim::cli::parse_args;
use dungeonsim::config::GameConfig;
use dungeonsim::headless::run_headless;

fn main() {
    let args = parse_args();

    if args.validate {
        match GameConfig::load(&args.config) {
            Ok(config) => {
                println!(
                    "{} is valid: {} levels at {} ticks/s",
                    args.config.display(),
                    config.levels.len(),
                    config.tick_rate
                );
                return;
            }
            Err(e) => {
                eprintln!("Invalid game config: {}", e);
                std::process::exit(1);
            }
        }
    }

    let run_config = match args.run_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load run config: {}", e);
            std::process::exit(1);
        }
    };

    match run_headless(&run_config, true) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize run summary: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        }
    }
}
