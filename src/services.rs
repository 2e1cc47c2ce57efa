//! Collaborator boundaries
//!
//! Everything the simulation talks to but does not own: audio playback, the
//! presentation layer and the run recorder. Each is a trait object handed in
//! at construction, so tests and headless runs plug in no-op or capturing
//! implementations.

use std::fs;
use std::path::PathBuf;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Swing,
    Shoot,
    Hit,
    PlayerHurt,
    EffectApplied,
    Death,
    Portal,
    Victory,
    Defeat,
}

/// Fire-and-forget sound playback.
pub trait AudioSink: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// Discards every cue.
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&self, _cue: SoundCue) {}
}

/// Writes cues to the debug log.
pub struct LoggingAudio;

impl AudioSink for LoggingAudio {
    fn play(&self, cue: SoundCue) {
        debug!("sound cue: {:?}", cue);
    }
}

/// Audio handle available to systems.
#[derive(Resource)]
pub struct Audio(Box<dyn AudioSink>);

impl Audio {
    pub fn new(sink: impl AudioSink + 'static) -> Self {
        Self(Box::new(sink))
    }

    pub fn silent() -> Self {
        Self::new(SilentAudio)
    }

    pub fn play(&self, cue: SoundCue) {
        self.0.play(cue);
    }
}

impl Default for Audio {
    fn default() -> Self {
        Self::silent()
    }
}

/// Told after every tick that published state changed.
pub trait PresentationNotifier: Send {
    fn request_redraw(&mut self);
}

pub struct NoopNotifier;

impl PresentationNotifier for NoopNotifier {
    fn request_redraw(&mut self) {}
}

/// Summary persisted when a run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub elapsed_secs: f32,
    pub level_reached: usize,
    pub level_name: String,
    pub enemies_defeated: u32,
    pub player_health: i32,
    pub ticks: u64,
}

/// Persists finished runs. Called once per run.
pub trait RunRecorder: Send {
    fn save_run(&mut self, summary: &RunSummary) -> Result<(), ConfigError>;
}

pub struct NoopRecorder;

impl RunRecorder for NoopRecorder {
    fn save_run(&mut self, _summary: &RunSummary) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Writes the summary as pretty-printed JSON.
pub struct JsonRunRecorder {
    path: PathBuf,
}

impl JsonRunRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RunRecorder for JsonRunRecorder {
    fn save_run(&mut self, summary: &RunSummary) -> Result<(), ConfigError> {
        let path = self.path.display().to_string();
        let json = serde_json::to_string_pretty(summary).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        info!("Run summary written to {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_recorder_writes_summary() {
        let path = std::env::temp_dir().join(format!("dungeonsim_summary_{}.json", std::process::id()));
        let summary = RunSummary {
            outcome: Outcome::Victory,
            elapsed_secs: 12.5,
            level_reached: 1,
            level_name: "Crypt".to_string(),
            enemies_defeated: 3,
            player_health: 40,
            ticks: 750,
        };

        JsonRunRecorder::new(&path).save_run(&summary).unwrap();
        let written: RunSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(written, summary);
    }
}
