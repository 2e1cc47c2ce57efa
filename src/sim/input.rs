//! Input boundary
//!
//! The simulation polls an [`InputProvider`] exactly once per tick and works
//! from the resulting [`InputSnapshot`] of held intents. Keyboard handling,
//! key rebinding and the like live outside the core.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Up,
    Down,
    Left,
    Right,
    Attack,
    Interact,
}

impl Intent {
    fn bit(self) -> u8 {
        match self {
            Intent::Up => 1 << 0,
            Intent::Down => 1 << 1,
            Intent::Left => 1 << 2,
            Intent::Right => 1 << 3,
            Intent::Attack => 1 << 4,
            Intent::Interact => 1 << 5,
        }
    }
}

/// Set of intents held during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot(u8);

impl InputSnapshot {
    pub fn from_intents(intents: &[Intent]) -> Self {
        intents.iter().fold(Self::default(), |snapshot, &i| snapshot.with(i))
    }

    pub fn with(self, intent: Intent) -> Self {
        Self(self.0 | intent.bit())
    }

    pub fn is_held(&self, intent: Intent) -> bool {
        self.0 & intent.bit() != 0
    }

    /// Unnormalized movement direction; opposite intents cancel out.
    pub fn movement(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.is_held(Intent::Left) {
            dir.x -= 1.0;
        }
        if self.is_held(Intent::Right) {
            dir.x += 1.0;
        }
        if self.is_held(Intent::Up) {
            dir.y -= 1.0;
        }
        if self.is_held(Intent::Down) {
            dir.y += 1.0;
        }
        dir
    }
}

/// Latest and previous snapshot, for edge detection.
#[derive(Resource, Debug, Default)]
pub struct InputState {
    pub current: InputSnapshot,
    pub previous: InputSnapshot,
}

impl InputState {
    pub fn push(&mut self, snapshot: InputSnapshot) {
        self.previous = self.current;
        self.current = snapshot;
    }

    pub fn is_held(&self, intent: Intent) -> bool {
        self.current.is_held(intent)
    }

    pub fn just_pressed(&self, intent: Intent) -> bool {
        self.current.is_held(intent) && !self.previous.is_held(intent)
    }
}

/// Source of per-tick input. Must never block.
pub trait InputProvider: Send {
    fn poll(&mut self) -> InputSnapshot;
}

/// Hold a set of intents for a number of ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputStep {
    pub ticks: u32,
    #[serde(default)]
    pub intents: Vec<Intent>,
}

/// Plays back a fixed list of steps, then reports no input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    steps: Vec<InputStep>,
    index: usize,
    used: u32,
}

impl ScriptedInput {
    pub fn new(steps: Vec<InputStep>) -> Self {
        Self { steps, index: 0, used: 0 }
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.steps.len()
    }
}

impl InputProvider for ScriptedInput {
    fn poll(&mut self) -> InputSnapshot {
        while let Some(step) = self.steps.get(self.index) {
            if self.used < step.ticks {
                self.used += 1;
                return InputSnapshot::from_intents(&step.intents);
            }
            self.index += 1;
            self.used = 0;
        }
        InputSnapshot::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_movement_cancels_opposites() {
        let snap = InputSnapshot::from_intents(&[Intent::Left, Intent::Right, Intent::Down]);
        assert_eq!(snap.movement(), Vec2::new(0.0, 1.0));
        assert!(!snap.is_held(Intent::Attack));
    }

    #[test]
    fn test_scripted_input_plays_steps_in_order() {
        let mut input = ScriptedInput::new(vec![
            InputStep { ticks: 2, intents: vec![Intent::Right] },
            InputStep { ticks: 0, intents: vec![Intent::Up] },
            InputStep { ticks: 1, intents: vec![Intent::Attack] },
        ]);

        assert!(input.poll().is_held(Intent::Right));
        assert!(input.poll().is_held(Intent::Right));
        assert!(input.poll().is_held(Intent::Attack));
        assert_eq!(input.poll(), InputSnapshot::default());
        assert!(input.is_finished());
    }

    #[test]
    fn test_just_pressed_edges() {
        let mut state = InputState::default();
        let attack = InputSnapshot::from_intents(&[Intent::Attack]);
        state.push(attack);
        assert!(state.just_pressed(Intent::Attack));
        state.push(attack);
        assert!(state.is_held(Intent::Attack));
        assert!(!state.just_pressed(Intent::Attack));
    }
}
