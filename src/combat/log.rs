//! Combat logging
//!
//! Records combat and run events for the presentation layer and for
//! post-run analysis in headless mode.

use bevy::prelude::*;

/// A single entry in the combat log
#[derive(Debug, Clone)]
pub struct CombatLogEntry {
    /// Simulation time in seconds when the entry was written
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatLogEventType {
    /// Damage dealt
    Damage,
    /// Healing done
    Healing,
    /// An attack went off
    AttackStarted,
    /// An attack was refused (no weapon equipped)
    AttackRejected,
    /// Status effect attached
    EffectApplied,
    /// Status effect removed by hand or replaced
    EffectRemoved,
    /// Status effect ran out
    EffectExpired,
    /// Combatant died
    Death,
    /// Level loaded or portal taken
    LevelEvent,
    /// Run event (start, end, etc.)
    MatchEvent,
}

/// The combat log resource storing all events
#[derive(Resource, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current simulation time in seconds
    pub match_time: f32,
}

impl CombatLog {
    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn count(&self, event_type: CombatLogEventType) -> usize {
        self.entries.iter().filter(|e| e.event_type == event_type).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_carry_current_time() {
        let mut log = CombatLog::default();
        log.log(CombatLogEventType::MatchEvent, "start".to_string());
        log.match_time = 1.5;
        log.log(CombatLogEventType::Damage, "hit".to_string());

        assert_eq!(log.entries[0].timestamp, 0.0);
        assert_eq!(log.entries[1].timestamp, 1.5);
    }

    #[test]
    fn test_filter_and_count_by_type() {
        let mut log = CombatLog::default();
        log.log(CombatLogEventType::Damage, "a".to_string());
        log.log(CombatLogEventType::Healing, "b".to_string());
        log.log(CombatLogEventType::Damage, "c".to_string());
        log.log(CombatLogEventType::Death, "d".to_string());

        let damage: Vec<_> = log
            .filter_by_type(CombatLogEventType::Damage)
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(damage, vec!["a", "c"]);
        assert_eq!(log.count(CombatLogEventType::Death), 1);
        assert_eq!(log.count(CombatLogEventType::EffectExpired), 0);
    }
}
