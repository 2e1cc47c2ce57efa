//! Wall-clock bookkeeping for the tick loop.

use std::time::{Duration, Instant};

/// Turns wall-clock instants into tick deltas.
///
/// Time spent paused never shows up in a delta: `resume` shifts the reference
/// instant forward by the paused span. Deltas are clamped to `max_delta` so a
/// long stall (debugger, suspended laptop) does not fast-forward the world.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    paused_at: Option<Instant>,
    max_delta: Duration,
    elapsed: Duration,
}

impl FrameClock {
    pub fn new(max_delta: Duration) -> Self {
        Self {
            last: None,
            paused_at: None,
            max_delta,
            elapsed: Duration::ZERO,
        }
    }

    /// Set the reference instant; the first `tick` measures from here.
    pub fn start(&mut self, now: Instant) {
        self.last = Some(now);
        self.paused_at = None;
    }

    /// Delta since the previous tick, zero while paused or before `start`.
    pub fn tick(&mut self, now: Instant) -> Duration {
        if self.paused_at.is_some() {
            return Duration::ZERO;
        }
        let delta = match self.last {
            Some(last) => now.saturating_duration_since(last).min(self.max_delta),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.elapsed += delta;
        delta
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        let Some(paused_at) = self.paused_at.take() else {
            return;
        };
        if let Some(last) = self.last {
            self.last = Some(last + now.saturating_duration_since(paused_at));
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Sum of all deltas handed out so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Counts ticks and reports the achieved rate once per wall-clock second.
#[derive(Debug, Default)]
pub struct FpsMeter {
    window_start: Option<Instant>,
    frames: u32,
}

impl FpsMeter {
    /// Record one tick. Returns the measured rate when a full second has
    /// passed since the window opened.
    ///
    /// The tick that opens a window only marks its start and is not counted.
    pub fn frame(&mut self, now: Instant) -> Option<u32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            self.frames = 0;
            return None;
        };
        self.frames += 1;

        let window = now.saturating_duration_since(start);
        if window < Duration::from_secs(1) {
            return None;
        }
        let rate = (self.frames as f64 / window.as_secs_f64()).round() as u32;
        self.window_start = Some(now);
        self.frames = 0;
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_tick_measures_since_previous() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(ms(250));
        clock.start(t0);

        assert_eq!(clock.tick(t0 + ms(16)), ms(16));
        assert_eq!(clock.tick(t0 + ms(33)), ms(17));
        assert_eq!(clock.elapsed(), ms(33));
    }

    #[test]
    fn test_pause_is_excluded_from_delta() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(ms(250));
        clock.start(t0);
        clock.tick(t0 + ms(16));

        clock.pause(t0 + ms(20));
        assert_eq!(clock.tick(t0 + ms(300)), Duration::ZERO);
        clock.resume(t0 + ms(520));

        // 532 - 16 - 500 paused
        assert_eq!(clock.tick(t0 + ms(532)), ms(16));
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_delta_is_clamped() {
        let t0 = Instant::now();
        let mut clock = FrameClock::new(ms(100));
        clock.start(t0);
        assert_eq!(clock.tick(t0 + ms(5000)), ms(100));
    }

    #[test]
    fn test_fps_meter_reports_once_per_second() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::default();
        let mut reports = Vec::new();
        for i in 0..=60u64 {
            if let Some(rate) = meter.frame(t0 + Duration::from_micros(i * 1_000_000 / 60)) {
                reports.push(rate);
            }
        }
        assert_eq!(reports, vec![60]);
    }

    #[test]
    fn test_fps_meter_windows_share_boundary_tick() {
        let t0 = Instant::now();
        let mut meter = FpsMeter::default();
        let mut reports = Vec::new();
        for i in 0..=120u64 {
            if let Some(rate) = meter.frame(t0 + Duration::from_micros(i * 1_000_000 / 60)) {
                reports.push(rate);
            }
        }
        assert_eq!(reports, vec![60, 60]);
    }
}
