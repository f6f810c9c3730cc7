//! Virtual simulation clock

use chrono::{DateTime, Datelike, Timelike, Utc};
use satkit::{Duration, Instant};
use serde::Serialize;

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockState {
    Running,
    Paused,
}

/// Convert a chrono UTC timestamp into a satkit instant
pub fn instant_from_utc(at: &DateTime<Utc>) -> Option<Instant> {
    let seconds = at.second() as f64 + at.nanosecond().min(999_999_999) as f64 * 1e-9;
    Instant::from_datetime(
        at.year(),
        at.month() as i32,
        at.day() as i32,
        at.hour() as i32,
        at.minute() as i32,
        seconds,
    )
    .ok()
}

/// Format an instant as `YYYY-MM-DD HH:MM:SS UTC`
pub fn format_time(at: &Instant) -> String {
    let (year, month, day, hour, min, sec) = at.as_datetime();
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year, month, day, hour, min, sec as u32
    )
}

/// Format a rate multiplier for display
pub fn format_rate(rate: u32) -> String {
    match rate {
        1 => "Real time".to_string(),
        r if r % 3600 == 0 => format!("{}h/s", r / 3600),
        r if r % 60 == 0 => format!("{}min/s", r / 60),
        r => format!("{}x", r),
    }
}

/// Virtual time advanced by wall-clock deltas times a rate multiplier
///
/// Time never moves backwards except through [`SimulationClock::reset`] or
/// [`SimulationClock::reset_to`].
#[derive(Debug, Clone)]
pub struct SimulationClock {
    state: ClockState,
    time: Instant,
    rate: u32,
    min_rate: u32,
    max_rate: u32,
    presets: Vec<u32>,
}

impl SimulationClock {
    /// Running clock starting at `start` with rate bounds from `config`
    pub fn new(start: Instant, config: &EngineConfig) -> Self {
        let mut presets: Vec<u32> = config
            .rate_presets
            .iter()
            .copied()
            .filter(|r| (config.min_rate..=config.max_rate).contains(r))
            .collect();
        presets.sort_unstable();
        presets.dedup();

        let mut clock = Self {
            state: ClockState::Running,
            time: start,
            rate: config.min_rate.max(1),
            min_rate: config.min_rate.max(1),
            max_rate: config.max_rate.max(config.min_rate.max(1)),
            presets,
        };
        clock.set_rate(config.initial_rate);
        clock
    }

    /// Running clock starting at the current wall time
    pub fn now(config: &EngineConfig) -> Option<Self> {
        instant_from_utc(&Utc::now()).map(|start| Self::new(start, config))
    }

    pub fn time(&self) -> Instant {
        self.time
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn toggle(&mut self) -> ClockState {
        self.state = match self.state {
            ClockState::Running => ClockState::Paused,
            ClockState::Paused => ClockState::Running,
        };
        self.state
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state = if paused {
            ClockState::Paused
        } else {
            ClockState::Running
        };
    }

    /// Set the rate multiplier, clamped to the configured bounds
    pub fn set_rate(&mut self, rate: u32) {
        let clamped = rate.clamp(self.min_rate, self.max_rate);
        if clamped != rate {
            log::debug!("Clamped rate multiplier {} to {}", rate, clamped);
        }
        self.rate = clamped;
    }

    /// Move to the next preset above (`direction > 0`) or below the current rate
    pub fn step_rate(&mut self, direction: i32) -> u32 {
        let next = if direction > 0 {
            self.presets.iter().copied().find(|&p| p > self.rate)
        } else if direction < 0 {
            self.presets.iter().rev().copied().find(|&p| p < self.rate)
        } else {
            None
        };
        if let Some(rate) = next {
            self.set_rate(rate);
        }
        self.rate
    }

    /// Advance by `wall_delta_ms` of real time
    ///
    /// Frozen while paused. Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, wall_delta_ms: f64) -> Instant {
        if self.state == ClockState::Running && wall_delta_ms.is_finite() && wall_delta_ms > 0.0 {
            let seconds = wall_delta_ms * self.rate as f64 / 1000.0;
            self.time = self.time + Duration::from_seconds(seconds);
        }
        self.time
    }

    /// Jump to the current wall time
    pub fn reset(&mut self) {
        match instant_from_utc(&Utc::now()) {
            Some(now) => self.time = now,
            None => log::warn!("Could not read wall time; clock left at {}", format_time(&self.time)),
        }
    }

    /// Jump to an explicit instant
    pub fn reset_to(&mut self, at: Instant) {
        self.time = at;
    }

    pub fn format_time(&self) -> String {
        format_time(&self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn start() -> Instant {
        Instant::from_datetime(2025, 7, 13, 12, 0, 0.0).unwrap()
    }

    fn clock() -> SimulationClock {
        SimulationClock::new(start(), &EngineConfig::default())
    }

    #[test]
    fn test_default_rate() {
        assert_eq!(clock().rate(), 60);
        assert_eq!(clock().state(), ClockState::Running);
    }

    #[test]
    fn test_advance_scales_by_rate() {
        let mut c = clock();
        c.set_rate(3600);
        let t = c.advance(1000.0);
        assert_abs_diff_eq!((t - start()).as_seconds(), 3600.0, epsilon = 1e-6);
    }

    #[test]
    fn test_paused_clock_is_frozen() {
        let mut c = clock();
        assert_eq!(c.toggle(), ClockState::Paused);
        c.advance(5000.0);
        assert_abs_diff_eq!((c.time() - start()).as_seconds(), 0.0, epsilon = 1e-9);

        c.toggle();
        c.advance(1000.0);
        assert_abs_diff_eq!((c.time() - start()).as_seconds(), 60.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rate_clamped() {
        let mut c = clock();
        c.set_rate(0);
        assert_eq!(c.rate(), 1);
        c.set_rate(1_000_000);
        assert_eq!(c.rate(), 3600);
    }

    #[test]
    fn test_never_regresses() {
        let mut c = clock();
        c.advance(-1000.0);
        c.advance(f64::NAN);
        assert!((c.time() - start()).as_seconds() >= 0.0);
    }

    #[test]
    fn test_step_rate_through_presets() {
        let mut c = clock();
        assert_eq!(c.step_rate(1), 600);
        assert_eq!(c.step_rate(1), 3600);
        assert_eq!(c.step_rate(1), 3600);
        assert_eq!(c.step_rate(-1), 600);
        c.set_rate(30);
        assert_eq!(c.step_rate(-1), 10);
    }

    #[test]
    fn test_reset_to() {
        let mut c = clock();
        c.advance(10_000.0);
        c.reset_to(start());
        assert_eq!(c.format_time(), "2025-07-13 12:00:00 UTC");
    }

    #[test]
    fn test_reset_jumps_to_wall_time() {
        let mut c = clock();
        c.set_rate(3600);
        c.advance(5000.0);
        c.reset();

        let now = instant_from_utc(&Utc::now()).unwrap();
        assert!((c.time() - now).as_seconds().abs() < 5.0);
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1), "Real time");
        assert_eq!(format_rate(60), "1min/s");
        assert_eq!(format_rate(3600), "1h/s");
        assert_eq!(format_rate(7), "7x");
    }

    #[test]
    fn test_instant_from_utc() {
        let dt = DateTime::parse_from_rfc3339("2025-07-13T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let at = instant_from_utc(&dt).unwrap();
        assert_abs_diff_eq!((at - start()).as_seconds(), 0.0, epsilon = 1e-6);
    }
}
