//! Day/night clock and phase scheduler
//!
//! The day is split into four ordered phases: DAY → DUSK → NIGHT → DAWN, then
//! DAY again with the day counter incremented. The scheduler advances the
//! clock by walking phase boundaries one at a time, so a single large step
//! still emits every intermediate `PhaseChanged`.

use crate::{Draft, ModeClassifier, SimEvent};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A segment of the day cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Day,
    Dusk,
    Night,
    Dawn,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Day, Phase::Dusk, Phase::Night, Phase::Dawn];

    /// The phase that follows this one
    pub fn next(self) -> Self {
        match self {
            Phase::Day => Phase::Dusk,
            Phase::Dusk => Phase::Night,
            Phase::Night => Phase::Dawn,
            Phase::Dawn => Phase::Day,
        }
    }

    /// Illumination delta contributed by the time of day
    pub fn ambient_shift(self) -> i8 {
        match self {
            Phase::Day => 1,
            Phase::Dusk | Phase::Dawn => 0,
            Phase::Night => -1,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Day => "day",
            Phase::Dusk => "dusk",
            Phase::Night => "night",
            Phase::Dawn => "dawn",
        };
        f.write_str(s)
    }
}

/// Phase durations and tick interval, in simulated seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub day_seconds: f64,
    pub dusk_seconds: f64,
    pub night_seconds: f64,
    pub dawn_seconds: f64,
    pub tick_interval_seconds: f64,
}

impl TimeConfig {
    pub fn duration(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Day => self.day_seconds,
            Phase::Dusk => self.dusk_seconds,
            Phase::Night => self.night_seconds,
            Phase::Dawn => self.dawn_seconds,
        }
    }

    /// Length of a full cycle
    pub fn cycle_seconds(&self) -> f64 {
        Phase::ALL.iter().map(|p| self.duration(*p)).sum()
    }

    /// Offset into the cycle at which `phase` starts
    pub fn phase_start(&self, phase: Phase) -> f64 {
        Phase::ALL
            .iter()
            .take_while(|p| **p != phase)
            .map(|p| self.duration(*p))
            .sum()
    }

    /// Offset into the cycle at which `phase` ends
    pub fn phase_end(&self, phase: Phase) -> f64 {
        self.phase_start(phase) + self.duration(phase)
    }

    /// The phase covering `seconds_into_cycle`
    pub fn phase_at(&self, seconds_into_cycle: f64) -> Phase {
        Phase::ALL
            .into_iter()
            .find(|p| seconds_into_cycle < self.phase_end(*p))
            .unwrap_or(Phase::Dawn)
    }

    /// Check that every duration is positive and finite
    pub fn validate(&self) -> Result<(), String> {
        for phase in Phase::ALL {
            let d = self.duration(phase);
            if !(d.is_finite() && d > 0.0) {
                return Err(format!("{} duration must be positive, got {}", phase, d));
            }
        }
        if !(self.tick_interval_seconds.is_finite() && self.tick_interval_seconds > 0.0) {
            return Err(format!(
                "tick interval must be positive, got {}",
                self.tick_interval_seconds
            ));
        }
        Ok(())
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            day_seconds: 300.0,
            dusk_seconds: 60.0,
            night_seconds: 240.0,
            dawn_seconds: 60.0,
            tick_interval_seconds: 10.0,
        }
    }
}

/// Simulation clock state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    pub phase: Phase,
    /// Always in `[0, cycle_seconds)`
    pub seconds_into_cycle: f64,
    /// Day counter, starting at 1
    pub day: u32,
    /// Absolute simulated seconds since the clock started
    pub elapsed_seconds: f64,
    /// Absolute time of the last emitted tick
    pub last_tick_time: f64,
    pub paused: bool,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            phase: Phase::Day,
            seconds_into_cycle: 0.0,
            day: 1,
            elapsed_seconds: 0.0,
            last_tick_time: 0.0,
            paused: false,
        }
    }

    /// A clock positioned at the start of `phase` on `day`
    pub fn at_phase(config: &TimeConfig, phase: Phase, day: u32) -> Self {
        let offset = config.phase_start(phase);
        let elapsed = (day.max(1) - 1) as f64 * config.cycle_seconds() + offset;
        Self {
            phase,
            seconds_into_cycle: offset,
            day: day.max(1),
            elapsed_seconds: elapsed,
            last_tick_time: elapsed,
            paused: false,
        }
    }

    /// Absolute simulated milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        (self.elapsed_seconds * 1000.0).floor() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Advances the clock inside a draft and raises phase, day and tick events
#[derive(Debug, Clone, Default)]
pub struct TimeScheduler {
    config: TimeConfig,
}

impl TimeScheduler {
    pub fn new(config: TimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimeConfig {
        &self.config
    }

    /// Advance by `elapsed_ms` of wall time
    ///
    /// The paused flag mirrors whether the current mode stops time. Paused
    /// clocks and non-positive steps do nothing.
    pub fn update(&self, elapsed_ms: f64, draft: &mut Draft, modes: &dyn ModeClassifier) {
        let paused = modes.is_time_paused(&draft.runtime().mode);
        if draft.time().paused != paused {
            draft.touch_time().paused = paused;
        }
        if paused || !(elapsed_ms > 0.0) || !elapsed_ms.is_finite() {
            return;
        }
        self.advance(elapsed_ms / 1000.0, draft);
    }

    /// Skip `seconds` of simulated time, ignoring the paused flag
    pub fn debug_skip_seconds(&self, seconds: f64, draft: &mut Draft) {
        if !(seconds > 0.0) || !seconds.is_finite() {
            return;
        }
        log::debug!("skipping {:.1}s of simulated time", seconds);
        self.advance(seconds, draft);
    }

    fn advance(&self, seconds: f64, draft: &mut Draft) {
        let total = self.config.cycle_seconds();
        if !(total > 0.0) {
            return;
        }
        let tick_interval = self.config.tick_interval_seconds;
        let mut events = Vec::new();
        let clock = draft.touch_time();
        let mut remaining = seconds;

        while remaining > 0.0 {
            let end = self.config.phase_end(clock.phase);
            let target = clock.seconds_into_cycle + remaining;

            if target < end {
                clock.seconds_into_cycle = target;
                clock.elapsed_seconds += remaining;
                remaining = 0.0;
                emit_ticks(clock, tick_interval, &mut events);
                break;
            }

            let step = end - clock.seconds_into_cycle;
            remaining = (remaining - step).max(0.0);
            clock.elapsed_seconds += step;
            emit_ticks(clock, tick_interval, &mut events);

            let from = clock.phase;
            let to = from.next();
            clock.phase = to;
            events.push(SimEvent::PhaseChanged {
                from,
                to,
                day: clock.day,
            });

            if end >= total {
                clock.seconds_into_cycle = 0.0;
                clock.day += 1;
                events.push(SimEvent::DayStarted { day: clock.day });
            } else {
                clock.seconds_into_cycle = end;
            }
        }

        for event in events {
            if let SimEvent::PhaseChanged { from, to, day } = &event {
                log::info!("phase {} -> {} (day {})", from, to, day);
            }
            draft.emit(event);
        }
    }
}

fn emit_ticks(clock: &mut Clock, interval: f64, events: &mut Vec<SimEvent>) {
    if !(interval > 0.0) {
        return;
    }
    while clock.last_tick_time + interval <= clock.elapsed_seconds {
        clock.last_tick_time += interval;
        events.push(SimEvent::Tick {
            at_seconds: clock.last_tick_time,
        });
    }
}
