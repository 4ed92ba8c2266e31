//! Invariant validation run at commit
//!
//! Every check repairs the draft in place and records an [`Issue`]. Only the
//! slice that needed repair is touched, so a clean draft is never copied.
//! What happens next depends on [`ValidationMode`].

use crate::{Error, Result};
use gloam_core::{Draft, Hazard, LightSource, Slice, TimeConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What commit does when repairs were needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationMode {
    /// Fail the commit with every issue found
    Strict,
    /// Log the repairs and commit the repaired tree
    Lenient,
}

impl Default for ValidationMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        }
    }
}

/// One repaired violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub slice: Slice,
    pub message: String,
}

impl Issue {
    fn new(slice: Slice, message: impl Into<String>) -> Self {
        Self {
            slice,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.slice, self.message)
    }
}

/// Checks and repairs domain constraints on a draft
#[derive(Debug, Clone)]
pub struct Validator {
    mode: ValidationMode,
    time: TimeConfig,
}

impl Validator {
    pub fn new(mode: ValidationMode, time: TimeConfig) -> Self {
        Self { mode, time }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ValidationMode) {
        self.mode = mode;
    }

    /// Repair every violation in `draft` and report what was fixed
    ///
    /// In strict mode any repair turns into `Error::Invariants`.
    pub fn validate(&self, draft: &mut Draft) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        self.check_player(draft, &mut issues);
        self.check_runtime(draft, &mut issues);
        self.check_time(draft, &mut issues);
        self.check_light(draft, &mut issues);
        self.check_shadows(draft, &mut issues);

        if issues.is_empty() {
            return Ok(issues);
        }
        match self.mode {
            ValidationMode::Strict => Err(Error::Invariants(issues)),
            ValidationMode::Lenient => {
                for issue in &issues {
                    log::warn!("repaired {}", issue);
                }
                Ok(issues)
            }
        }
    }

    fn check_player(&self, draft: &mut Draft, issues: &mut Vec<Issue>) {
        let player = draft.player();
        if player.max_hp == 0 {
            issues.push(Issue::new(Slice::Player, "max_hp 0 raised to 1"));
            draft.touch_player().max_hp = 1;
        }
        let player = draft.player();
        if player.hp > player.max_hp {
            issues.push(Issue::new(
                Slice::Player,
                format!("hp {} clamped to max_hp {}", player.hp, player.max_hp),
            ));
            let player = draft.touch_player();
            player.hp = player.max_hp;
        }
    }

    fn check_runtime(&self, draft: &mut Draft, issues: &mut Vec<Issue>) {
        if draft.runtime().mode.trim().is_empty() {
            issues.push(Issue::new(Slice::Runtime, "empty mode reset to explore"));
            draft.touch_runtime().mode = "explore".to_string();
        }
    }

    fn check_time(&self, draft: &mut Draft, issues: &mut Vec<Issue>) {
        let total = self.time.cycle_seconds();
        let clock = draft.time();

        if !clock.elapsed_seconds.is_finite() || clock.elapsed_seconds < 0.0 {
            issues.push(Issue::new(
                Slice::Time,
                format!("elapsed seconds {} reset to 0", clock.elapsed_seconds),
            ));
            let clock = draft.touch_time();
            clock.elapsed_seconds = 0.0;
        }

        let clock = draft.time();
        let seconds = clock.seconds_into_cycle;
        if !seconds.is_finite() || !(0.0..total).contains(&seconds) {
            let repaired = if seconds.is_finite() {
                seconds.rem_euclid(total)
            } else {
                0.0
            };
            issues.push(Issue::new(
                Slice::Time,
                format!("seconds into cycle {} wrapped to {}", seconds, repaired),
            ));
            draft.touch_time().seconds_into_cycle = repaired;
        }

        let clock = draft.time();
        let expected = self.time.phase_at(clock.seconds_into_cycle);
        if clock.phase != expected {
            issues.push(Issue::new(
                Slice::Time,
                format!(
                    "phase {} does not match {:.1}s into cycle, set to {}",
                    clock.phase, clock.seconds_into_cycle, expected
                ),
            ));
            draft.touch_time().phase = expected;
        }

        if draft.time().day == 0 {
            issues.push(Issue::new(Slice::Time, "day 0 raised to 1"));
            draft.touch_time().day = 1;
        }

        let clock = draft.time();
        if !clock.last_tick_time.is_finite() || clock.last_tick_time > clock.elapsed_seconds {
            issues.push(Issue::new(
                Slice::Time,
                format!(
                    "last tick {} is after elapsed {}",
                    clock.last_tick_time, clock.elapsed_seconds
                ),
            ));
            let clock = draft.touch_time();
            clock.last_tick_time = clock.elapsed_seconds;
        }
    }

    fn check_light(&self, draft: &mut Draft, issues: &mut Vec<Issue>) {
        let light = draft.light();
        if !(-1..=1).contains(&light.ambient_shift) {
            issues.push(Issue::new(
                Slice::Light,
                format!("ambient shift {} clamped", light.ambient_shift),
            ));
            let light = draft.touch_light();
            light.ambient_shift = light.ambient_shift.clamp(-1, 1);
        }

        let light = draft.light();
        let negative: Vec<String> = light
            .static_sources
            .iter()
            .chain(light.temporary.values())
            .chain(light.player_source.iter())
            .filter(|s| s.radius < 0)
            .map(|s| s.id.to_string())
            .collect();
        if negative.is_empty() {
            return;
        }
        for id in &negative {
            issues.push(Issue::new(
                Slice::Light,
                format!("light source {} has negative radius", id),
            ));
        }
        let light = draft.touch_light();
        let fix = |s: &mut LightSource| s.radius = s.radius.max(0);
        light.static_sources.iter_mut().for_each(fix);
        light.temporary.values_mut().for_each(fix);
        light.player_source.iter_mut().for_each(fix);
    }

    fn check_shadows(&self, draft: &mut Draft, issues: &mut Vec<Issue>) {
        let shadows = draft.shadows();
        let env_dupes = duplicate_ids(&shadows.environmental);
        let story_dupes = duplicate_ids(&shadows.story);
        let acc = shadows.drift_accumulator_ms;

        if !acc.is_finite() || acc < 0.0 {
            issues.push(Issue::new(
                Slice::Shadows,
                format!("drift accumulator {} reset to 0", acc),
            ));
            draft.touch_shadows().drift_accumulator_ms = 0.0;
        }
        if env_dupes.is_empty() && story_dupes.is_empty() {
            return;
        }
        for id in env_dupes.iter().chain(story_dupes.iter()) {
            issues.push(Issue::new(
                Slice::Shadows,
                format!("duplicate hazard id {} dropped", id),
            ));
        }
        let shadows = draft.touch_shadows();
        dedup_hazards(&mut shadows.environmental);
        dedup_hazards(&mut shadows.story);
    }
}

fn duplicate_ids(hazards: &[Hazard]) -> Vec<String> {
    let mut seen = HashSet::new();
    hazards
        .iter()
        .filter(|h| !seen.insert(h.id.clone()))
        .map(|h| h.id.to_string())
        .collect()
}

fn dedup_hazards(hazards: &mut Vec<Hazard>) {
    let mut seen = HashSet::new();
    hazards.retain(|h| seen.insert(h.id.clone()));
}
