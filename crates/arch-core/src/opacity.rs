//! Global opacity level and per-window fade animations.
//!
//! A fade is a small state machine advanced by discrete ticks. The animator
//! keeps at most one fade per role; starting a new one bumps the generation so
//! the ticker driving the old fade sees itself as stale and stops.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};

use crate::overlay::WindowRole;

pub const MIN_OPACITY: f64 = 0.02;
pub const MAX_OPACITY: f64 = 1.0;
pub const DEFAULT_OPACITY: f64 = 0.5;
pub const DEFAULT_OPACITY_STEP: f64 = 0.1;
pub const DEFAULT_FADE_STEP: f64 = 0.05;
pub const DEFAULT_FADE_INTERVAL_MS: u64 = 10;

/// Opacity shared by every visible window. Mutated by the hotkey router only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalOpacity {
    level: f64,
    step: f64,
    floor: f64,
}

impl Default for GlobalOpacity {
    fn default() -> Self {
        Self::new(DEFAULT_OPACITY, DEFAULT_OPACITY_STEP, MIN_OPACITY)
    }
}

impl GlobalOpacity {
    pub fn new(level: f64, step: f64, floor: f64) -> Self {
        let floor = sanitize(floor, MIN_OPACITY).clamp(MIN_OPACITY, MAX_OPACITY);
        let step = sanitize(step, DEFAULT_OPACITY_STEP).abs();
        let mut opacity = Self {
            level: DEFAULT_OPACITY,
            step,
            floor,
        };
        opacity.set(sanitize(level, DEFAULT_OPACITY));
        opacity
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Stores `level` clamped to `[floor, 1.0]`, rounded to hundredths so
    /// repeated steps do not accumulate float drift.
    pub fn set(&mut self, level: f64) -> f64 {
        let rounded = (level * 100.0).round() / 100.0;
        self.level = rounded.clamp(self.floor, MAX_OPACITY);
        self.level
    }

    pub fn increase(&mut self) -> f64 {
        self.set(self.level + self.step)
    }

    pub fn decrease(&mut self) -> f64 {
        self.set(self.level - self.step)
    }
}

fn sanitize(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Step size and tick interval for fades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSpec {
    pub step: f64,
    pub interval: Duration,
}

impl Default for FadeSpec {
    fn default() -> Self {
        Self {
            step: DEFAULT_FADE_STEP,
            interval: Duration::from_millis(DEFAULT_FADE_INTERVAL_MS),
        }
    }
}

impl FadeSpec {
    pub fn new(step: f64, interval_ms: u64) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            DEFAULT_FADE_STEP
        };
        Self {
            step,
            interval: Duration::from_millis(interval_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    current: f64,
    target: f64,
    step: f64,
}

impl Fade {
    pub fn new(from: f64, target: f64, step: f64) -> Self {
        Self {
            current: from,
            target,
            step,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Moves at most one step toward the target, never past it.
    pub fn advance(&mut self) -> f64 {
        if self.current < self.target {
            self.current = (self.current + self.step).min(self.target);
        } else if self.current > self.target {
            self.current = (self.current - self.step).max(self.target);
        }
        self.current
    }

    pub fn is_complete(&self) -> bool {
        self.current == self.target
    }
}

/// Identifies one running fade. Handed to the ticker that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeTicket {
    pub role: WindowRole,
    pub generation: u64,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Continue(f64),
    Finished(f64),
    /// The fade was superseded or cancelled; the ticker must stop.
    Stale,
}

#[derive(Debug, Default)]
pub struct Animator {
    fades: HashMap<WindowRole, (u64, Fade)>,
    next_generation: u64,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fade for `role`, replacing any fade already in flight.
    pub fn start(&mut self, role: WindowRole, fade: Fade, spec: FadeSpec) -> FadeTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.fades.insert(role, (generation, fade));
        FadeTicket {
            role,
            generation,
            interval: spec.interval,
        }
    }

    pub fn tick(&mut self, ticket: &FadeTicket) -> TickOutcome {
        let Some((generation, fade)) = self.fades.get_mut(&ticket.role) else {
            return TickOutcome::Stale;
        };
        if *generation != ticket.generation {
            return TickOutcome::Stale;
        }

        let value = fade.advance();
        if fade.is_complete() {
            self.fades.remove(&ticket.role);
            TickOutcome::Finished(value)
        } else {
            TickOutcome::Continue(value)
        }
    }

    pub fn cancel(&mut self, role: WindowRole) -> bool {
        self.fades.remove(&role).is_some()
    }

    pub fn in_flight(&self, role: WindowRole) -> bool {
        self.fades.contains_key(&role)
    }

    pub fn current(&self, role: WindowRole) -> Option<Fade> {
        self.fades.get(&role).map(|(_, fade)| *fade)
    }
}

/// Runs `tick` once per `period` until it reports anything other than
/// `Continue`. Returns the number of ticks performed.
pub async fn drive_fade<F, Fut>(period: Duration, mut tick: F) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TickOutcome>,
{
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;
    loop {
        timer.tick().await;
        ticks += 1;
        match tick().await {
            TickOutcome::Continue(_) => continue,
            TickOutcome::Finished(_) | TickOutcome::Stale => return ticks,
        }
    }
}
