//! Time sources and the fixed-interval cadence used for replanning.
//!
//! Everything here measures time in seconds as `f32`, the same unit as
//! `MazeWorld::step`. Tests drive a [`ManualClock`]; real-time hosts use
//! [`SystemClock`].

use bevy_ecs::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Tolerance for accumulated float time when comparing against a deadline.
const EPSILON: f32 = 1e-4;

/// A monotonic source of "now".
pub trait Clock {
    /// Seconds since the clock's origin.
    fn now(&self) -> f32;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }
}

/// Hand-driven clock; shareable across threads.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// `f32` bits.
    now: AtomicU32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f32) {
        self.now.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f32) {
        let add = |bits: u32| Some((f32::from_bits(bits) + seconds).to_bits());
        let _ = self.now.fetch_update(Ordering::AcqRel, Ordering::Acquire, add);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f32 {
        f32::from_bits(self.now.load(Ordering::Acquire))
    }
}

/// Fires at t = 0 and then every `interval` seconds.
///
/// Deadlines missed between two polls collapse into a single firing; the
/// schedule keeps its phase.
#[derive(Resource, Debug, Clone)]
pub struct Cadence {
    interval: f32,
    next_fire: f32,
    due: bool,
    fire_count: u64,
}

impl Cadence {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            next_fire: 0.0,
            due: false,
            fire_count: 0,
        }
    }

    /// Check the cadence against `now`. Returns (and remembers) whether it fired.
    pub fn poll(&mut self, now: f32) -> bool {
        self.due = now + EPSILON >= self.next_fire;
        if self.due {
            let missed = ((now + EPSILON - self.next_fire) / self.interval).floor();
            self.next_fire += (missed + 1.0) * self.interval;
            self.fire_count += 1;
        }
        self.due
    }

    /// Result of the last [`poll`](Self::poll).
    pub fn is_due(&self) -> bool {
        self.due
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn next_fire(&self) -> f32 {
        self.next_fire
    }

    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }
}
