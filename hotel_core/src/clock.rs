//! Simulated logical clock with adjustable speed.
//!
//! Every timestamp in the core is a `SimClock::now()` value; real wall time
//! never leaves this module. Speed changes, pause/resume and jumps re-anchor
//! the (real, logical) pair first so logical time never discontinues: the
//! mapping is `logical = anchor_logical + (real_now - anchor_real) * speed`,
//! and only the anchors move when parameters change.

use chrono::{DateTime, Duration as SimDuration, Utc};
use parking_lot::Mutex;
use std::time::Instant;

#[derive(Debug)]
struct Anchor {
    speed: f64,
    paused: bool,
    anchor_real: Instant,
    anchor_logical: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SimClock {
    inner: Mutex<Anchor>,
}

impl SimClock {
    pub fn new(speed: f64) -> Self {
        Self::starting_at(Utc::now(), speed)
    }

    /// Clock whose logical time starts at `origin`.
    pub fn starting_at(origin: DateTime<Utc>, speed: f64) -> Self {
        Self {
            inner: Mutex::new(Anchor {
                speed: sanitize_speed(speed),
                paused: false,
                anchor_real: Instant::now(),
                anchor_logical: origin,
            }),
        }
    }

    /// Current logical time.
    pub fn now(&self) -> DateTime<Utc> {
        let a = self.inner.lock();
        if a.paused {
            return a.anchor_logical;
        }
        let real_elapsed = a.anchor_real.elapsed().as_secs_f64();
        a.anchor_logical + secs_to_sim(real_elapsed * a.speed)
    }

    pub fn speed(&self) -> f64 {
        self.inner.lock().speed
    }

    /// Change the flow rate. Re-anchors first so `now()` is continuous across
    /// the change; also resumes a paused clock.
    pub fn set_speed(&self, speed: f64) {
        let mut a = self.inner.lock();
        let current = logical_now(&a);
        a.anchor_logical = current;
        a.anchor_real = Instant::now();
        a.speed = sanitize_speed(speed);
        a.paused = false;
    }

    pub fn pause(&self) {
        let mut a = self.inner.lock();
        if !a.paused {
            a.anchor_logical = logical_now(&a);
            a.paused = true;
        }
    }

    pub fn resume(&self) {
        let mut a = self.inner.lock();
        if a.paused {
            a.anchor_real = Instant::now();
            a.paused = false;
        }
    }

    /// Jump to an arbitrary logical time (past or future). Pause state and
    /// speed are preserved.
    pub fn jump_to(&self, target: DateTime<Utc>) {
        let mut a = self.inner.lock();
        a.anchor_logical = target;
        a.anchor_real = Instant::now();
    }

    /// Move logical time forward by `delta`. Scenario scripts and tests drive
    /// the simulation with this instead of sleeping.
    pub fn advance(&self, delta: SimDuration) {
        let mut a = self.inner.lock();
        let current = logical_now(&a);
        a.anchor_logical = current + delta;
        a.anchor_real = Instant::now();
    }
}

fn logical_now(a: &Anchor) -> DateTime<Utc> {
    if a.paused {
        a.anchor_logical
    } else {
        a.anchor_logical + secs_to_sim(a.anchor_real.elapsed().as_secs_f64() * a.speed)
    }
}

fn sanitize_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 { speed } else { 1.0 }
}

fn secs_to_sim(secs: f64) -> SimDuration {
    SimDuration::nanoseconds((secs * 1e9) as i64)
}

/// Simulated seconds between two logical timestamps.
pub fn sim_seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

/// Simulated minutes between two logical timestamps.
pub fn sim_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    sim_seconds_between(start, end) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_is_frozen() {
        let clock = SimClock::new(6.0);
        clock.pause();
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(a, clock.now());
    }

    #[test]
    fn continuity_on_speed_change() {
        let clock = SimClock::new(1.0);
        let before = clock.now();
        clock.set_speed(50.0);
        let after = clock.now();
        // Re-anchoring keeps logical time continuous across the change.
        assert!((after - before).num_milliseconds().abs() < 100);
    }

    #[test]
    fn jump_lands_exactly_when_paused() {
        let clock = SimClock::new(6.0);
        clock.pause();
        let target = clock.now() + SimDuration::minutes(5);
        clock.jump_to(target);
        assert_eq!(clock.now(), target);
        assert_eq!(sim_minutes_between(target, clock.now()), 0.0);
    }

    #[test]
    fn advance_moves_by_delta() {
        let clock = SimClock::new(6.0);
        clock.pause();
        let t0 = clock.now();
        clock.advance(SimDuration::seconds(120));
        assert_eq!(sim_seconds_between(t0, clock.now()), 120.0);
    }
}
