//! Damped convergence of the split position toward its target.
//!
//! Each tick halves the velocity, pulls it toward the target by a tenth of
//! the remaining distance, and integrates. Once an axis gets within half a
//! pixel it snaps to the target exactly, which guarantees the animation
//! terminates in a bounded number of ticks.

use std::time::{Duration, Instant};

/// Fixed timestep of the split animation.
pub const TICK_INTERVAL: Duration = Duration::from_millis(20);

const DECAY: f32 = 0.5;
const PULL: f32 = 0.1;
const SNAP: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Current/target split coordinates plus the integration velocity.
///
/// The velocity is deliberately never reset: retargeting mid-flight redirects
/// the convergence smoothly, and a snap leaves the residual to decay on the
/// next run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitAnimator {
    current: Point,
    target: Point,
    velocity: Point,
}

impl SplitAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Point {
        self.current
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    /// Move the target; `current` and `velocity` are untouched.
    pub fn set_target(&mut self, x: f32, y: f32) {
        self.target = Point::new(x, y);
    }

    /// Place both `current` and `target` at the same spot, as when the first
    /// comparison image seeds the split at its center.
    pub fn seed(&mut self, x: f32, y: f32) {
        self.current = Point::new(x, y);
        self.target = Point::new(x, y);
    }

    /// One fixed-timestep update. Returns true when both axes have snapped
    /// to the target, which is the scheduler's stop condition.
    pub fn tick(&mut self) -> bool {
        step_axis(&mut self.current.x, &mut self.velocity.x, self.target.x);
        step_axis(&mut self.current.y, &mut self.velocity.y, self.target.y);
        self.current.x == self.target.x && self.current.y == self.target.y
    }
}

fn step_axis(current: &mut f32, velocity: &mut f32, target: f32) {
    *velocity *= DECAY;
    *velocity += (target - *current) * PULL;
    *current += *velocity;
    if (*current - target).abs() < SNAP {
        *current = target;
    }
}

/// Lazily armed fixed-interval schedule for [`SplitAnimator::tick`].
///
/// Armed on the first target change (and on image loads), it fires catch-up
/// ticks when the caller shows up late, and is disarmed by the caller in
/// exactly the tick where the animator converges.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ticker {
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the schedule if it is not already running.
    pub fn arm(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + TICK_INTERVAL);
        }
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Consume one elapsed interval, if any.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = Some(due + TICK_INTERVAL);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_exactly_in_bounded_ticks() {
        let mut anim = SplitAnimator::new();
        anim.set_target(450.0, 300.0);
        let mut ticks = 0;
        while !anim.tick() {
            ticks += 1;
            assert!(ticks < 1_000, "animation failed to terminate");
        }
        assert_eq!(anim.current().x, 450.0);
        assert_eq!(anim.current().y, 300.0);
    }

    #[test]
    fn snap_reaches_fractional_targets_exactly() {
        let mut anim = SplitAnimator::new();
        anim.seed(10.0, 10.0);
        anim.set_target(123.4, 7.9);
        for _ in 0..1_000 {
            if anim.tick() {
                break;
            }
        }
        assert_eq!(anim.current(), anim.target());
    }

    #[test]
    fn seeded_animator_converges_immediately() {
        let mut anim = SplitAnimator::new();
        anim.seed(450.0, 300.0);
        assert!(anim.tick());
        assert_eq!(anim.current(), Point::new(450.0, 300.0));
    }

    #[test]
    fn velocity_survives_retarget() {
        let mut anim = SplitAnimator::new();
        anim.set_target(400.0, 0.0);
        anim.tick();
        anim.tick();
        let v = anim.velocity();
        assert!(v.x > 0.0);
        anim.set_target(500.0, 0.0);
        // Retargeting must not zero the in-flight velocity.
        assert_eq!(anim.velocity().x, v.x);
    }

    #[test]
    fn ticker_fires_on_interval_and_catches_up() {
        let mut ticker = Ticker::new();
        let start = Instant::now();
        assert!(!ticker.fire(start));
        ticker.arm(start);
        assert!(!ticker.fire(start));
        let late = start + TICK_INTERVAL * 3;
        assert!(ticker.fire(late));
        assert!(ticker.fire(late));
        assert!(ticker.fire(late));
        assert!(!ticker.fire(late));
    }

    #[test]
    fn arm_is_idempotent_while_running() {
        let mut ticker = Ticker::new();
        let start = Instant::now();
        ticker.arm(start);
        ticker.arm(start + TICK_INTERVAL * 5);
        // The original schedule is kept, so a fire is still due.
        assert!(ticker.fire(start + TICK_INTERVAL));
    }
}
