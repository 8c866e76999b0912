/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Eased numeric animation.
//!
//! [`Animation`] is the pure curve, [`animate`] turns it into a finite frame
//! sequence and [`AnimatedValue`] is the cancellable, retargetable value a
//! renderer keeps per displayed number. `AnimatedValue` tracks what is on
//! screen separately from where it is heading, so a new target picks up
//! from the exact value currently displayed.

use std::time::Duration;

use tokio::time::Instant;

/// `1 - (1 - t)^2`, with `t` clamped to `[0, 1]`.
pub fn ease_out(t: f64) -> f64 {
    let t = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
    1.0 - (1.0 - t) * (1.0 - t)
}

/// One eased transition from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    from: f64,
    to: f64,
    duration: Duration,
}

impl Animation {
    pub fn new(from: f64, to: f64, duration: Duration) -> Self {
        Self { from, to, duration }
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Interpolated value after `elapsed`. Exactly `to` once finished.
    pub fn value_at(&self, elapsed: Duration) -> f64 {
        if self.is_finished(elapsed) {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.to - self.from) * ease_out(t)
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    pub fn frames(&self, frame_interval: Duration) -> Frames {
        self.frames_between(self.from.round() as i64, self.to.round() as i64, frame_interval)
    }

    fn frames_between(&self, from: i64, to: i64, frame_interval: Duration) -> Frames {
        let frame_interval = frame_interval.max(Duration::from_millis(1));
        let total = if self.duration.is_zero() {
            1
        } else {
            let frames = self.duration.as_nanos().div_ceil(frame_interval.as_nanos());
            u64::try_from(frames).unwrap_or(u64::MAX).max(1)
        };
        Frames {
            animation: *self,
            from,
            to,
            frame_interval,
            next: 1,
            total,
        }
    }
}

/// Rounded frame values of an [`Animation`], one per display refresh.
///
/// Finite, non-restartable, and always ends on exactly the target. The
/// endpoints are kept as integers; only intermediate frames go through `f64`.
#[derive(Debug, Clone)]
pub struct Frames {
    animation: Animation,
    from: i64,
    to: i64,
    frame_interval: Duration,
    next: u64,
    total: u64,
}

impl Frames {
    /// Time since the start at frame `index`, capped at the duration.
    fn elapsed_at(&self, index: u64) -> Duration {
        let nanos = self.frame_interval.as_nanos() * u128::from(index);
        let nanos = nanos.min(self.animation.duration.as_nanos());
        let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
        Duration::new(secs, (nanos % 1_000_000_000) as u32)
    }
}

impl Iterator for Frames {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.next > self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;
        if index == self.total {
            return Some(self.to);
        }
        let value = self.animation.value_at(self.elapsed_at(index)).round() as i64;
        // Keep intermediate frames between the exact endpoints.
        Some(value.clamp(self.from.min(self.to), self.from.max(self.to)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total + 1).saturating_sub(self.next);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames {}

/// Frames of an eased transition from `from` to `to`.
pub fn animate(from: i64, to: i64, duration: Duration, frame_interval: Duration) -> Frames {
    Animation::new(from as f64, to as f64, duration).frames_between(from, to, frame_interval)
}

/// Result of [`AnimatedValue::set_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetUpdate {
    /// First real value, shown without interpolation.
    Immediate,
    /// A new animation started from the current value.
    Animating,
    /// Same target as before; nothing restarted.
    Unchanged,
}

/// A displayed number that eases towards its target.
#[derive(Debug, Clone)]
pub struct AnimatedValue {
    displayed: f64,
    target: Option<f64>,
    running: Option<(Animation, Instant)>,
    duration: Duration,
}

impl AnimatedValue {
    pub fn new(duration: Duration) -> Self {
        Self {
            displayed: 0.0,
            target: None,
            running: None,
            duration,
        }
    }

    /// Head for `target`.
    ///
    /// The first target is shown immediately. A target equal to the current
    /// one is ignored; any other target cancels the running animation and
    /// starts a new one from the value displayed at `now`.
    pub fn set_target(&mut self, target: f64, now: Instant) -> TargetUpdate {
        let Some(current_target) = self.target else {
            self.displayed = target;
            self.target = Some(target);
            self.running = None;
            return TargetUpdate::Immediate;
        };
        if current_target == target {
            return TargetUpdate::Unchanged;
        }
        let from = self.value_at(now);
        self.displayed = from;
        self.target = Some(target);
        self.running = if self.duration.is_zero() {
            self.displayed = target;
            None
        } else {
            Some((Animation::new(from, target, self.duration), now))
        };
        TargetUpdate::Animating
    }

    /// Show `floor` until the first real target arrives. Does not count as
    /// the first value.
    pub fn set_floor(&mut self, floor: f64) {
        if self.target.is_none() {
            self.displayed = floor;
        }
    }

    /// Stop where the value is at `now`.
    pub fn cancel(&mut self, now: Instant) {
        if self.running.is_some() {
            self.displayed = self.value_at(now);
            self.target = Some(self.displayed);
            self.running = None;
        }
    }

    /// Value on screen at `now`.
    pub fn value_at(&self, now: Instant) -> f64 {
        match &self.running {
            Some((animation, started)) => {
                animation.value_at(now.saturating_duration_since(*started))
            }
            None => self.displayed,
        }
    }

    /// Advance to `now` and return the value to draw.
    pub fn tick(&mut self, now: Instant) -> f64 {
        if let Some((animation, started)) = self.running {
            let elapsed = now.saturating_duration_since(started);
            self.displayed = animation.value_at(elapsed);
            if animation.is_finished(elapsed) {
                self.running = None;
            }
        }
        self.displayed
    }

    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }

    pub fn is_animating(&self) -> bool {
        self.running.is_some()
    }
}
