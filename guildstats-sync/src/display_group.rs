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

//! Cards that flip between display modes in lockstep.
//!
//! Every card runs its own timer, but all of them derive their flip
//! boundaries from one read-only [`SwitchSchedule`]. A card mounted late
//! starts in the same phase as its siblings because its state is computed
//! from the shared epoch, not from its own mount time.
//!
//! A flip has two phases: at each boundary the card starts `transitioning`
//! with the old mode still shown, and `transition` later the mode swaps and
//! `transitioning` clears.

use std::time::Duration;

use anyhow::ensure;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::DisplayGroupConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Real,
    Comparison,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Real => DisplayMode::Comparison,
            DisplayMode::Comparison => DisplayMode::Real,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CardState {
    pub mode: DisplayMode,
    /// The fade-out cue is showing; the swap has not happened yet.
    pub transitioning: bool,
}

impl CardState {
    /// Pick the value for the current mode.
    pub fn select<T>(&self, real: T, comparison: T) -> T {
        match self.mode {
            DisplayMode::Real => real,
            DisplayMode::Comparison => comparison,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchSchedule {
    epoch: Instant,
    period: Duration,
    transition: Duration,
}

impl SwitchSchedule {
    /// A schedule whose epoch is now.
    pub fn new(period: Duration, transition: Duration) -> anyhow::Result<Self> {
        Self::starting_at(Instant::now(), period, transition)
    }

    pub fn starting_at(
        epoch: Instant,
        period: Duration,
        transition: Duration,
    ) -> anyhow::Result<Self> {
        ensure!(!period.is_zero(), "switch period must be positive");
        ensure!(
            transition < period,
            "transition ({transition:?}) must be shorter than the switch period ({period:?})"
        );
        Ok(Self {
            epoch,
            period,
            transition,
        })
    }

    pub fn from_config(config: &DisplayGroupConfig) -> anyhow::Result<Self> {
        Self::new(
            Duration::from_millis(config.switch_interval_ms),
            Duration::from_millis(config.transition_ms),
        )
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn transition(&self) -> Duration {
        self.transition
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// The state every card in the group shows at `now`.
    pub fn state_at(&self, now: Instant) -> CardState {
        let (cycle, phase) = self.position(now);
        if cycle == 0 {
            return CardState::default();
        }
        if phase < self.transition.as_nanos() {
            CardState {
                mode: mode_after(cycle - 1),
                transitioning: true,
            }
        } else {
            CardState {
                mode: mode_after(cycle),
                transitioning: false,
            }
        }
    }

    /// The first instant strictly after `now` at which the state changes.
    pub fn next_event_after(&self, now: Instant) -> Instant {
        let (cycle, phase) = self.position(now);
        let period = self.period.as_nanos();
        let transition = self.transition.as_nanos();
        let offset = if cycle > 0 && phase < transition && transition > 0 {
            cycle * period + transition
        } else {
            (cycle + 1) * period
        };
        self.epoch + nanos(offset)
    }

    /// Completed periods since the epoch and the offset into the current one.
    fn position(&self, now: Instant) -> (u128, u128) {
        let elapsed = now.saturating_duration_since(self.epoch).as_nanos();
        let period = self.period.as_nanos();
        (elapsed / period, elapsed % period)
    }
}

fn mode_after(flips: u128) -> DisplayMode {
    if flips % 2 == 0 {
        DisplayMode::Real
    } else {
        DisplayMode::Comparison
    }
}

fn nanos(value: u128) -> Duration {
    let secs = (value / 1_000_000_000) as u64;
    let subsec = (value % 1_000_000_000) as u32;
    Duration::new(secs, subsec)
}

/// One mounted card. Dropping it clears its timer.
#[derive(Debug)]
pub struct SyncedCard {
    state: watch::Receiver<CardState>,
    task: JoinHandle<()>,
}

impl SyncedCard {
    /// Must be called from within a tokio runtime.
    pub fn mount(schedule: SwitchSchedule) -> Self {
        let (tx, rx) = watch::channel(schedule.state_at(Instant::now()));
        let task = tokio::spawn(async move {
            loop {
                sleep_until(schedule.next_event_after(Instant::now())).await;
                let next = schedule.state_at(Instant::now());
                tx.send_if_modified(|state| {
                    let modified = *state != next;
                    *state = next;
                    modified
                });
                if tx.is_closed() {
                    break;
                }
            }
        });
        Self { state: rx, task }
    }

    pub fn state(&self) -> CardState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CardState> {
        self.state.clone()
    }

    /// Wait for the next flip phase.
    pub async fn changed(&mut self) -> Option<CardState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow_and_update())
    }
}

impl Drop for SyncedCard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A set of sibling cards sharing one schedule.
#[derive(Debug, Clone)]
pub struct DisplayGroup {
    schedule: SwitchSchedule,
}

impl DisplayGroup {
    pub fn new(schedule: SwitchSchedule) -> Self {
        Self { schedule }
    }

    pub fn from_config(config: &DisplayGroupConfig) -> anyhow::Result<Self> {
        Ok(Self::new(SwitchSchedule::from_config(config)?))
    }

    pub fn schedule(&self) -> &SwitchSchedule {
        &self.schedule
    }

    pub fn mount_card(&self) -> SyncedCard {
        SyncedCard::mount(self.schedule)
    }

    pub fn state_at(&self, now: Instant) -> CardState {
        self.schedule.state_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(5000);
    const TRANSITION: Duration = Duration::from_millis(300);

    fn schedule(epoch: Instant) -> SwitchSchedule {
        SwitchSchedule::starting_at(epoch, PERIOD, TRANSITION).unwrap()
    }

    fn at(epoch: Instant, ms: u64) -> Instant {
        epoch + Duration::from_millis(ms)
    }

    #[test]
    fn test_two_phase_flip() {
        let epoch = Instant::now();
        let s = schedule(epoch);
        let real = CardState {
            mode: DisplayMode::Real,
            transitioning: false,
        };
        assert_eq!(s.state_at(epoch), real);
        assert_eq!(s.state_at(at(epoch, 4999)), real);
        assert_eq!(
            s.state_at(at(epoch, 5000)),
            CardState {
                mode: DisplayMode::Real,
                transitioning: true
            }
        );
        assert_eq!(
            s.state_at(at(epoch, 5300)),
            CardState {
                mode: DisplayMode::Comparison,
                transitioning: false
            }
        );
        assert_eq!(
            s.state_at(at(epoch, 10_100)),
            CardState {
                mode: DisplayMode::Comparison,
                transitioning: true
            }
        );
        assert_eq!(s.state_at(at(epoch, 10_300)), real);
    }

    #[test]
    fn test_next_event() {
        let epoch = Instant::now();
        let s = schedule(epoch);
        assert_eq!(s.next_event_after(epoch), at(epoch, 5000));
        assert_eq!(s.next_event_after(at(epoch, 5000)), at(epoch, 5300));
        assert_eq!(s.next_event_after(at(epoch, 5300)), at(epoch, 10_000));
        assert_eq!(s.next_event_after(at(epoch, 7000)), at(epoch, 10_000));
    }

    #[test]
    fn test_zero_transition_flips_in_one_step() {
        let epoch = Instant::now();
        let s = SwitchSchedule::starting_at(epoch, PERIOD, Duration::ZERO).unwrap();
        assert_eq!(
            s.state_at(at(epoch, 5000)),
            CardState {
                mode: DisplayMode::Comparison,
                transitioning: false
            }
        );
        assert_eq!(s.next_event_after(at(epoch, 5000)), at(epoch, 10_000));
    }

    #[test]
    fn test_invalid_schedules() {
        let epoch = Instant::now();
        assert!(SwitchSchedule::starting_at(epoch, Duration::ZERO, Duration::ZERO).is_err());
        assert!(SwitchSchedule::starting_at(epoch, PERIOD, PERIOD).is_err());
    }

    #[test]
    fn test_select() {
        let state = CardState {
            mode: DisplayMode::Comparison,
            transitioning: false,
        };
        assert_eq!(state.select(1283, 1100), 1100);
        assert_eq!(DisplayMode::Real.toggled(), DisplayMode::Comparison);
    }
}
