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

//! Animated counter boards driven by a store.
//!
//! A [`CounterBoard`] keeps one [`AnimatedValue`] per rendered counter.
//! [`AnimatedCounters`] runs a board in a task: it applies every snapshot
//! the store publishes and, while anything is moving, publishes a
//! [`CounterFrame`] once per display frame.

use std::time::Duration;

use guildstats_types::{LiveSnapshot, StatsSnapshot};
use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::animation::{AnimatedValue, TargetUpdate};
use crate::change::TrackedSnapshot;
use crate::config::AnimationConfig;
use crate::status::PollerPhase;
use crate::store::StatsReader;

/// Snapshots with named numeric counters.
pub trait Counters: TrackedSnapshot {
    fn counters(&self) -> Vec<(&'static str, f64)>;
}

impl Counters for StatsSnapshot {
    fn counters(&self) -> Vec<(&'static str, f64)> {
        let members = &self.members;
        let activity = &self.activity;
        vec![
            ("members.total", members.total as f64),
            ("members.active", members.active as f64),
            ("members.new_this_week", members.new_this_week as f64),
            ("activity.total_voice_hours", activity.total_voice_hours),
            ("activity.total_messages", activity.total_messages as f64),
            ("activity.active_voice_sessions", activity.active_voice_sessions as f64),
            ("activity.games_played", activity.games_played as f64),
            ("activity.total_gaming_sessions", activity.total_gaming_sessions as f64),
            ("activity.total_gaming_hours", activity.total_gaming_hours),
            ("activity.unique_games_played", activity.unique_games_played as f64),
            ("activity.currently_playing", activity.currently_playing as f64),
            ("activity.server_uptime_days", activity.server_uptime_days),
            ("activity.total_events_attended", activity.total_events_attended as f64),
        ]
    }
}

impl Counters for LiveSnapshot {
    fn counters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("online_members", self.online_members as f64),
            ("active_voice_sessions", self.active_voice_sessions as f64),
            ("currently_playing", self.currently_playing as f64),
        ]
    }
}

/// Values to draw for one display frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterFrame {
    pub values: Vec<(&'static str, f64)>,
    /// At least one counter is still moving.
    pub animating: bool,
    /// Snapshot applications that moved at least one target.
    pub updates: u64,
    /// The values are a fallback floor, not measurements.
    pub floor: bool,
}

impl CounterFrame {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// Value rounded for integer display.
    pub fn rounded(&self, name: &str) -> Option<i64> {
        self.get(name).map(|v| v.round() as i64)
    }
}

#[derive(Debug, Clone)]
pub struct CounterBoard {
    counters: Vec<(&'static str, AnimatedValue)>,
    duration: Duration,
    updates: u64,
    floor: bool,
}

impl CounterBoard {
    pub fn new(duration: Duration) -> Self {
        Self {
            counters: Vec::new(),
            duration,
            updates: 0,
            floor: false,
        }
    }

    /// Retarget every counter from `snapshot`. A fallback only sets display
    /// floors. Returns whether any target moved.
    pub fn apply<S: Counters>(&mut self, snapshot: &S, now: Instant) -> bool {
        let fallback = snapshot.is_fallback();
        let mut moved = false;
        for (name, target) in snapshot.counters() {
            let value = self.slot(name);
            if fallback {
                value.set_floor(target);
                continue;
            }
            if value.set_target(target, now) != TargetUpdate::Unchanged {
                moved = true;
            }
        }
        self.floor = fallback && self.counters.iter().all(|(_, v)| v.target().is_none());
        if moved {
            self.updates += 1;
        }
        moved
    }

    /// Advance every counter to `now`.
    pub fn frame(&mut self, now: Instant) -> CounterFrame {
        let values = self
            .counters
            .iter_mut()
            .map(|(name, value)| (*name, value.tick(now)))
            .collect();
        CounterFrame {
            values,
            animating: self.is_animating(),
            updates: self.updates,
            floor: self.floor,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.counters.iter().any(|(_, v)| v.is_animating())
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn slot(&mut self, name: &'static str) -> &mut AnimatedValue {
        let index = match self.counters.iter().position(|(key, _)| *key == name) {
            Some(index) => index,
            None => {
                self.counters.push((name, AnimatedValue::new(self.duration)));
                self.counters.len() - 1
            }
        };
        &mut self.counters[index].1
    }
}

/// A [`CounterBoard`] running against a store. Dropping it stops the task.
#[derive(Debug)]
pub struct AnimatedCounters {
    frames: watch::Receiver<CounterFrame>,
    task: JoinHandle<()>,
}

impl AnimatedCounters {
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: Counters>(reader: StatsReader<S>, config: &AnimationConfig) -> Self {
        let (tx, rx) = watch::channel(CounterFrame::default());
        let board = CounterBoard::new(config.duration());
        let task = tokio::spawn(run_board(
            reader,
            board,
            tx,
            config.frame_interval().max(Duration::from_millis(1)),
        ));
        Self { frames: rx, task }
    }

    pub fn current(&self) -> CounterFrame {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CounterFrame> {
        self.frames.clone()
    }

    /// Wait for the next published frame. `None` once the board stopped.
    pub async fn next_frame(&mut self) -> Option<CounterFrame> {
        self.frames.changed().await.ok()?;
        Some(self.frames.borrow_and_update().clone())
    }
}

impl Drop for AnimatedCounters {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_board<S: Counters>(
    mut reader: StatsReader<S>,
    mut board: CounterBoard,
    tx: watch::Sender<CounterFrame>,
    frame_interval: Duration,
) {
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stopped = apply_current(&reader, &mut board, &tx);
    while !stopped {
        if board.is_animating() {
            tokio::select! {
                alive = reader.changed() => {
                    if !alive {
                        break;
                    }
                    stopped = apply_current(&reader, &mut board, &tx);
                }
                _ = ticker.tick() => {
                    tx.send_replace(board.frame(Instant::now()));
                }
            }
        } else {
            if !reader.changed().await {
                break;
            }
            if apply_current(&reader, &mut board, &tx) {
                break;
            }
            ticker.reset();
        }
    }
    // Land every counter on its target before going quiet.
    tx.send_replace(board.frame(Instant::now() + board.duration));
    debug!("counter board stopped after {} update(s)", board.updates());
}

/// Apply the store's current snapshot and publish a frame. Returns whether
/// the poller has stopped.
fn apply_current<S: Counters>(
    reader: &StatsReader<S>,
    board: &mut CounterBoard,
    tx: &watch::Sender<CounterFrame>,
) -> bool {
    let (snapshot, phase) = reader.with(|state| (state.snapshot.clone(), state.phase));
    let now = Instant::now();
    if let Some(snapshot) = snapshot {
        board.apply(&snapshot, now);
        tx.send_replace(board.frame(now));
    }
    phase == PollerPhase::Stopped
}
