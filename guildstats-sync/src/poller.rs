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

//! Per-class poller.
//!
//! One tokio task per statistics class drives three timers (the regular
//! interval, the backoff retry and the health check) plus at most one
//! in-flight fetch and a command channel, all from a single `select!` loop:
//!
//! ```text
//! idle ──spawn──► running ──fetch──► success ─┐
//!                    ▲                         │
//!                    └────────── failure ◄─────┤
//!                                              ▼
//!                           shutdown / drop ──► stopped
//! ```
//!
//! Fetches never overlap. A trigger that arrives while a fetch is in flight
//! is dropped and counted in [`StoreState::coalesced`](crate::StoreState).
//! Starting a fetch consumes both a pending retry and a regular tick that is
//! already due, so a retry and a tick landing together produce one fetch.

use std::fmt;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use guildstats_client::platform::now_ms;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use crate::backoff::Backoff;
use crate::change::{Change, ChangeDetector, TrackedSnapshot};
use crate::config::BackoffConfig;
use crate::constants::*;
use crate::event_bus::emit_sync_event;
use crate::events::SyncEvent;
use crate::fetcher::{Fetch, FetchError};
use crate::status::{ConnectionStatus, PollerPhase, StatusEvent};
use crate::store::{StatsReader, StoreState, StoreWriter};

/// Statistics class. Each class has its own poller, store and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsClass {
    /// Slow aggregate statistics.
    Aggregate,
    /// Fast presence sample.
    Live,
}

impl StatsClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsClass::Aggregate => "aggregate",
            StatsClass::Live => "live",
        }
    }
}

impl fmt::Display for StatsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchTrigger {
    Mount,
    Interval,
    Retry,
    Manual,
}

impl fmt::Display for FetchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchTrigger::Mount => "mount",
            FetchTrigger::Interval => "interval",
            FetchTrigger::Retry => "retry",
            FetchTrigger::Manual => "manual",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerOptions {
    pub class: StatsClass,
    /// When `false` only the mount fetch (and manual refreshes) run.
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
    /// Grace added to `refresh_interval` before the health check degrades
    /// `connected` to `stale`.
    pub stale_tolerance: Duration,
    pub health_check_interval: Duration,
    pub backoff: BackoffConfig,
}

impl PollerOptions {
    pub fn aggregate() -> Self {
        Self {
            class: StatsClass::Aggregate,
            auto_refresh: true,
            refresh_interval: Duration::from_millis(AGGREGATE_REFRESH_INTERVAL_MS),
            stale_tolerance: Duration::from_millis(AGGREGATE_STALE_TOLERANCE_MS),
            health_check_interval: Duration::from_millis(AGGREGATE_HEALTH_CHECK_INTERVAL_MS),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn live() -> Self {
        Self {
            class: StatsClass::Live,
            auto_refresh: true,
            refresh_interval: Duration::from_millis(LIVE_REFRESH_INTERVAL_MS),
            stale_tolerance: Duration::from_millis(LIVE_STALE_TOLERANCE_MS),
            health_check_interval: Duration::from_millis(LIVE_HEALTH_CHECK_INTERVAL_MS),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn for_class(class: StatsClass) -> Self {
        match class {
            StatsClass::Aggregate => Self::aggregate(),
            StatsClass::Live => Self::live(),
        }
    }

    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Age after which a `connected` poller is considered stale.
    pub fn stale_after(&self) -> Duration {
        self.refresh_interval + self.stale_tolerance
    }
}

#[derive(Debug)]
enum Command {
    Refresh,
}

/// Owner of a running poller. Dropping the handle unmounts the poller.
pub struct PollerHandle<S: TrackedSnapshot> {
    class: StatsClass,
    store: StoreWriter<S>,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl<S: TrackedSnapshot> fmt::Debug for PollerHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollerHandle")
            .field("class", &self.class)
            .field("mounted", &self.store.is_mounted())
            .finish()
    }
}

/// Mount a poller for `fetcher`. The first fetch starts immediately.
///
/// Must be called from within a tokio runtime.
pub fn spawn<F: Fetch>(fetcher: F, options: PollerOptions) -> PollerHandle<F::Output> {
    let store = StoreWriter::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let class = options.class;
    let task = PollerTask::new(fetcher, options, store.clone());
    let join = tokio::spawn(task.run(rx));
    PollerHandle {
        class,
        store,
        commands: tx,
        task: Some(join),
    }
}

impl<S: TrackedSnapshot> PollerHandle<S> {
    pub fn class(&self) -> StatsClass {
        self.class
    }

    pub fn reader(&self) -> StatsReader<S> {
        self.store.reader()
    }

    /// Request a fetch now. Coalesced with an in-flight fetch.
    pub fn refresh(&self) {
        if self.commands.send(Command::Refresh).is_err() {
            debug!("{} poller is gone, refresh ignored", self.class);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.store.is_mounted()
    }

    pub fn state(&self) -> StoreState<S> {
        self.store.with(|state| state.clone())
    }

    /// Unmount the poller.
    ///
    /// Synchronously refuses every later store write, then aborts the task,
    /// which drops all timers and any in-flight fetch. Idempotent.
    pub fn shutdown(&mut self) {
        if self.store.unmount() {
            info!("{} poller stopped", self.class);
            emit_sync_event(SyncEvent::Stopped { class: self.class });
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<S: TrackedSnapshot> Drop for PollerHandle<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

type InFlight<S> = BoxFuture<'static, (FetchTrigger, Result<S, FetchError>)>;

struct PollerTask<F: Fetch> {
    fetcher: Arc<F>,
    options: PollerOptions,
    store: StoreWriter<F::Output>,
    detector: ChangeDetector<F::Output>,
    backoff: Backoff,
    last_success: Option<Instant>,
    in_flight: Option<InFlight<F::Output>>,
    retry_at: Option<Instant>,
    /// Deadline of the next regular tick. `None` without auto refresh.
    next_poll: Option<Instant>,
}

impl<F: Fetch> PollerTask<F> {
    fn new(fetcher: F, options: PollerOptions, store: StoreWriter<F::Output>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            backoff: Backoff::from_config(&options.backoff),
            options,
            store,
            detector: ChangeDetector::new(),
            last_success: None,
            in_flight: None,
            retry_at: None,
            next_poll: None,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let class = self.options.class;
        let start = Instant::now();
        let auto_refresh = self.options.auto_refresh;
        self.next_poll = auto_refresh.then(|| start + self.refresh_period());
        let mut health_timer =
            auto_refresh.then(|| periodic(start, self.options.health_check_interval));

        self.store.update(|s| s.phase = PollerPhase::Running);
        debug!(
            "{class} poller running (auto refresh: {auto_refresh}, interval: {:?})",
            self.options.refresh_interval
        );
        self.trigger(FetchTrigger::Mount);

        loop {
            tokio::select! {
                biased;

                (trigger, result) = next_outcome(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.complete(trigger, result);
                }

                command = commands.recv() => match command {
                    Some(Command::Refresh) => self.trigger(FetchTrigger::Manual),
                    None => break,
                },

                _ = sleep_until_opt(self.retry_at) => {
                    self.retry_at = None;
                    self.trigger(FetchTrigger::Retry);
                }

                _ = sleep_until_opt(self.next_poll) => {
                    self.trigger(FetchTrigger::Interval);
                }

                _ = tick_opt(&mut health_timer) => {
                    self.check_health();
                }
            }
        }

        debug!("{class} poller loop ended");
    }

    fn refresh_period(&self) -> Duration {
        self.options.refresh_interval.max(Duration::from_millis(1))
    }

    /// Move the regular deadline past `now` if it is due. The fetch being
    /// started (or already in flight) serves the due tick.
    fn consume_due_tick(&mut self, now: Instant) {
        let period = self.refresh_period();
        if let Some(next_poll) = self.next_poll.as_mut() {
            while *next_poll <= now {
                *next_poll += period;
            }
        }
    }

    fn trigger(&mut self, trigger: FetchTrigger) {
        let class = self.options.class;
        self.consume_due_tick(Instant::now());
        if self.in_flight.is_some() {
            debug!("{class} {trigger} fetch skipped, one is already in flight");
            self.store.update(|s| s.coalesced += 1);
            emit_sync_event(SyncEvent::FetchCoalesced { class, trigger });
            return;
        }
        if self.retry_at.take().is_some() {
            debug!("{class} {trigger} fetch replaces the pending retry");
        }

        let mut transition = None;
        self.store.update(|s| {
            let to = s.status.transition(StatusEvent::PollStarted);
            if to != s.status {
                transition = Some((s.status, to));
            }
            s.status = to;
            s.loading = true;
            s.next_retry_ms = None;
            s.last_attempt_ms = Some(now_ms());
        });
        emit_transition(class, transition);

        let fetcher = self.fetcher.clone();
        self.in_flight = Some(
            async move {
                let result = fetcher.fetch().await;
                (trigger, result)
            }
            .boxed(),
        );
    }

    fn complete(&mut self, trigger: FetchTrigger, result: Result<F::Output, FetchError>) {
        match result {
            Ok(snapshot) => self.on_success(trigger, snapshot),
            Err(error) => self.on_failure(trigger, error),
        }
    }

    fn on_success(&mut self, trigger: FetchTrigger, snapshot: F::Output) {
        let class = self.options.class;
        let recovered_after = self.backoff.failures();
        self.backoff.reset();
        self.last_success = Some(Instant::now());
        let change = self.detector.observe(&snapshot);

        let mut transition = None;
        let mut revision = None;
        self.store.update(|s| {
            let to = s.status.transition(StatusEvent::FetchSucceeded);
            if to != s.status {
                transition = Some((s.status, to));
            }
            s.status = to;
            s.loading = false;
            s.error = None;
            s.retry_count = 0;
            s.next_retry_ms = None;
            s.last_success_ms = Some(now_ms());
            s.snapshot = Some(snapshot);
            if change.is_change() {
                s.revision += 1;
                revision = Some(s.revision);
            }
        });

        if recovered_after > 0 {
            info!("{class} stats recovered after {recovered_after} failed fetch(es)");
        }
        debug!("{class} {trigger} fetch succeeded: {change:?}");
        emit_transition(class, transition);
        if let Some(revision) = revision {
            emit_sync_event(SyncEvent::SnapshotChanged {
                class,
                revision,
                bootstrap: change == Change::Bootstrap,
            });
        }
    }

    fn on_failure(&mut self, trigger: FetchTrigger, error: FetchError) {
        let class = self.options.class;
        let delay = self.backoff.record_failure();
        let attempt = self.backoff.failures();
        self.retry_at = delay.map(|d| Instant::now() + d);

        if error.is_transient() {
            warn!("{class} {trigger} fetch failed (attempt {attempt}): {error}");
        } else {
            error!("{class} {trigger} fetch failed (attempt {attempt}): {error}");
        }

        let mut transition = None;
        let failed = error.clone();
        self.store.update(|s| {
            let to = s.status.transition(StatusEvent::FetchFailed);
            if to != s.status {
                transition = Some((s.status, to));
            }
            s.status = to;
            s.loading = false;
            s.error = Some(failed);
            s.retry_count = attempt;
            s.next_retry_ms = delay.map(|d| now_ms() + d.as_millis() as u64);
            if s.snapshot.is_none() {
                s.snapshot = Some(<F::Output as TrackedSnapshot>::fallback(now_ms()));
            }
        });

        emit_transition(class, transition);
        emit_sync_event(SyncEvent::FetchFailed { class, error });
        match delay {
            Some(delay) => {
                debug!("{class} retry {attempt} scheduled in {delay:?}");
                emit_sync_event(SyncEvent::RetryScheduled {
                    class,
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
            }
            None => warn!("{class} retry budget exhausted, waiting for the regular cadence"),
        }
    }

    fn check_health(&mut self) {
        let Some(last_success) = self.last_success else {
            return;
        };
        if last_success.elapsed() <= self.options.stale_after() {
            return;
        }
        let class = self.options.class;
        let mut transition = None;
        self.store.update(|s| {
            let to = s.status.transition(StatusEvent::HealthCheckExpired);
            if to != s.status {
                transition = Some((s.status, to));
            }
            s.status = to;
        });
        if transition.is_some() {
            warn!(
                "{class} stats are stale, last success {:?} ago",
                last_success.elapsed()
            );
        }
        emit_transition(class, transition);
    }
}

fn emit_transition(class: StatsClass, transition: Option<(ConnectionStatus, ConnectionStatus)>) {
    if let Some((from, to)) = transition {
        emit_sync_event(SyncEvent::StatusChanged { class, from, to });
    }
}

fn periodic(start: Instant, period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut timer = interval_at(start + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_outcome<T>(slot: &mut Option<BoxFuture<'static, T>>) -> T {
    match slot {
        Some(fetch) => fetch.await,
        None => pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn tick_opt(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending().await,
    }
}
