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

#![allow(dead_code)]

//! Shared fixtures for the sync integration tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use guildstats_sync::change::TrackedSnapshot;
use guildstats_sync::{Fetch, FetchError, LiveSnapshot};

/// One scripted fetch: how long it takes and what it returns.
#[derive(Clone)]
pub struct Step<S> {
    pub delay: Duration,
    pub result: Result<S, FetchError>,
}

pub fn ok<S>(snapshot: S) -> Step<S> {
    Step {
        delay: Duration::ZERO,
        result: Ok(snapshot),
    }
}

pub fn slow<S>(delay: Duration, snapshot: S) -> Step<S> {
    Step {
        delay,
        result: Ok(snapshot),
    }
}

pub fn transient<S>() -> Step<S> {
    Step {
        delay: Duration::ZERO,
        result: Err(FetchError::transient("connection refused")),
    }
}

pub fn fatal<S>() -> Step<S> {
    Step {
        delay: Duration::ZERO,
        result: Err(FetchError::fatal("expected value at line 1 column 1")),
    }
}

pub fn live(online: u64) -> LiveSnapshot {
    LiveSnapshot {
        online_members: online,
        active_voice_sessions: 2,
        currently_playing: 7,
        received_at_ms: 1,
        ..Default::default()
    }
}

/// Replays a script of fetch outcomes. Once the script runs out the last
/// step repeats.
pub struct ScriptedFetcher<S> {
    steps: Arc<Mutex<VecDeque<Step<S>>>>,
    last: Arc<Mutex<Option<Step<S>>>>,
    pub calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl<S: Clone> ScriptedFetcher<S> {
    pub fn new(steps: Vec<Step<S>>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counters that stay readable after the fetcher moves into a poller.
    pub fn probes(&self) -> Probes {
        Probes {
            calls: self.calls.clone(),
            max_in_flight: self.max_in_flight.clone(),
        }
    }

    fn next_step(&self) -> Step<S> {
        let next = self.steps.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last.clone().expect("script must not be empty"),
        }
    }
}

#[derive(Clone)]
pub struct Probes {
    calls: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Probes {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S: TrackedSnapshot> Fetch for ScriptedFetcher<S> {
    type Output = S;

    fn fetch(&self) -> impl Future<Output = Result<S, FetchError>> + Send {
        let step = self.next_step();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.clone();
        let max_in_flight = self.max_in_flight.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlightGuard(in_flight);
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            step.result
        }
    }
}

/// Let spawned tasks run and advance the paused clock by `ms`.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
