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

//! Per-poller state store.
//!
//! The store is written only by its poller task and read through
//! [`StatsReader`]s. Every write goes through [`StoreWriter::update`], which
//! checks the mounted flag under the channel's write lock: once a poller is
//! unmounted no write can land, including one from a fetch that resolves
//! afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::change::TrackedSnapshot;
use crate::fetcher::FetchError;
use crate::status::{ConnectionStatus, PollerPhase};

/// Everything a renderer needs to draw one statistics class.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<S> {
    /// Last known snapshot. `None` only before the first fetch completes.
    pub snapshot: Option<S>,
    pub status: ConnectionStatus,
    pub phase: PollerPhase,
    /// A fetch is in flight.
    pub loading: bool,
    /// Error from the most recent fetch, cleared on success.
    pub error: Option<FetchError>,
    pub last_success_ms: Option<u64>,
    pub last_attempt_ms: Option<u64>,
    /// Consecutive failures since the last success.
    pub retry_count: u32,
    /// Wall clock time of the pending out-of-band retry.
    pub next_retry_ms: Option<u64>,
    /// Bumped only when the rendered values change.
    pub revision: u64,
    /// Total number of writes to this store.
    pub mutations: u64,
    /// Triggers skipped because a fetch was already in flight.
    pub coalesced: u64,
}

impl<S> Default for StoreState<S> {
    fn default() -> Self {
        Self {
            snapshot: None,
            status: ConnectionStatus::default(),
            phase: PollerPhase::default(),
            loading: false,
            error: None,
            last_success_ms: None,
            last_attempt_ms: None,
            retry_count: 0,
            next_retry_ms: None,
            revision: 0,
            mutations: 0,
            coalesced: 0,
        }
    }
}

impl<S: TrackedSnapshot> StoreState<S> {
    /// Whether the snapshot on display is a locally synthesized floor.
    pub fn is_fallback(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.is_fallback())
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Write side of a store, owned by the poller task and its handle.
pub(crate) struct StoreWriter<S> {
    tx: Arc<watch::Sender<StoreState<S>>>,
    mounted: Arc<AtomicBool>,
}

impl<S> Clone for StoreWriter<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            mounted: self.mounted.clone(),
        }
    }
}

impl<S: TrackedSnapshot> StoreWriter<S> {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(StoreState::default());
        Self {
            tx: Arc::new(tx),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Apply `f` unless the store has been unmounted. Returns whether the
    /// write landed.
    pub(crate) fn update(&self, f: impl FnOnce(&mut StoreState<S>)) -> bool {
        self.tx.send_if_modified(|state| {
            if !self.mounted.load(Ordering::SeqCst) {
                return false;
            }
            f(state);
            state.mutations += 1;
            true
        })
    }

    /// Read the current state without writing.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&StoreState<S>) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Mark the store stopped and refuse every later write. Returns `false`
    /// if it was already unmounted.
    pub(crate) fn unmount(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if !self.mounted.swap(false, Ordering::SeqCst) {
                return false;
            }
            state.phase = PollerPhase::Stopped;
            state.loading = false;
            state.next_retry_ms = None;
            state.mutations += 1;
            true
        })
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub(crate) fn reader(&self) -> StatsReader<S> {
        StatsReader::new(self.tx.subscribe())
    }
}

/// Read side of a store.
///
/// Cloning a reader is cheap; each clone tracks which states it has seen
/// independently.
#[derive(Debug)]
pub struct StatsReader<S> {
    rx: watch::Receiver<StoreState<S>>,
    primed: bool,
    finished: bool,
}

impl<S> Clone for StatsReader<S> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            primed: self.primed,
            finished: self.finished,
        }
    }
}

impl<S: TrackedSnapshot> StatsReader<S> {
    fn new(rx: watch::Receiver<StoreState<S>>) -> Self {
        Self {
            rx,
            primed: false,
            finished: false,
        }
    }

    pub fn current(&self) -> StoreState<S> {
        self.rx.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<S> {
        self.rx.borrow().snapshot.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.rx.borrow().status
    }

    pub fn revision(&self) -> u64 {
        self.rx.borrow().revision
    }

    /// Borrow the current state without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&StoreState<S>) -> R) -> R {
        f(&self.rx.borrow())
    }

    /// Wait for the next state.
    ///
    /// The first call returns the current state immediately. Returns `None`
    /// once the poller has stopped and its final state has been delivered.
    pub async fn next_state(&mut self) -> Option<StoreState<S>> {
        if self.finished {
            return None;
        }
        if self.primed {
            if self.rx.changed().await.is_err() {
                self.finished = true;
                return None;
            }
        } else {
            self.primed = true;
        }
        let state = self.rx.borrow_and_update().clone();
        self.finished = state.phase == PollerPhase::Stopped;
        Some(state)
    }

    /// Wait until the store is written again. Returns `false` when the poller
    /// is gone.
    pub async fn changed(&mut self) -> bool {
        self.primed = true;
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildstats_types::LiveSnapshot;

    #[tokio::test]
    async fn test_writes_are_refused_after_unmount() {
        let writer = StoreWriter::<LiveSnapshot>::new();
        let reader = writer.reader();
        assert!(writer.update(|s| s.loading = true));
        assert_eq!(reader.current().mutations, 1);

        assert!(writer.unmount());
        assert!(!writer.unmount());
        let stopped = reader.current();
        assert_eq!(stopped.phase, PollerPhase::Stopped);
        assert!(!stopped.loading);

        assert!(!writer.update(|s| s.snapshot = Some(LiveSnapshot::fallback(1))));
        assert_eq!(reader.current().mutations, stopped.mutations);
        assert!(reader.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_next_state_yields_current_then_changes_then_ends() {
        let writer = StoreWriter::<LiveSnapshot>::new();
        let mut reader = writer.reader();

        let first = reader.next_state().await.expect("initial state");
        assert_eq!(first.phase, PollerPhase::Idle);

        writer.update(|s| s.phase = PollerPhase::Running);
        let second = reader.next_state().await.expect("running state");
        assert_eq!(second.phase, PollerPhase::Running);

        writer.unmount();
        let last = reader.next_state().await.expect("stopped state");
        assert_eq!(last.phase, PollerPhase::Stopped);
        assert!(reader.next_state().await.is_none());
    }

    #[test]
    fn test_fallback_flag() {
        let mut state = StoreState::<LiveSnapshot>::default();
        assert!(!state.is_fallback());
        state.snapshot = Some(LiveSnapshot::fallback(3));
        assert!(state.is_fallback());
    }
}
