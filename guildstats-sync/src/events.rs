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

//! Framework-agnostic synchronization events.
//!
//! Pollers emit these on the global [event bus](crate::event_bus) so that a
//! UI layer, a logger or a test can observe what the sync layer is doing
//! without reaching into a store.

use crate::fetcher::FetchError;
use crate::poller::{FetchTrigger, StatsClass};
use crate::status::ConnectionStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A poller's connection status moved.
    StatusChanged {
        class: StatsClass,
        from: ConnectionStatus,
        to: ConnectionStatus,
    },
    /// The rendered values changed and the store revision was bumped.
    SnapshotChanged {
        class: StatsClass,
        revision: u64,
        bootstrap: bool,
    },
    /// A fetch failed. The last-good snapshot stays on display.
    FetchFailed { class: StatsClass, error: FetchError },
    /// An out-of-band retry was scheduled after `attempt` failures.
    RetryScheduled {
        class: StatsClass,
        attempt: u32,
        delay_ms: u64,
    },
    /// A trigger was skipped because a fetch was already in flight.
    FetchCoalesced {
        class: StatsClass,
        trigger: FetchTrigger,
    },
    /// The poller was unmounted.
    Stopped { class: StatsClass },
}

impl SyncEvent {
    pub fn class(&self) -> StatsClass {
        match self {
            SyncEvent::StatusChanged { class, .. }
            | SyncEvent::SnapshotChanged { class, .. }
            | SyncEvent::FetchFailed { class, .. }
            | SyncEvent::RetryScheduled { class, .. }
            | SyncEvent::FetchCoalesced { class, .. }
            | SyncEvent::Stopped { class } => *class,
        }
    }
}
