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

//! Global event bus for [`SyncEvent`]s.
//!
//! A multi-producer, multi-consumer broadcast channel. Every poller emits
//! into it and any number of subscribers receive every event independently.
//!
//! # Example
//!
//! ```no_run
//! use guildstats_sync::{subscribe_sync_events, SyncEvent};
//!
//! # async fn example() {
//! let mut rx = subscribe_sync_events();
//! while let Ok(event) = rx.recv().await {
//!     if let SyncEvent::StatusChanged { class, to, .. } = event {
//!         println!("{class:?} is now {to}");
//!     }
//! }
//! # }
//! ```

use crate::events::SyncEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use once_cell::sync::Lazy;
use std::ops::Deref;

/// Capacity of the event bus channel
const EVENT_BUS_CAPACITY: usize = 256;

struct Bus {
    sender: Sender<SyncEvent>,
    // Keeps the channel open while nobody is subscribed.
    _keepalive: InactiveReceiver<SyncEvent>,
}

static BUS: Lazy<Bus> = Lazy::new(|| {
    let (mut sender, receiver) = broadcast(EVENT_BUS_CAPACITY);
    // Slow subscribers lose the oldest events instead of stalling pollers.
    sender.set_overflow(true);
    Bus {
        sender,
        _keepalive: receiver.deactivate(),
    }
});

/// Get the global sender for emitting sync events.
pub fn global_sync_sender() -> Sender<SyncEvent> {
    BUS.deref().sender.clone()
}

/// Subscribe to sync events.
///
/// Returns a receiver that will receive all future events.
pub fn subscribe_sync_events() -> Receiver<SyncEvent> {
    BUS.deref().sender.new_receiver()
}

/// Emit a sync event to all subscribers.
///
/// Never blocks. With no active subscriber the event is dropped.
pub fn emit_sync_event(event: SyncEvent) {
    let _ = BUS.deref().sender.try_broadcast(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::StatsClass;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let mut rx = subscribe_sync_events();
        let ours = SyncEvent::Stopped {
            class: StatsClass::Aggregate,
        };
        emit_sync_event(ours.clone());
        // Other tests share the bus; look for ours.
        loop {
            match rx.recv().await {
                Ok(event) if event == ours => break,
                Ok(_) => {}
                Err(async_broadcast::RecvError::Overflowed(_)) => emit_sync_event(ours.clone()),
                Err(e) => panic!("bus closed: {e}"),
            }
        }
    }

    #[test]
    fn test_emit_without_subscribers_does_not_block() {
        for _ in 0..(EVENT_BUS_CAPACITY * 2) {
            emit_sync_event(SyncEvent::Stopped {
                class: StatsClass::Live,
            });
        }
    }
}
