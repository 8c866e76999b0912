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

//! Live statistics synchronization for the guildstats community dashboard.
//!
//! This crate keeps a dashboard's numbers in step with the homepage
//! statistics API. It makes no assumptions about the UI framework: every
//! piece of state is published on `tokio::sync::watch` channels that any
//! renderer can read from.
//!
//! # Outline
//!
//! ```text
//! Poller ──► Fetch ──► ChangeDetector ──► StatsStore ──► CounterBoard ──► renderer
//!                                              │
//!                                              └──► DisplayGroup (real / comparison flips)
//! ```
//!
//! - [`poller`] owns the schedule for one statistics class: an immediate
//!   fetch on mount, a fixed interval, exponential backoff retries and an
//!   independent health check that degrades `connected` to `stale`.
//! - [`store`] is the per-poller state every consumer reads.
//! - [`change`] decides whether a new snapshot differs from what was last
//!   rendered, so identical polls never restart animations.
//! - [`animation`] and [`counters`] turn target values into eased frames.
//! - [`display_group`] flips sibling cards between display modes in lockstep.
//!
//! ## Mounting both pollers
//!
//! ```no_run
//! use guildstats_sync::{StatsSync, SyncConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SyncConfig::from_env_or_default()?;
//! let sync = StatsSync::start(config)?;
//!
//! let mut live = sync.live();
//! while let Some(state) = live.next_state().await {
//!     if let Some(snapshot) = &state.snapshot {
//!         println!("{} online ({})", snapshot.online_members, state.status);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod backoff;
pub mod change;
pub mod config;
pub mod constants;
pub mod counters;
pub mod display_group;
pub mod event_bus;
pub mod events;
pub mod fetcher;
pub mod poller;
pub mod status;
pub mod store;
mod sync;

pub use animation::{animate, AnimatedValue, Animation, TargetUpdate};
pub use change::{Change, ChangeDetector, TrackedSnapshot};
pub use config::{AnimationConfig, BackoffConfig, DisplayGroupConfig, PollerConfig, SyncConfig};
pub use counters::{AnimatedCounters, CounterBoard, CounterFrame, Counters};
pub use display_group::{CardState, DisplayGroup, DisplayMode, SwitchSchedule, SyncedCard};
pub use event_bus::{emit_sync_event, global_sync_sender, subscribe_sync_events};
pub use events::SyncEvent;
pub use fetcher::{
    AggregateSource, Fetch, FetchError, FetchErrorKind, LiveSource, Snapshot, SnapshotFetcher,
    StatsKind,
};
pub use poller::{FetchTrigger, PollerHandle, PollerOptions, StatsClass};
pub use status::{ConnectionStatus, PollerPhase, StatusEvent};
pub use store::{StatsReader, StoreState};
pub use sync::StatsSync;

pub use guildstats_types::{LiveSnapshot, StatsFormat, StatsSnapshot};
