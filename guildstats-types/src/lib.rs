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
 */

//! Shared types for the guildstats community dashboard API.
//!
//! This crate defines the contract between the homepage statistics endpoints
//! and the clients that poll them. It has two layers:
//!
//! - [`responses`] and [`requests`]: the wire shapes, deserialized leniently
//!   (missing, `null` and numeric-string fields are tolerated).
//! - [`snapshot`]: the normalized, immutable snapshots that the rest of the
//!   workspace works with. Every count is non-negative and every missing
//!   field has been replaced by zero.
//!
//! It is intentionally framework-agnostic: no HTTP client, no runtime.

pub mod normalize;
pub mod requests;
pub mod responses;
pub mod snapshot;

pub use requests::{PopularGamesQuery, StatsFormat, Timeframe};
pub use responses::{LiveStatsResponse, PopularGamesResponse, StatsResponse};
pub use snapshot::{
    ActivityStats, GameRef, Highlights, LiveSnapshot, MemberStats, StatsSnapshot, UserRef,
};
