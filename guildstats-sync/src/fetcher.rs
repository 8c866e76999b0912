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

//! Snapshot fetching and outcome classification.
//!
//! A fetch is one round-trip. It never panics and never retries on its own:
//! every failure comes back as a [`FetchError`] classified as
//! [`FetchErrorKind::Transient`] (network, timeouts, 5xx, 429, an envelope
//! with `success: false`) or [`FetchErrorKind::Fatal`] (malformed payloads
//! and other 4xx statuses). The poller decides what to do with it.

use std::fmt;
use std::future::Future;

use guildstats_client::{ApiError, StatsApiClient};
use guildstats_types::{LiveSnapshot, StatsFormat, StatsSnapshot};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::change::TrackedSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorKind {
    Transient,
    Fatal,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Transient => f.write_str("transient"),
            FetchErrorKind::Fatal => f.write_str("fatal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} fetch error: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Fatal,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FetchErrorKind::Transient
    }
}

impl From<ApiError> for FetchError {
    fn from(error: ApiError) -> Self {
        if error.is_retryable() {
            FetchError::transient(error.to_string())
        } else {
            FetchError::fatal(error.to_string())
        }
    }
}

/// A source of snapshots for one statistics class.
///
/// The poller is generic over this trait, so tests drive it with scripted
/// sources and production code with [`AggregateSource`] / [`LiveSource`].
pub trait Fetch: Send + Sync + 'static {
    type Output: TrackedSnapshot;

    fn fetch(&self) -> impl Future<Output = Result<Self::Output, FetchError>> + Send;
}

/// Which endpoint and payload shape a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKind {
    Aggregate(StatsFormat),
    Live,
}

/// Result of [`SnapshotFetcher::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Aggregate(StatsSnapshot),
    Live(LiveSnapshot),
}

/// Performs single round-trips against the statistics API and classifies
/// the outcome.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    client: StatsApiClient,
}

impl SnapshotFetcher {
    pub fn new(client: StatsApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &StatsApiClient {
        &self.client
    }

    pub async fn fetch(&self, kind: StatsKind) -> Result<Snapshot, FetchError> {
        match kind {
            StatsKind::Aggregate(format) => self.aggregate(format).await.map(Snapshot::Aggregate),
            StatsKind::Live => self.live().await.map(Snapshot::Live),
        }
    }

    pub async fn aggregate(&self, format: StatsFormat) -> Result<StatsSnapshot, FetchError> {
        self.client.get_stats(format).await.map_err(|e| {
            let error = FetchError::from(e);
            debug!("aggregate ({format}) fetch failed: {error}");
            error
        })
    }

    pub async fn live(&self) -> Result<LiveSnapshot, FetchError> {
        self.client.get_live_stats().await.map_err(|e| {
            let error = FetchError::from(e);
            debug!("live fetch failed: {error}");
            error
        })
    }
}

/// [`Fetch`] adapter for `GET /homepage/stats`.
#[derive(Debug, Clone)]
pub struct AggregateSource {
    fetcher: SnapshotFetcher,
    format: StatsFormat,
}

impl AggregateSource {
    pub fn new(fetcher: SnapshotFetcher, format: StatsFormat) -> Self {
        Self { fetcher, format }
    }
}

impl Fetch for AggregateSource {
    type Output = StatsSnapshot;

    fn fetch(&self) -> impl Future<Output = Result<StatsSnapshot, FetchError>> + Send {
        self.fetcher.aggregate(self.format)
    }
}

/// [`Fetch`] adapter for `GET /homepage/stats/live`.
#[derive(Debug, Clone)]
pub struct LiveSource {
    fetcher: SnapshotFetcher,
}

impl LiveSource {
    pub fn new(fetcher: SnapshotFetcher) -> Self {
        Self { fetcher }
    }
}

impl Fetch for LiveSource {
    type Output = LiveSnapshot;

    fn fetch(&self) -> impl Future<Output = Result<LiveSnapshot, FetchError>> + Send {
        self.fetcher.live()
    }
}
