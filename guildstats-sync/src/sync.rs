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

use guildstats_types::{GameRef, LiveSnapshot, StatsSnapshot, Timeframe};
use log::info;

use crate::config::SyncConfig;
use crate::counters::AnimatedCounters;
use crate::display_group::DisplayGroup;
use crate::fetcher::{AggregateSource, FetchError, LiveSource, SnapshotFetcher};
use crate::poller::{self, PollerHandle, StatsClass};
use crate::store::StatsReader;

/// Both pollers of a dashboard page, mounted together.
///
/// Dropping a `StatsSync` unmounts both pollers.
#[derive(Debug)]
pub struct StatsSync {
    config: SyncConfig,
    fetcher: SnapshotFetcher,
    aggregate: PollerHandle<StatsSnapshot>,
    live: PollerHandle<LiveSnapshot>,
    display_group: DisplayGroup,
}

impl StatsSync {
    /// Validate `config` and mount the aggregate and live pollers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: SyncConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let fetcher = SnapshotFetcher::new(config.client()?);
        let display_group = DisplayGroup::from_config(&config.display_group)?;

        let aggregate = poller::spawn(
            AggregateSource::new(fetcher.clone(), config.format),
            config.options(StatsClass::Aggregate),
        );
        let live = poller::spawn(
            LiveSource::new(fetcher.clone()),
            config.options(StatsClass::Live),
        );
        info!(
            "stats sync started against {} (format: {}, auto refresh: {})",
            fetcher.client().base_url(),
            config.format,
            config.auto_refresh
        );

        Ok(Self {
            config,
            fetcher,
            aggregate,
            live,
            display_group,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn aggregate(&self) -> StatsReader<StatsSnapshot> {
        self.aggregate.reader()
    }

    pub fn live(&self) -> StatsReader<LiveSnapshot> {
        self.live.reader()
    }

    pub fn refresh(&self, class: StatsClass) {
        match class {
            StatsClass::Aggregate => self.aggregate.refresh(),
            StatsClass::Live => self.live.refresh(),
        }
    }

    pub fn refresh_all(&self) {
        self.aggregate.refresh();
        self.live.refresh();
    }

    pub fn animated_aggregate(&self) -> AnimatedCounters {
        AnimatedCounters::spawn(self.aggregate(), &self.config.animation)
    }

    pub fn animated_live(&self) -> AnimatedCounters {
        AnimatedCounters::spawn(self.live(), &self.config.animation)
    }

    pub fn display_group(&self) -> &DisplayGroup {
        &self.display_group
    }

    /// One-shot popular games lookup. Not polled.
    pub async fn popular_games(
        &self,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<GameRef>, FetchError> {
        self.fetcher
            .client()
            .get_popular_games(timeframe, limit)
            .await
            .map_err(FetchError::from)
    }

    pub fn is_running(&self) -> bool {
        self.aggregate.is_mounted() || self.live.is_mounted()
    }

    /// Unmount both pollers. Idempotent.
    pub fn shutdown(&mut self) {
        self.aggregate.shutdown();
        self.live.shutdown();
    }
}
