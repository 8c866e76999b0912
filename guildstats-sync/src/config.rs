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

//! Sync configuration: YAML file, environment variables, or defaults.

use std::fs;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use guildstats_client::{AuthMode, StatsApiClient};
use guildstats_types::StatsFormat;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::*;
use crate::poller::{PollerOptions, StatsClass};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub request_timeout_ms: Option<u64>,
    /// When `false` each poller fetches once on mount and then only on
    /// manual refresh.
    pub auto_refresh: bool,
    pub format: StatsFormat,
    #[serde(deserialize_with = "aggregate_poller")]
    pub aggregate: PollerConfig,
    #[serde(deserialize_with = "live_poller")]
    pub live: PollerConfig,
    pub backoff: BackoffConfig,
    pub animation: AnimationConfig,
    pub display_group: DisplayGroupConfig,
}

/// Per-class poller timing. A partial YAML block is merged onto the class
/// defaults ([`PollerConfig::aggregate`] or [`PollerConfig::live`]).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub refresh_interval_ms: u64,
    pub stale_tolerance_ms: u64,
    pub health_check_interval_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
struct PollerOverrides {
    refresh_interval_ms: Option<u64>,
    stale_tolerance_ms: Option<u64>,
    health_check_interval_ms: Option<u64>,
}

impl PollerOverrides {
    fn apply(self, defaults: PollerConfig) -> PollerConfig {
        PollerConfig {
            refresh_interval_ms: self
                .refresh_interval_ms
                .unwrap_or(defaults.refresh_interval_ms),
            stale_tolerance_ms: self
                .stale_tolerance_ms
                .unwrap_or(defaults.stale_tolerance_ms),
            health_check_interval_ms: self
                .health_check_interval_ms
                .unwrap_or(defaults.health_check_interval_ms),
        }
    }
}

fn aggregate_poller<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PollerConfig, D::Error> {
    Ok(PollerOverrides::deserialize(deserializer)?.apply(PollerConfig::aggregate()))
}

fn live_poller<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PollerConfig, D::Error> {
    Ok(PollerOverrides::deserialize(deserializer)?.apply(PollerConfig::live()))
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_ms: u64,
    pub max_ms: u64,
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration_ms: u64,
    pub frame_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayGroupConfig {
    pub switch_interval_ms: u64,
    pub transition_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            request_timeout_ms: None,
            auto_refresh: true,
            format: StatsFormat::Full,
            aggregate: PollerConfig::aggregate(),
            live: PollerConfig::live(),
            backoff: BackoffConfig::default(),
            animation: AnimationConfig::default(),
            display_group: DisplayGroupConfig::default(),
        }
    }
}

impl PollerConfig {
    pub fn aggregate() -> Self {
        Self {
            refresh_interval_ms: AGGREGATE_REFRESH_INTERVAL_MS,
            stale_tolerance_ms: AGGREGATE_STALE_TOLERANCE_MS,
            health_check_interval_ms: AGGREGATE_HEALTH_CHECK_INTERVAL_MS,
        }
    }

    pub fn live() -> Self {
        Self {
            refresh_interval_ms: LIVE_REFRESH_INTERVAL_MS,
            stale_tolerance_ms: LIVE_STALE_TOLERANCE_MS,
            health_check_interval_ms: LIVE_HEALTH_CHECK_INTERVAL_MS,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: BACKOFF_BASE_MS,
            max_ms: BACKOFF_MAX_MS,
            max_retries: BACKOFF_MAX_RETRIES,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: ANIMATION_DURATION_MS,
            frame_interval_ms: ANIMATION_FRAME_INTERVAL_MS,
        }
    }
}

impl AnimationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for DisplayGroupConfig {
    fn default() -> Self {
        Self {
            switch_interval_ms: DISPLAY_SWITCH_INTERVAL_MS,
            transition_ms: DISPLAY_TRANSITION_MS,
        }
    }
}

impl SyncConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading sync config {path}"))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: SyncConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `GUILDSTATS_CONFIG_PATH` if set, otherwise start from the
    /// defaults and apply the `GUILDSTATS_*` environment overrides.
    ///
    /// `GUILDSTATS_REFRESH_INTERVAL_MS` sets the aggregate poller only; the
    /// live poller reads `GUILDSTATS_LIVE_REFRESH_INTERVAL_MS`.
    pub fn from_env_or_default() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(config_path) = lookup("GUILDSTATS_CONFIG_PATH") {
            return Self::from_file(&config_path);
        }

        let mut config = SyncConfig::default();
        if let Some(api_url) = lookup("GUILDSTATS_API_URL") {
            config.api_url = api_url;
        }
        if let Some(auto_refresh) = lookup("GUILDSTATS_AUTO_REFRESH") {
            config.auto_refresh = auto_refresh
                .trim()
                .parse::<bool>()
                .with_context(|| format!("GUILDSTATS_AUTO_REFRESH={auto_refresh}"))?;
        }
        if let Some(interval) = lookup("GUILDSTATS_REFRESH_INTERVAL_MS") {
            config.aggregate.refresh_interval_ms =
                parse_ms("GUILDSTATS_REFRESH_INTERVAL_MS", &interval)?;
        }
        if let Some(interval) = lookup("GUILDSTATS_LIVE_REFRESH_INTERVAL_MS") {
            config.live.refresh_interval_ms =
                parse_ms("GUILDSTATS_LIVE_REFRESH_INTERVAL_MS", &interval)?;
        }
        if let Some(format) = lookup("GUILDSTATS_FORMAT") {
            config.format = format.parse::<StatsFormat>().map_err(|e| anyhow!(e))?;
        }
        config.auth_token = lookup("GUILDSTATS_AUTH_TOKEN").filter(|t| !t.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("api_url must not be empty");
        }
        for (name, poller) in [("aggregate", &self.aggregate), ("live", &self.live)] {
            if poller.refresh_interval_ms == 0 {
                bail!("{name}.refresh_interval_ms must be positive");
            }
            if poller.health_check_interval_ms == 0 {
                bail!("{name}.health_check_interval_ms must be positive");
            }
        }
        if self.backoff.base_ms == 0 {
            bail!("backoff.base_ms must be positive");
        }
        if self.backoff.max_ms < self.backoff.base_ms {
            bail!(
                "backoff.max_ms ({}) is below backoff.base_ms ({})",
                self.backoff.max_ms,
                self.backoff.base_ms
            );
        }
        if self.animation.frame_interval_ms == 0 {
            bail!("animation.frame_interval_ms must be positive");
        }
        if self.display_group.switch_interval_ms == 0 {
            bail!("display_group.switch_interval_ms must be positive");
        }
        if self.display_group.transition_ms >= self.display_group.switch_interval_ms {
            bail!("display_group.transition_ms must be shorter than the switch interval");
        }
        Ok(())
    }

    /// Poller options for `class` derived from this config.
    pub fn options(&self, class: StatsClass) -> PollerOptions {
        let poller = match class {
            StatsClass::Aggregate => &self.aggregate,
            StatsClass::Live => &self.live,
        };
        PollerOptions {
            class,
            auto_refresh: self.auto_refresh,
            refresh_interval: Duration::from_millis(poller.refresh_interval_ms),
            stale_tolerance: Duration::from_millis(poller.stale_tolerance_ms),
            health_check_interval: Duration::from_millis(poller.health_check_interval_ms),
            backoff: self.backoff,
        }
    }

    pub fn client(&self) -> anyhow::Result<StatsApiClient> {
        let auth = match &self.auth_token {
            Some(token) => AuthMode::Bearer(token.clone()),
            None => AuthMode::Anonymous,
        };
        let client = StatsApiClient::new(&self.api_url, auth)?;
        Ok(match self.request_timeout_ms {
            Some(timeout_ms) => client.with_timeout(Duration::from_millis(timeout_ms)),
            None => client,
        })
    }
}

fn parse_ms(name: &str, value: &str) -> anyhow::Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{name}={value}"))
}
