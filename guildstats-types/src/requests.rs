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

//! Query parameter types for the homepage statistics endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payload variant for `GET /homepage/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    /// Complete payload including highlights.
    #[default]
    Full,
    /// Lighter variant (`?format=quick`), same shape.
    Quick,
}

impl StatsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsFormat::Full => "full",
            StatsFormat::Quick => "quick",
        }
    }
}

impl fmt::Display for StatsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(StatsFormat::Full),
            "quick" => Ok(StatsFormat::Quick),
            other => Err(format!("unknown stats format '{other}', expected 'full' or 'quick'")),
        }
    }
}

/// Window over which popular games are ranked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Day,
    #[default]
    Week,
    Month,
    All,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::All => "all",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters for `GET /homepage/games/popular`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularGamesQuery {
    #[serde(default)]
    pub timeframe: Timeframe,

    /// Number of games to return (1-50). Defaults to 10.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Largest `limit` the endpoint honours.
pub const MAX_POPULAR_GAMES_LIMIT: u32 = 50;

fn default_limit() -> u32 {
    10
}

impl PopularGamesQuery {
    pub fn new(timeframe: Timeframe, limit: u32) -> Self {
        Self {
            timeframe,
            limit: limit.clamp(1, MAX_POPULAR_GAMES_LIMIT),
        }
    }
}

impl Default for PopularGamesQuery {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::default(),
            limit: default_limit(),
        }
    }
}
