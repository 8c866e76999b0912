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

//! Homepage statistics endpoints: aggregate stats, live presence, popular games.

use guildstats_types::responses::{
    GamePayload, LiveStatsResponse, PopularGamesResponse, StatsResponse,
};
use guildstats_types::{
    GameRef, LiveSnapshot, PopularGamesQuery, StatsFormat, StatsSnapshot, Timeframe,
};
use log::debug;

use crate::error::ApiError;
use crate::platform::now_ms;
use crate::{parse_json, StatsApiClient};

impl StatsApiClient {
    /// Fetch the aggregate community statistics.
    ///
    /// Calls `GET /homepage/stats`, or `GET /homepage/stats?format=quick` for
    /// [`StatsFormat::Quick`].
    pub async fn get_stats(&self, format: StatsFormat) -> Result<StatsSnapshot, ApiError> {
        let mut request = self.get("/homepage/stats");
        if format == StatsFormat::Quick {
            request = request.query(&[("format", format.as_str())]);
        }
        let response: StatsResponse = parse_json(request.send().await?).await?;
        if !response.success {
            return Err(unsuccessful(response.message, "stats"));
        }
        let data = response
            .data
            .ok_or_else(|| ApiError::Malformed("stats response has no data".to_string()))?;
        Ok(data.into_snapshot(response.last_update, now_ms()))
    }

    /// Fetch the live presence sample.
    ///
    /// Calls `GET /homepage/stats/live`.
    pub async fn get_live_stats(&self) -> Result<LiveSnapshot, ApiError> {
        let response: LiveStatsResponse =
            parse_json(self.get("/homepage/stats/live").send().await?).await?;
        if !response.success {
            return Err(unsuccessful(response.message, "live stats"));
        }
        if let Some(performance) = &response.performance {
            debug!(
                "live stats served (cached: {}), performance: {performance}",
                response.cached
            );
        }
        let live = response
            .live
            .ok_or_else(|| ApiError::Malformed("live response has no live payload".to_string()))?;
        Ok(live.into_snapshot(response.cached, now_ms()))
    }

    /// Fetch the most played games over a timeframe.
    ///
    /// Calls `GET /homepage/games/popular?timeframe={timeframe}&limit={limit}`.
    /// `limit` is clamped to `1..=50`.
    pub async fn get_popular_games(
        &self,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<GameRef>, ApiError> {
        let query = PopularGamesQuery::new(timeframe, limit);
        let response: PopularGamesResponse = parse_json(
            self.get("/homepage/games/popular")
                .query(&[
                    ("timeframe", query.timeframe.to_string()),
                    ("limit", query.limit.to_string()),
                ])
                .send()
                .await?,
        )
        .await?;
        if !response.success {
            return Err(unsuccessful(response.message, "popular games"));
        }
        Ok(response
            .data
            .into_iter()
            .map(GamePayload::into_game_ref)
            .collect())
    }
}

fn unsuccessful(message: Option<String>, what: &str) -> ApiError {
    ApiError::Unsuccessful(message.unwrap_or_else(|| format!("server could not produce {what}")))
}
