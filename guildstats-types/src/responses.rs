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

//! Response envelopes for the homepage statistics endpoints.
//!
//! Every endpoint wraps its payload in a `{ "success": bool, ... }` envelope.
//! `success` is required; a body without it is malformed. Payload fields are
//! all optional and tolerant, see [`crate::normalize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{amount, count, lenient_number, lenient_text, lenient_timestamp};
use crate::snapshot::{
    ActivityStats, GameRef, Highlights, LiveSnapshot, MemberStats, StatsSnapshot, UserRef,
};

// ---------------------------------------------------------------------------
// GET /homepage/stats
// ---------------------------------------------------------------------------

/// Envelope for `GET /homepage/stats` (both `full` and `quick` formats).
///
/// ```json
/// { "success": true, "data": { "members": { "total": 1283 } }, "lastUpdate": "2025-03-01T12:00:00Z" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<StatsPayload>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsPayload {
    pub members: MembersPayload,
    pub activity: ActivityPayload,
    pub highlights: HighlightsPayload,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MembersPayload {
    #[serde(deserialize_with = "lenient_number")]
    pub total: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub active: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub new_this_week: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityPayload {
    #[serde(deserialize_with = "lenient_number")]
    pub total_voice_hours: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_messages: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub active_voice_sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub games_played: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_gaming_sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_gaming_hours: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub unique_games_played: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub currently_playing: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub server_uptime_days: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_events_attended: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HighlightsPayload {
    pub top_users: Vec<UserPayload>,
    pub popular_games: Vec<GamePayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPayload {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub voice_hours: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub messages: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GamePayload {
    pub name: Option<String>,
    #[serde(alias = "playerCount", deserialize_with = "lenient_number")]
    pub players: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub total_hours: Option<f64>,
    pub icon: Option<String>,
}

impl StatsPayload {
    /// Normalize into a [`StatsSnapshot`].
    ///
    /// The payload's own `lastUpdate` wins over the envelope's.
    pub fn into_snapshot(
        self,
        envelope_last_update: Option<DateTime<Utc>>,
        received_at_ms: u64,
    ) -> StatsSnapshot {
        StatsSnapshot {
            members: MemberStats {
                total: count(self.members.total),
                active: count(self.members.active),
                new_this_week: count(self.members.new_this_week),
            },
            activity: ActivityStats {
                total_voice_hours: amount(self.activity.total_voice_hours),
                total_messages: count(self.activity.total_messages),
                active_voice_sessions: count(self.activity.active_voice_sessions),
                games_played: count(self.activity.games_played),
                total_gaming_sessions: count(self.activity.total_gaming_sessions),
                total_gaming_hours: amount(self.activity.total_gaming_hours),
                unique_games_played: count(self.activity.unique_games_played),
                currently_playing: count(self.activity.currently_playing),
                server_uptime_days: amount(self.activity.server_uptime_days),
                total_events_attended: count(self.activity.total_events_attended),
            },
            highlights: Highlights {
                top_users: self
                    .highlights
                    .top_users
                    .into_iter()
                    .map(UserPayload::into_user_ref)
                    .collect(),
                popular_games: self
                    .highlights
                    .popular_games
                    .into_iter()
                    .map(GamePayload::into_game_ref)
                    .collect(),
            },
            last_update: self.last_update.or(envelope_last_update),
            received_at_ms,
            fallback: false,
        }
    }
}

impl UserPayload {
    pub fn into_user_ref(self) -> UserRef {
        UserRef {
            id: self.id.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            avatar: self.avatar,
            voice_hours: amount(self.voice_hours),
            messages: count(self.messages),
        }
    }
}

impl GamePayload {
    pub fn into_game_ref(self) -> GameRef {
        GameRef {
            name: self.name.unwrap_or_default(),
            players: count(self.players),
            sessions: count(self.sessions),
            total_hours: amount(self.total_hours),
            icon: self.icon,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /homepage/stats/live
// ---------------------------------------------------------------------------

/// Envelope for `GET /homepage/stats/live`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatsResponse {
    pub success: bool,
    #[serde(default)]
    pub live: Option<LivePayload>,
    #[serde(default)]
    pub cached: bool,
    /// Server timing information. Opaque to the client and only logged.
    #[serde(default)]
    pub performance: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivePayload {
    #[serde(deserialize_with = "lenient_number")]
    pub online_members: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub active_voice_sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub currently_playing: Option<f64>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LivePayload {
    pub fn into_snapshot(self, cached: bool, received_at_ms: u64) -> LiveSnapshot {
        LiveSnapshot {
            online_members: count(self.online_members),
            active_voice_sessions: count(self.active_voice_sessions),
            currently_playing: count(self.currently_playing),
            last_activity: self.last_activity,
            timestamp: self.timestamp,
            cached,
            received_at_ms,
            fallback: false,
        }
    }
}

// ---------------------------------------------------------------------------
// GET /homepage/games/popular
// ---------------------------------------------------------------------------

/// Envelope for `GET /homepage/games/popular`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularGamesResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<GamePayload>,
    #[serde(default)]
    pub message: Option<String>,
}
