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

//! Normalized statistics snapshots.
//!
//! A snapshot is an immutable value: each poll produces a new one and the
//! previous one is simply superseded. Snapshots carry two timestamps: the
//! server's own `last_update` (if it sent a parsable one) and the local
//! `received_at_ms` stamped when the response was decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Member counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberStats {
    pub total: u64,
    pub active: u64,
    pub new_this_week: u64,
}

/// Community activity counters.
///
/// Hours and uptime are fractional; everything else is a whole count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub total_voice_hours: f64,
    pub total_messages: u64,
    pub active_voice_sessions: u64,
    pub games_played: u64,
    pub total_gaming_sessions: u64,
    pub total_gaming_hours: f64,
    pub unique_games_played: u64,
    pub currently_playing: u64,
    pub server_uptime_days: f64,
    pub total_events_attended: u64,
}

/// A member featured in the highlights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    pub voice_hours: f64,
    pub messages: u64,
}

/// A game as reported by highlights or the popular games endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRef {
    pub name: String,
    pub players: u64,
    pub sessions: u64,
    pub total_hours: f64,
    pub icon: Option<String>,
}

/// Ordered highlight lists. Order is significant: it is the ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub top_users: Vec<UserRef>,
    pub popular_games: Vec<GameRef>,
}

/// One aggregate statistics fetch result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub members: MemberStats,
    pub activity: ActivityStats,
    pub highlights: Highlights,
    /// Server-side timestamp of the aggregation, if provided.
    pub last_update: Option<DateTime<Utc>>,
    /// Local receipt time in milliseconds since the Unix epoch.
    pub received_at_ms: u64,
    /// `true` when synthesized locally after a failure. A fallback is a
    /// display floor, never a measurement.
    pub fallback: bool,
}

impl StatsSnapshot {
    /// Zero-valued snapshot shown when no real data has arrived yet.
    pub fn fallback(received_at_ms: u64) -> Self {
        Self {
            received_at_ms,
            fallback: true,
            ..Default::default()
        }
    }
}

/// One live presence fetch result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub online_members: u64,
    pub active_voice_sessions: u64,
    pub currently_playing: u64,
    pub last_activity: Option<DateTime<Utc>>,
    /// Server-side timestamp of the sample.
    pub timestamp: Option<DateTime<Utc>>,
    /// The server answered from its cache.
    pub cached: bool,
    pub received_at_ms: u64,
    pub fallback: bool,
}

impl LiveSnapshot {
    pub fn fallback(received_at_ms: u64) -> Self {
        Self {
            received_at_ms,
            fallback: true,
            ..Default::default()
        }
    }
}
