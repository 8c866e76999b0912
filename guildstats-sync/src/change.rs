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

//! Change detection against the last *rendered* values.
//!
//! Only the fields a dashboard actually draws take part in the comparison.
//! Receipt stamps, server timestamps and the `cached` flag change on every
//! poll and would otherwise restart every animation.

use guildstats_types::{Highlights, LiveSnapshot, StatsSnapshot};

/// A snapshot type the poller and change detector understand.
pub trait TrackedSnapshot: Clone + Send + Sync + 'static {
    /// The subset of fields that is drawn.
    type Rendered: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static;

    fn rendered(&self) -> Self::Rendered;

    fn is_fallback(&self) -> bool;

    /// Zero-valued floor shown before any real data arrives.
    fn fallback(received_at_ms: u64) -> Self;
}

/// Rendered subset of an aggregate snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStats {
    pub members_total: u64,
    pub members_active: u64,
    pub members_new_this_week: u64,
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
    pub highlights: Highlights,
}

/// Rendered subset of a live snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderedLive {
    pub online_members: u64,
    pub active_voice_sessions: u64,
    pub currently_playing: u64,
}

impl TrackedSnapshot for StatsSnapshot {
    type Rendered = RenderedStats;

    fn rendered(&self) -> RenderedStats {
        let activity = &self.activity;
        RenderedStats {
            members_total: self.members.total,
            members_active: self.members.active,
            members_new_this_week: self.members.new_this_week,
            total_voice_hours: activity.total_voice_hours,
            total_messages: activity.total_messages,
            active_voice_sessions: activity.active_voice_sessions,
            games_played: activity.games_played,
            total_gaming_sessions: activity.total_gaming_sessions,
            total_gaming_hours: activity.total_gaming_hours,
            unique_games_played: activity.unique_games_played,
            currently_playing: activity.currently_playing,
            server_uptime_days: activity.server_uptime_days,
            total_events_attended: activity.total_events_attended,
            highlights: self.highlights.clone(),
        }
    }

    fn is_fallback(&self) -> bool {
        self.fallback
    }

    fn fallback(received_at_ms: u64) -> Self {
        StatsSnapshot::fallback(received_at_ms)
    }
}

impl TrackedSnapshot for LiveSnapshot {
    type Rendered = RenderedLive;

    fn rendered(&self) -> RenderedLive {
        RenderedLive {
            online_members: self.online_members,
            active_voice_sessions: self.active_voice_sessions,
            currently_playing: self.currently_playing,
        }
    }

    fn is_fallback(&self) -> bool {
        self.fallback
    }

    fn fallback(received_at_ms: u64) -> Self {
        LiveSnapshot::fallback(received_at_ms)
    }
}

/// Field-wise comparison over the rendered subset.
pub fn has_changed<S: TrackedSnapshot>(previous: &S, next: &S) -> bool {
    previous.rendered() != next.rendered()
}

/// Outcome of [`ChangeDetector::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// First real snapshot; always rendered.
    Bootstrap,
    Changed,
    Unchanged,
    /// A fallback floor. Never a measurement, never recorded.
    Ignored,
}

impl Change {
    /// Whether the UI should react (re-render and animate).
    pub fn is_change(self) -> bool {
        matches!(self, Change::Bootstrap | Change::Changed)
    }
}

/// Remembers what was last rendered for one snapshot stream.
#[derive(Debug, Clone)]
pub struct ChangeDetector<S: TrackedSnapshot> {
    rendered: Option<S::Rendered>,
}

impl<S: TrackedSnapshot> Default for ChangeDetector<S> {
    fn default() -> Self {
        Self { rendered: None }
    }
}

impl<S: TrackedSnapshot> ChangeDetector<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `next` and, if it is a change, record it as rendered.
    pub fn observe(&mut self, next: &S) -> Change {
        if next.is_fallback() {
            return Change::Ignored;
        }
        let rendered = next.rendered();
        match &self.rendered {
            None => {
                self.rendered = Some(rendered);
                Change::Bootstrap
            }
            Some(previous) if *previous == rendered => Change::Unchanged,
            Some(_) => {
                self.rendered = Some(rendered);
                Change::Changed
            }
        }
    }

    pub fn last_rendered(&self) -> Option<&S::Rendered> {
        self.rendered.as_ref()
    }

    pub fn has_rendered(&self) -> bool {
        self.rendered.is_some()
    }
}
