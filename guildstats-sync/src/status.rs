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

//! Connection status state machine.
//!
//! Every status change a poller makes goes through
//! [`ConnectionStatus::transition`], so the full table lives in one place:
//!
//! | from \ event | PollStarted | FetchSucceeded | FetchFailed | HealthCheckExpired |
//! |--------------|-------------|----------------|-------------|--------------------|
//! | connecting   | fetching    | connected      | error       | connecting         |
//! | fetching     | fetching    | connected      | error       | fetching           |
//! | connected    | connected   | connected      | error       | stale              |
//! | stale        | stale       | connected      | error       | stale              |
//! | error        | fetching    | connected      | error       | error              |
//!
//! A poll that starts while data is already on screen is a background
//! refresh and leaves the status alone.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Fetching,
    Connected,
    Stale,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    PollStarted,
    FetchSucceeded,
    FetchFailed,
    /// No success landed within `interval + tolerance`.
    HealthCheckExpired,
}

impl ConnectionStatus {
    pub fn transition(self, event: StatusEvent) -> ConnectionStatus {
        use ConnectionStatus::*;
        use StatusEvent::*;

        match (self, event) {
            (Connecting, PollStarted) | (Error, PollStarted) => Fetching,
            (_, PollStarted) => self,
            (_, FetchSucceeded) => Connected,
            (_, FetchFailed) => Error,
            (Connected, HealthCheckExpired) => Stale,
            (_, HealthCheckExpired) => self,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Whether the UI should show its inline error/staleness affordance.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ConnectionStatus::Stale | ConnectionStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Fetching => "fetching",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Stale => "stale",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a poller task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerPhase {
    #[default]
    Idle,
    Running,
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::ConnectionStatus::*;
    use super::StatusEvent::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = Connecting.transition(PollStarted);
        assert_eq!(status, Fetching);
        assert_eq!(status.transition(FetchSucceeded), Connected);
    }

    #[test]
    fn test_failure_and_retry() {
        let status = Fetching.transition(FetchFailed);
        assert_eq!(status, Error);
        let status = status.transition(PollStarted);
        assert_eq!(status, Fetching);
        assert_eq!(status.transition(FetchSucceeded), Connected);
    }

    #[test]
    fn test_staleness_only_degrades_connected() {
        assert_eq!(Connected.transition(HealthCheckExpired), Stale);
        assert_eq!(Stale.transition(FetchSucceeded), Connected);
        assert_eq!(Error.transition(HealthCheckExpired), Error);
        assert_eq!(Fetching.transition(HealthCheckExpired), Fetching);
        assert_eq!(Connecting.transition(HealthCheckExpired), Connecting);
    }

    #[test]
    fn test_background_refresh_keeps_status() {
        assert_eq!(Connected.transition(PollStarted), Connected);
        assert_eq!(Stale.transition(PollStarted), Stale);
        assert_eq!(Stale.transition(FetchFailed), Error);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(Stale.to_string(), "stale");
        assert!(Error.is_degraded());
        assert!(!Fetching.is_degraded());
    }
}
