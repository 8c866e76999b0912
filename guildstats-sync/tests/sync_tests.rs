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

//! End-to-end: both pollers against an in-process API server.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use guildstats_sync::{
    subscribe_sync_events, ConnectionStatus, StatsClass, StatsReader, StatsSync, StoreState,
    SyncConfig, SyncEvent,
};
use guildstats_types::Timeframe;
use serde_json::json;

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}/api")
}

fn dashboard_api() -> Router {
    Router::new()
        .route(
            "/api/homepage/stats",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": {
                        "members": {"total": 1283, "active": "310", "newThisWeek": null},
                        "activity": {"totalVoiceHours": 5120.5, "totalMessages": -4},
                        "highlights": {
                            "topUsers": [{"id": 7, "username": "ada", "voiceHours": 12.5}],
                            "popularGames": []
                        }
                    },
                    "lastUpdate": "2025-03-01T12:00:00Z"
                }))
            }),
        )
        .route(
            "/api/homepage/stats/live",
            get(|| async {
                Json(json!({
                    "success": true,
                    "live": {"onlineMembers": 42, "activeVoiceSessions": 3, "currentlyPlaying": 11},
                    "cached": false,
                    "performance": {"queryMs": 2}
                }))
            }),
        )
        .route(
            "/api/homepage/games/popular",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": [{"name": "Valheim", "playerCount": 9, "totalHours": 80}]
                }))
            }),
        )
}

async fn wait_for<S, P>(reader: &mut StatsReader<S>, predicate: P) -> StoreState<S>
where
    S: guildstats_sync::TrackedSnapshot,
    P: Fn(&StoreState<S>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(state) = reader.next_state().await {
            if predicate(&state) {
                return state;
            }
        }
        panic!("poller stopped before the expected state");
    })
    .await
    .expect("expected state within 5s")
}

fn config(api_url: String) -> SyncConfig {
    SyncConfig {
        api_url,
        request_timeout_ms: Some(2_000),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_both_pollers_publish_normalized_snapshots() {
    let api_url = spawn_server(dashboard_api()).await;
    let mut events = subscribe_sync_events();
    let mut sync = StatsSync::start(config(api_url)).unwrap();

    let mut aggregate = sync.aggregate();
    let state = wait_for(&mut aggregate, |s| s.status == ConnectionStatus::Connected).await;
    let stats = state.snapshot.expect("snapshot");
    assert_eq!(stats.members.total, 1283);
    assert_eq!(stats.members.active, 310);
    assert_eq!(stats.members.new_this_week, 0);
    assert_eq!(stats.activity.total_messages, 0);
    assert_eq!(stats.highlights.top_users[0].id, "7");
    assert!(!stats.fallback);
    assert_eq!(state.revision, 1);

    let mut live = sync.live();
    let state = wait_for(&mut live, |s| s.status == ConnectionStatus::Connected).await;
    assert_eq!(state.snapshot.map(|s| s.online_members), Some(42));

    let games = sync.popular_games(Timeframe::Week, 5).await.unwrap();
    assert_eq!(games[0].name, "Valheim");
    assert_eq!(games[0].players, 9);

    let bootstrapped = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::SnapshotChanged {
                    class: StatsClass::Live,
                    bootstrap: true,
                    ..
                }) => break true,
                Ok(_) => continue,
                Err(_) => break false,
            }
        }
    })
    .await
    .unwrap_or(false);
    assert!(bootstrapped);

    sync.shutdown();
    assert!(!sync.is_running());
}

#[tokio::test]
async fn test_unavailable_api_shows_fallback_and_error() {
    let router = Router::new().route(
        "/api/homepage/stats",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response() }),
    );
    let api_url = spawn_server(router).await;
    let sync = StatsSync::start(config(api_url)).unwrap();

    let mut aggregate = sync.aggregate();
    let state = wait_for(&mut aggregate, |s| s.status == ConnectionStatus::Error).await;
    assert!(state.is_fallback());
    assert_eq!(state.retry_count, 1);
    assert!(state.error.map(|e| e.is_transient()).unwrap_or(false));

    // Unknown route: 404 is fatal, but the floor is still shown.
    let mut live = sync.live();
    let state = wait_for(&mut live, |s| s.status == ConnectionStatus::Error).await;
    assert!(state.is_fallback());
    assert!(state.error.map(|e| !e.is_transient()).unwrap_or(false));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = SyncConfig::default();
    config.live.refresh_interval_ms = 0;
    assert!(StatsSync::start(config).is_err());
}
