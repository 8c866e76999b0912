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

//! Animated counters and display group cards on a paused clock.

mod common;

use std::time::Duration;

use common::*;
use guildstats_sync::poller::{self, PollerOptions};
use guildstats_sync::{
    AnimatedCounters, AnimationConfig, CardState, DisplayGroup, DisplayMode, SwitchSchedule,
};
use tokio::time::Instant;

fn animation() -> AnimationConfig {
    AnimationConfig {
        duration_ms: 1_200,
        frame_interval_ms: 16,
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_identical_live_fetches_animate_once() {
    let fetcher = ScriptedFetcher::new(vec![ok(live(42)), ok(live(42))]);
    let probes = fetcher.probes();
    let handle = poller::spawn(fetcher, PollerOptions::live());
    let counters = AnimatedCounters::spawn(handle.reader(), &animation());

    advance_ms(31_000).await;
    assert_eq!(probes.calls(), 2);
    let frame = counters.current();
    assert_eq!(frame.updates, 1);
    assert!(!frame.animating);
    assert_eq!(frame.rounded("online_members"), Some(42));
}

#[tokio::test(start_paused = true)]
async fn test_counter_animates_to_exact_target() {
    let fetcher = ScriptedFetcher::new(vec![ok(live(100)), ok(live(1283))]);
    let handle = poller::spawn(fetcher, PollerOptions::live());
    let mut counters = AnimatedCounters::spawn(handle.reader(), &animation());

    advance_ms(10).await;
    assert_eq!(counters.current().rounded("online_members"), Some(100));

    // Second fetch at 30s starts an animation.
    advance_ms(30_000).await;
    let mut seen = Vec::new();
    loop {
        let frame = counters.next_frame().await.expect("board running");
        seen.push(frame.get("online_members").unwrap());
        if !frame.animating {
            break;
        }
    }
    assert!(seen.len() > 10, "only {} frames", seen.len());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), 1283.0);
    assert_eq!(counters.current().updates, 2);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_floor_then_real_value_is_immediate() {
    let fetcher = ScriptedFetcher::new(vec![transient(), ok(live(1283))]);
    let handle = poller::spawn(fetcher, PollerOptions::live());
    let counters = AnimatedCounters::spawn(handle.reader(), &animation());

    advance_ms(10).await;
    let floor = counters.current();
    assert!(floor.floor);
    assert_eq!(floor.rounded("online_members"), Some(0));

    // Backoff retry at 1s.
    advance_ms(1_000).await;
    let frame = counters.current();
    assert!(!frame.floor);
    assert!(!frame.animating);
    assert_eq!(frame.rounded("online_members"), Some(1283));
}

#[tokio::test(start_paused = true)]
async fn test_cards_mounted_at_different_times_flip_together() {
    let group = DisplayGroup::new(
        SwitchSchedule::new(Duration::from_millis(5_000), Duration::from_millis(300)).unwrap(),
    );
    let first = group.mount_card();
    advance_ms(1_700).await;
    let second = group.mount_card();
    advance_ms(2_100).await;
    let third = group.mount_card();

    for probe_ms in [1_250, 350, 2_000, 1_000, 300, 4_000] {
        advance_ms(probe_ms).await;
        let expected = group.state_at(Instant::now());
        assert_eq!(first.state(), expected);
        assert_eq!(second.state(), expected);
        assert_eq!(third.state(), expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_card_walks_through_both_phases() {
    let group = DisplayGroup::new(
        SwitchSchedule::new(Duration::from_millis(5_000), Duration::from_millis(300)).unwrap(),
    );
    let mut card = group.mount_card();
    assert_eq!(card.state(), CardState::default());

    let fade_out = card.changed().await.expect("card running");
    assert_eq!(
        fade_out,
        CardState {
            mode: DisplayMode::Real,
            transitioning: true
        }
    );
    let swapped = card.changed().await.expect("card running");
    assert_eq!(
        swapped,
        CardState {
            mode: DisplayMode::Comparison,
            transitioning: false
        }
    );
    let elapsed = Instant::now() - group.schedule().epoch();
    assert!(elapsed >= Duration::from_millis(5_300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(5_310), "{elapsed:?}");
}
