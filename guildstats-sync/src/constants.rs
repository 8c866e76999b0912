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

// Aggregate stats change slowly; the server re-aggregates every few minutes.
pub const AGGREGATE_REFRESH_INTERVAL_MS: u64 = 5 * 60 * 1000;
pub const AGGREGATE_STALE_TOLERANCE_MS: u64 = 60 * 1000;
pub const AGGREGATE_HEALTH_CHECK_INTERVAL_MS: u64 = 30 * 1000;

pub const LIVE_REFRESH_INTERVAL_MS: u64 = 30 * 1000;
pub const LIVE_STALE_TOLERANCE_MS: u64 = 15 * 1000;
pub const LIVE_HEALTH_CHECK_INTERVAL_MS: u64 = 5 * 1000;

pub const BACKOFF_BASE_MS: u64 = 1000;
pub const BACKOFF_MAX_MS: u64 = 30 * 1000;
pub const BACKOFF_MAX_RETRIES: u32 = 5;

pub const ANIMATION_DURATION_MS: u64 = 1200;
// ~60 Hz
pub const ANIMATION_FRAME_INTERVAL_MS: u64 = 16;

pub const DISPLAY_SWITCH_INTERVAL_MS: u64 = 5000;
pub const DISPLAY_TRANSITION_MS: u64 = 300;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
