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

//! Cross-platform REST client for the guildstats homepage statistics API.
//!
//! Works on WASM (browser) and native targets via [`reqwest`]. Every call
//! performs exactly one round-trip and returns a normalized snapshot from
//! [`guildstats_types`]; scheduling and retries live in `guildstats-sync`.
//!
//! # Example
//!
//! ```no_run
//! use guildstats_client::{AuthMode, StatsApiClient};
//! use guildstats_types::StatsFormat;
//!
//! # async fn example() -> Result<(), guildstats_client::ApiError> {
//! let client = StatsApiClient::new("http://localhost:3000/api", AuthMode::Anonymous)?;
//!
//! let stats = client.get_stats(StatsFormat::Quick).await?;
//! println!("{} members", stats.members.total);
//!
//! let live = client.get_live_stats().await?;
//! println!("{} online", live.online_members);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod homepage;
pub mod platform;

pub use error::ApiError;
pub use guildstats_types;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// How the client authenticates with the API.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Public homepage endpoints need no credentials.
    Anonymous,
    /// Attach `Authorization: Bearer <token>` to every request.
    Bearer(String),
}

/// A typed REST client for the homepage statistics endpoints.
#[derive(Debug, Clone)]
pub struct StatsApiClient {
    base_url: String,
    auth: AuthMode,
    timeout: Option<Duration>,
    http: Client,
}

impl StatsApiClient {
    /// Create a new client pointing at the API base URL.
    ///
    /// # Arguments
    ///
    /// * `base_url` - e.g. `"http://localhost:3000/api"`
    /// * `auth` - how to authenticate requests
    pub fn new(base_url: &str, auth: AuthMode) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::Config("base URL must not be empty".to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            auth,
            timeout: None,
            http: Client::new(),
        })
    }

    /// Set a per-request timeout. Ignored on WASM, where the browser owns
    /// request lifetimes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Update the bearer token (e.g. after a login).
    pub fn set_bearer_token(&mut self, token: String) {
        self.auth = AuthMode::Bearer(token);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a GET request with auth and timeout applied.
    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.apply_auth(self.http.get(self.url(path)));
        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.timeout {
                Some(timeout) => builder.timeout(timeout),
                None => builder,
            }
        }
        #[cfg(target_arch = "wasm32")]
        {
            builder
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMode::Anonymous => builder,
            AuthMode::Bearer(token) => {
                builder.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            }
        }
    }
}

/// Decode a JSON body, mapping non-2xx statuses and undecodable bodies to
/// [`ApiError`].
pub(crate) async fn parse_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    if !(200..=299).contains(&status) {
        return Err(ApiError::ServerError { status, body: text });
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))
}
