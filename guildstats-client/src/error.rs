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

//! Error types for the statistics API client.

use thiserror::Error;

/// Errors returned by [`StatsApiClient`](crate::StatsApiClient) methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// The body could not be decoded into the expected envelope.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The envelope decoded but reported `success: false`.
    #[error("Request unsuccessful: {0}")]
    Unsuccessful(String),

    /// A network or transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A configuration error (e.g. empty base URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status code, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServerError { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying the same request later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Unsuccessful(_) => true,
            ApiError::ServerError { status, .. } => *status >= 500 || *status == 429,
            ApiError::Malformed(_) | ApiError::Config(_) => false,
        }
    }
}
