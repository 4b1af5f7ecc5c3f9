//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Primary or secondary rate limit hit.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// A 2xx response arrived without the body the endpoint promises.
    #[error("GitHub responded with an empty body")]
    EmptyBody,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) => PlatformError::Network { message },
            GitHubError::Json(e) => PlatformError::Internal {
                message: format!("JSON parse error: {}", e),
            },
            GitHubError::Api { status, message } => {
                PlatformError::from_status(status, message, None)
            }
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::EmptyBody => PlatformError::api("GitHub responded with an empty body"),
            GitHubError::Config(message) => PlatformError::Internal { message },
        }
    }
}

/// Check if a GitHubError indicates rate limiting.
pub fn is_rate_limit_error(err: &GitHubError) -> bool {
    matches!(
        err,
        GitHubError::RateLimited { .. } | GitHubError::Api { status: 429, .. }
    )
}
