//! GitLab API error types.

use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitLab API.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("HTTP request error: {0}")]
    Http(String),

    #[error("JSON deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("GitLab API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// `RateLimit-Reset` epoch when the response carried one.
        reset_epoch: Option<i64>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GitLabError> for PlatformError {
    fn from(err: GitLabError) -> Self {
        match err {
            GitLabError::Http(message) => PlatformError::Network { message },
            GitLabError::Deserialize(e) => PlatformError::Internal {
                message: format!("JSON parse error: {}", e),
            },
            GitLabError::Api {
                status,
                message,
                reset_epoch,
            } => {
                // GitLab answers a duplicate path with 400 "has already been taken".
                if status == 400 && message.contains("has already been taken") {
                    PlatformError::AlreadyExists { resource: message }
                } else {
                    PlatformError::from_status(status, message, reset_epoch)
                }
            }
            GitLabError::Config(message) => PlatformError::Internal { message },
        }
    }
}

/// Check if an error is a rate limit error.
pub fn is_rate_limit_error(err: &GitLabError) -> bool {
    matches!(err, GitLabError::Api { status: 429, .. })
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GitLabError) -> String {
    match err {
        GitLabError::Http(_) => "Network error".to_string(),
        GitLabError::Deserialize(_) => "JSON parse error".to_string(),
        GitLabError::Api {
            status, message, ..
        } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {}: {}...", status, truncated)
            } else {
                format!("HTTP {}: {}", status, message)
            }
        }
        GitLabError::Config(msg) => format!("Config: {}", msg),
    }
}
