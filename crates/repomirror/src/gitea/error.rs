//! Error types for Gitea API operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur when interacting with the Gitea API.
#[derive(Debug, Error)]
pub enum GiteaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<GiteaError> for PlatformError {
    fn from(err: GiteaError) -> Self {
        match err {
            GiteaError::Http(message) => PlatformError::Network { message },
            GiteaError::Json(e) => PlatformError::Internal {
                message: format!("JSON parse error: {}", e),
            },
            GiteaError::Api { status, message } => {
                PlatformError::from_status(status, message, None)
            }
            GiteaError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GiteaError::Config(message) => PlatformError::Internal { message },
        }
    }
}

/// Check if an error is a rate limit error.
pub fn is_rate_limit_error(err: &GiteaError) -> bool {
    matches!(
        err,
        GiteaError::RateLimited { .. } | GiteaError::Api { status: 429, .. }
    )
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &GiteaError) -> String {
    match err {
        GiteaError::Http(_) => "Network error".to_string(),
        GiteaError::Json(_) => "JSON parse error".to_string(),
        GiteaError::Api { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {}: {}...", status, truncated)
            } else {
                format!("HTTP {}: {}", status, message)
            }
        }
        GiteaError::RateLimited { .. } => "Rate limited".to_string(),
        GiteaError::Config(msg) => format!("Config: {}", msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_to_platform_error() {
        let err = GiteaError::Api {
            status: 404,
            message: "not found".to_string(),
        };
        let platform_err: PlatformError = err.into();
        assert!(matches!(platform_err, PlatformError::NotFound { .. }));
    }

    #[test]
    fn test_conflict_is_already_exists() {
        let err = GiteaError::Api {
            status: 409,
            message: "The repository with the same name already exists.".to_string(),
        };
        assert!(matches!(
            PlatformError::from(err),
            PlatformError::AlreadyExists { .. }
        ));
    }

    #[test]
    fn test_rate_limit_error_to_platform_error() {
        let err = GiteaError::RateLimited {
            reset_at: Utc::now(),
        };
        let platform_err: PlatformError = err.into();
        assert!(matches!(platform_err, PlatformError::RateLimited { .. }));
    }

    #[test]
    fn test_is_rate_limit_error() {
        let rate_limited = GiteaError::RateLimited {
            reset_at: Utc::now(),
        };
        assert!(is_rate_limit_error(&rate_limited));

        let api_429 = GiteaError::Api {
            status: 429,
            message: "too many requests".to_string(),
        };
        assert!(is_rate_limit_error(&api_429));

        let api_500 = GiteaError::Api {
            status: 500,
            message: "server error".to_string(),
        };
        assert!(!is_rate_limit_error(&api_500));
    }

    #[test]
    fn test_short_error_message() {
        let err = GiteaError::RateLimited {
            reset_at: Utc::now(),
        };
        assert_eq!(short_error_message(&err), "Rate limited");

        let err = GiteaError::Config("bad host".to_string());
        assert_eq!(short_error_message(&err), "Config: bad host");
    }
}
