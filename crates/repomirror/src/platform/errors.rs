use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur when talking to a forge.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// API error from the platform.
    #[error("API error: {message}")]
    Api { message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Authentication required or the token was rejected.
    #[error("Authentication required")]
    AuthRequired,

    /// Resource not found (repository, project, account).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The resource to create already exists.
    #[error("Already exists: {resource}")]
    AlreadyExists { resource: String },

    /// Network or connection error, including timeouts.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    /// Create an API error.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify a non-2xx response.
    ///
    /// 401/403 map to [`PlatformError::AuthRequired`], 404 to `NotFound`,
    /// 409 to `AlreadyExists`, 429 to `RateLimited` (one minute from now, or
    /// `reset_epoch` when the forge sent one). Everything else keeps the
    /// status and body text.
    pub fn from_status(status: u16, message: String, reset_epoch: Option<i64>) -> Self {
        match status {
            401 | 403 => Self::AuthRequired,
            404 => Self::NotFound { resource: message },
            409 => Self::AlreadyExists { resource: message },
            429 => Self::RateLimited {
                reset_at: reset_epoch
                    .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
                    .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(1)),
            },
            _ => Self::Api {
                message: format!("HTTP {status}: {message}"),
            },
        }
    }

    /// Check if this error is a rate limit error (retryable).
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that carry multi-line response bodies.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
