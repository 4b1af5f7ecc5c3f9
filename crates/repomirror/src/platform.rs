//! Platform-agnostic trait for forge clients.
//!
//! This module defines the `PlatformClient` trait that gives the catalog,
//! reconciler and pipeline one interface over GitHub, GitLab and Gitea.
//!
//! # Example
//!
//! ```ignore
//! use repomirror::platform::{PlatformClient, Visibility};
//!
//! async fn ensure_repo<C: PlatformClient>(client: &C) -> Result<(), PlatformError> {
//!     let page = client.list_repositories_page(1).await?;
//!     if !page.repositories.iter().any(|r| r.name == "dotfiles") {
//!         client.create_repository("dotfiles", Visibility::Private).await?;
//!     }
//!     Ok(())
//! }
//! ```

mod errors;
mod kind;
mod rate_limit;
mod types;
mod visibility;

pub use errors::{PlatformError, Result, short_error_message};
pub use kind::PlatformKind;
pub use rate_limit::{ApiRateLimiter, RateLimitedClient, default_rps_for_platform, rate_limits};
pub use types::{
    PlatformClient, PlatformCredential, PlatformId, RepoPage, Repository, normalize_base_url,
};
pub use visibility::Visibility;
