//! Gitea API client for mirroring.
//!
//! Covers Gitea-based forges (Gitea, Forgejo, Codeberg). Authentication
//! uses a personal access token with the `repository` scope.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for Gitea API operations
//! - [`types`] - Wire types and constants
//! - [`client`] - The `PlatformClient` implementation
//! - [`convert`] - Conversion to platform types

mod client;
mod convert;
mod error;
mod types;

pub use client::GiteaClient;
pub use convert::to_repository;
pub use error::{GiteaError, is_rate_limit_error};
pub use types::{CODEBERG_HOST, GiteaRepo, GiteaUser, PAGE_SIZE};
