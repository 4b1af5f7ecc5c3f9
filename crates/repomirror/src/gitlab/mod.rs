//! GitLab REST client for mirroring.
//!
//! Works with gitlab.com and self-hosted instances. Projects are matched by
//! their path (slug); `internal` visibility is treated as private.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitLab API operations
//! - [`types`] - Wire types and constants
//! - [`client`] - The `PlatformClient` implementation
//! - [`convert`] - Conversion to platform types

mod client;
mod convert;
mod error;
mod types;

pub use client::GitLabClient;
pub use convert::{gitlab_visibility, to_repository};
pub use error::{GitLabError, is_rate_limit_error};
pub use types::{GITLAB_HOST, GitLabNamespace, GitLabProject, PAGE_SIZE};
