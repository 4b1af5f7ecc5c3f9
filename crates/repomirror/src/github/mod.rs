//! GitHub REST client for mirroring.
//!
//! Lists the authenticated account's own repositories, creates repositories
//! and flips their visibility. Git transport uses
//! `https://github.com/{owner}/{name}.git`.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for GitHub API operations
//! - [`types`] - Wire types and constants
//! - [`client`] - The `PlatformClient` implementation
//! - [`convert`] - Conversion to platform types
//! - [`pagination`] - `Link` header parsing
//!
//! ```ignore
//! use repomirror::github::GitHubClient;
//! use repomirror::platform::PlatformCredential;
//!
//! let client = GitHubClient::new(None, PlatformCredential::new("octocat", token), timeout)?;
//! ```

mod client;
mod convert;
mod error;
mod pagination;
mod types;

pub use client::GitHubClient;
pub use convert::to_repository;
pub use error::{GitHubError, is_rate_limit_error};
pub use pagination::{LinkPagination, parse_link_header};
pub use types::{GITHUB_API_HOST, GitHubOwner, GitHubRepo, PAGE_SIZE};
