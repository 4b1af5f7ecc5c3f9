//! Repomirror - mirror every repository of an account from one forge to another.
//!
//! A run lists the source and target accounts, pairs repositories by name,
//! creates the missing targets, aligns their visibility with the source, and
//! finally replicates all refs with a bare clone and a forced mirror push.
//!
//! # Features
//!
//! - `github` - GitHub and GitHub Enterprise client
//! - `gitlab` - GitLab (gitlab.com and self-hosted) client
//! - `gitea` - Gitea, Forgejo and Codeberg client
//!
//! All three are enabled by default.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use repomirror::gitea::GiteaClient;
//! use repomirror::github::GitHubClient;
//! use repomirror::{Git2Mirror, Pipeline, PipelineOptions, PlatformCredential};
//!
//! let source = GitHubClient::new(None, PlatformCredential::new("alice", gh_token), Duration::from_secs(30))?;
//! let target = GiteaClient::new(None, PlatformCredential::new("alice", cb_token), Duration::from_secs(30))?;
//!
//! let pipeline = Pipeline::new(
//!     Arc::new(source),
//!     Arc::new(target),
//!     Arc::new(Git2Mirror::new()),
//!     PipelineOptions::default(),
//! );
//! let report = pipeline.run(None).await?;
//! println!("mirrored {} repositories", report.mirrored.len());
//! ```

pub mod catalog;
pub mod git;
pub mod http;
pub mod mirror;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod reconcile;
pub mod retry;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "gitlab")]
pub mod gitlab;

#[cfg(feature = "gitea")]
pub mod gitea;

pub use catalog::{CatalogOptions, fetch_catalog};
pub use git::{Git2Mirror, GitError, GitMirror};
pub use mirror::{FailurePolicy, MirrorError, MirrorExecutor, MirrorOptions, MirrorSummary};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, PipelineReport, PipelineState};
pub use platform::{
    ApiRateLimiter, PlatformClient, PlatformCredential, PlatformError, PlatformKind,
    RateLimitedClient, Repository, Visibility, rate_limits,
};
pub use progress::{MirrorProgress, ProgressCallback};
pub use reconcile::{MirrorPair, ReconcileError, ReconcilePlan, ReconciliationMapping, reconcile};
