use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::errors::Result;
use super::kind::PlatformKind;
use super::types::{PlatformClient, PlatformCredential, PlatformId, RepoPage, Repository};
use super::visibility::Visibility;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Suggested request rates per forge (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour for a token, bursts are fine.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// GitLab.com throttles authenticated API use per minute.
    pub const GITLAB_DEFAULT_RPS: u32 = 5;
    /// Gitea/Codeberg: varies by instance.
    pub const GITEA_DEFAULT_RPS: u32 = 5;
}

/// Suggested request rate for a forge kind.
pub fn default_rps_for_platform(kind: PlatformKind) -> u32 {
    match kind {
        PlatformKind::GitHub => rate_limits::GITHUB_DEFAULT_RPS,
        PlatformKind::GitLab => rate_limits::GITLAB_DEFAULT_RPS,
        PlatformKind::Gitea => rate_limits::GITEA_DEFAULT_RPS,
    }
}

fn quota(requests_per_second: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
}

/// A standalone API rate limiter using the governor crate.
///
/// # Example
///
/// ```ignore
/// use repomirror::platform::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter; 0 is treated as 1 request per second.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota(requests_per_second))),
        }
    }

    /// Wait (asynchronously) until another request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// A rate-limited wrapper around any `PlatformClient`.
///
/// Every network-bound trait method waits for the limiter before delegating.
/// Pure accessors pass straight through.
///
/// # Example
///
/// ```ignore
/// use repomirror::platform::{RateLimitedClient, rate_limits};
///
/// let client = RateLimitedClient::new(client, rate_limits::GITHUB_DEFAULT_RPS);
/// ```
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedClient<C> {
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: PlatformClient> PlatformClient for RateLimitedClient<C> {
    fn kind(&self) -> PlatformKind {
        self.inner.kind()
    }

    fn platform_name(&self) -> String {
        self.inner.platform_name()
    }

    fn credential(&self) -> &PlatformCredential {
        self.inner.credential()
    }

    fn page_size(&self) -> u32 {
        self.inner.page_size()
    }

    async fn list_repositories_page(&self, page: u32) -> Result<RepoPage> {
        self.limiter.wait().await;
        self.inner.list_repositories_page(page).await
    }

    async fn create_repository(&self, name: &str, visibility: Visibility) -> Result<PlatformId> {
        self.limiter.wait().await;
        self.inner.create_repository(name, visibility).await
    }

    async fn update_repository_visibility(
        &self,
        repo: &Repository,
        visibility: Visibility,
    ) -> Result<()> {
        self.limiter.wait().await;
        self.inner
            .update_repository_visibility(repo, visibility)
            .await
    }

    fn remote_url(&self, repo: &Repository) -> String {
        self.inner.remote_url(repo)
    }
}

// Boxed clients are what the CLI hands around.
#[async_trait]
impl PlatformClient for Box<dyn PlatformClient> {
    fn kind(&self) -> PlatformKind {
        (**self).kind()
    }

    fn platform_name(&self) -> String {
        (**self).platform_name()
    }

    fn credential(&self) -> &PlatformCredential {
        (**self).credential()
    }

    fn page_size(&self) -> u32 {
        (**self).page_size()
    }

    async fn list_repositories_page(&self, page: u32) -> Result<RepoPage> {
        (**self).list_repositories_page(page).await
    }

    async fn create_repository(&self, name: &str, visibility: Visibility) -> Result<PlatformId> {
        (**self).create_repository(name, visibility).await
    }

    async fn update_repository_visibility(
        &self,
        repo: &Repository,
        visibility: Visibility,
    ) -> Result<()> {
        (**self).update_repository_visibility(repo, visibility).await
    }

    fn remote_url(&self, repo: &Repository) -> String {
        (**self).remote_url(repo)
    }
}
