use async_trait::async_trait;
use serde::Serialize;

use super::errors::{PlatformError, Result};
use super::kind::PlatformKind;
use super::visibility::Visibility;

/// Platform-assigned numeric repository/project id.
pub type PlatformId = i64;

/// A repository on one forge (platform-agnostic representation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    /// Platform-specific id. `None` for a target that has not been created yet.
    pub platform_id: Option<PlatformId>,
    /// Owning account or namespace.
    pub owner: String,
    /// Repository name, unique per owner on one forge.
    pub name: String,
    /// Public or private.
    pub visibility: Visibility,
}

impl Repository {
    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// A not-yet-created copy of `source` owned by `owner`.
    #[must_use]
    pub fn placeholder_for(source: &Repository, owner: &str) -> Self {
        Self {
            platform_id: None,
            owner: owner.to_string(),
            name: source.name.clone(),
            visibility: source.visibility,
        }
    }
}

/// Username + access token for one forge.
///
/// Used for the REST API and as HTTPS basic credentials for git transport.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformCredential {
    pub username: String,
    pub token: String,
}

impl PlatformCredential {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for PlatformCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredential")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// One page of a repository listing.
#[derive(Debug, Clone, Default)]
pub struct RepoPage {
    pub repositories: Vec<Repository>,
    /// The forge indicated another page follows this one.
    pub has_more: bool,
}

/// Normalize a configured host into a base URL without a trailing slash.
///
/// A bare hostname gets `https://` prepended.
pub fn normalize_base_url(host: &str) -> Result<String> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PlatformError::internal("empty host"));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = url::Url::parse(&candidate)
        .map_err(|e| PlatformError::internal(format!("invalid host {host:?}: {e}")))?;
    if parsed.host_str().is_none() {
        return Err(PlatformError::internal(format!("invalid host {host:?}")));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Trait for forge clients.
///
/// One client is bound to one forge account: it owns the credential, knows
/// the page size of its listing endpoint and how to spell clone URLs.
///
/// # Implementation Notes
///
/// Implementors should:
/// - Return one page per `list_repositories_page` call; aggregation lives in
///   [`crate::catalog`]
/// - Convert platform-specific errors to `PlatformError`
/// - Keep `remote_url` pure
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Which forge software this client talks to.
    fn kind(&self) -> PlatformKind;

    /// Display name, e.g. `GitHub (github.com)`.
    fn platform_name(&self) -> String;

    /// Account credential used for API calls and git transport.
    fn credential(&self) -> &PlatformCredential;

    /// Repositories per listing page.
    fn page_size(&self) -> u32;

    /// Fetch one page (1-based) of the authenticated account's repositories.
    ///
    /// Private repositories are always included; callers filter.
    async fn list_repositories_page(&self, page: u32) -> Result<RepoPage>;

    /// Create an empty repository owned by the authenticated account.
    ///
    /// Returns the id the forge assigned.
    async fn create_repository(&self, name: &str, visibility: Visibility) -> Result<PlatformId>;

    /// Set the visibility of an existing repository.
    async fn update_repository_visibility(
        &self,
        repo: &Repository,
        visibility: Visibility,
    ) -> Result<()>;

    /// HTTPS clone/push URL for `repo`.
    fn remote_url(&self, repo: &Repository) -> String;
}
