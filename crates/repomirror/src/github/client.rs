//! GitHub REST client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::convert::to_repository;
use super::error::GitHubError;
use super::pagination::parse_link_header;
use super::types::{
    ACCEPT_HEADER, CreateRepoRequest, GITHUB_API_HOST, GitHubRepo, PAGE_SIZE,
    UpdateVisibilityRequest,
};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport, header_get};
use crate::platform::{
    self, PlatformClient, PlatformCredential, PlatformId, PlatformKind, RepoPage, Repository,
    Visibility,
};

/// GitHub API client bound to one account.
///
/// Works against github.com and GitHub Enterprise (`https://host/api/v3`).
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    web_base: String,
    credential: PlatformCredential,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    ///
    /// # Arguments
    ///
    /// * `api_host` - REST base, e.g. `https://api.github.com`; `None` uses github.com
    /// * `credential` - Username and personal access token
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_host: Option<&str>,
        credential: PlatformCredential,
        timeout: StdDuration,
    ) -> Result<Self, GitHubError> {
        let transport =
            ReqwestTransport::with_timeout(timeout).map_err(|e| GitHubError::Config(e.to_string()))?;
        Self::new_with_transport(api_host, credential, Arc::new(transport))
    }

    pub fn new_with_transport(
        api_host: Option<&str>,
        credential: PlatformCredential,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GitHubError> {
        let api_base = platform::normalize_base_url(api_host.unwrap_or(GITHUB_API_HOST))
            .map_err(|e| GitHubError::Config(e.to_string()))?;
        let web_base = web_base_for(&api_base);
        Ok(Self {
            transport,
            api_base,
            web_base,
            credential,
        })
    }

    /// REST base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Browser/git base URL.
    pub fn web_base(&self) -> &str {
        &self.web_base
    }

    fn headers(&self, with_body: bool) -> HttpHeaders {
        let mut headers = vec![
            ("Accept".to_string(), ACCEPT_HEADER.to_string()),
            ("User-Agent".to_string(), "repomirror".to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.credential.token),
            ),
            ("X-GitHub-Api-Version".to_string(), "2022-11-28".to_string()),
        ];
        if with_body {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers
    }

    /// Send a request and turn non-2xx responses into errors.
    async fn send<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse, GitHubError> {
        let body = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };
        let request = HttpRequest {
            method,
            url: format!("{}{}", self.api_base, path),
            headers: self.headers(!body.is_empty()),
            body,
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        if response.is_success() {
            return Ok(response);
        }

        if let Some(reset_at) = rate_limit_reset(&response) {
            return Err(GitHubError::RateLimited { reset_at });
        }

        Err(GitHubError::Api {
            status: response.status,
            message: String::from_utf8_lossy(&response.body).to_string(),
        })
    }

    /// `GET /user/repos?type=owner&page=N&per_page=30`.
    ///
    /// Returns the page and whether the `Link` header announces another.
    pub async fn list_user_repos_page(
        &self,
        page: u32,
    ) -> Result<(Vec<GitHubRepo>, bool), GitHubError> {
        let path = format!("/user/repos?type=owner&page={page}&per_page={PAGE_SIZE}");
        let response = self.send::<()>(HttpMethod::Get, &path, None).await?;
        if response.body.is_empty() {
            return Err(GitHubError::EmptyBody);
        }
        let repos: Vec<GitHubRepo> = serde_json::from_slice(&response.body)?;
        let has_more = response
            .header("link")
            .map(|link| parse_link_header(link).has_next())
            .unwrap_or(false);
        Ok((repos, has_more))
    }

    /// `POST /user/repos`.
    pub async fn create_user_repo(
        &self,
        name: &str,
        private: bool,
    ) -> Result<GitHubRepo, GitHubError> {
        let body = CreateRepoRequest { name, private };
        let response = self
            .send(HttpMethod::Post, "/user/repos", Some(&body))
            .await?;
        if response.body.is_empty() {
            return Err(GitHubError::EmptyBody);
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// `PATCH /repos/{owner}/{repo}` with `{"private": ..}`.
    pub async fn set_repo_private(
        &self,
        owner: &str,
        name: &str,
        private: bool,
    ) -> Result<(), GitHubError> {
        let body = UpdateVisibilityRequest { private };
        let path = format!("/repos/{owner}/{name}");
        self.send(HttpMethod::Patch, &path, Some(&body)).await?;
        Ok(())
    }
}

/// Map the REST base to the host git talks to.
fn web_base_for(api_base: &str) -> String {
    if let Some(rest) = api_base.strip_prefix("https://api.") {
        return format!("https://{rest}");
    }
    api_base
        .strip_suffix("/api/v3")
        .unwrap_or(api_base)
        .to_string()
}

/// GitHub signals an exhausted primary limit with 403 and a zero remaining count.
fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    let exhausted = header_get(&response.headers, "x-ratelimit-remaining") == Some("0");
    if response.status != 429 && !(response.status == 403 && exhausted) {
        return None;
    }
    let reset = header_get(&response.headers, "x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(1));
    Some(reset)
}

#[async_trait]
impl PlatformClient for GitHubClient {
    fn kind(&self) -> PlatformKind {
        PlatformKind::GitHub
    }

    fn platform_name(&self) -> String {
        let host = self
            .web_base
            .split("://")
            .nth(1)
            .unwrap_or(&self.web_base);
        format!("GitHub ({host})")
    }

    fn credential(&self) -> &PlatformCredential {
        &self.credential
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    async fn list_repositories_page(&self, page: u32) -> platform::Result<RepoPage> {
        let (repos, has_more) = self.list_user_repos_page(page).await?;
        Ok(RepoPage {
            repositories: repos.iter().map(to_repository).collect(),
            has_more,
        })
    }

    async fn create_repository(
        &self,
        name: &str,
        visibility: Visibility,
    ) -> platform::Result<PlatformId> {
        let created = self.create_user_repo(name, visibility.is_private()).await?;
        Ok(created.id)
    }

    async fn update_repository_visibility(
        &self,
        repo: &Repository,
        visibility: Visibility,
    ) -> platform::Result<()> {
        self.set_repo_private(&repo.owner, &repo.name, visibility.is_private())
            .await?;
        Ok(())
    }

    fn remote_url(&self, repo: &Repository) -> String {
        format!("{}/{}/{}.git", self.web_base, repo.owner, repo.name)
    }
}
