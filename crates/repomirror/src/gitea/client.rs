//! Gitea API client creation and management.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::convert::to_repository;
use super::error::{GiteaError, short_error_message};
use super::types::{CODEBERG_HOST, CreateRepoOption, EditRepoOption, GiteaRepo, PAGE_SIZE};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport, header_get};
use crate::platform::{
    self, PlatformClient, PlatformCredential, PlatformId, PlatformKind, RepoPage, Repository,
    Visibility,
};

/// Gitea API client.
///
/// Compatible with Codeberg, Forgejo, and other Gitea-based forges.
#[derive(Clone)]
pub struct GiteaClient {
    transport: Arc<dyn HttpTransport>,
    host: String,
    credential: PlatformCredential,
}

impl GiteaClient {
    /// Create a new Gitea client.
    ///
    /// # Arguments
    ///
    /// * `host` - Gitea host URL (e.g., "https://codeberg.org"); `None` uses Codeberg
    /// * `credential` - Username and personal access token
    /// * `timeout` - Per-request timeout
    ///
    /// # Example
    ///
    /// ```ignore
    /// let credential = PlatformCredential::new("alice", "token");
    /// let client = GiteaClient::new(Some("https://git.example.com"), credential, Duration::from_secs(30))?;
    /// ```
    pub fn new(
        host: Option<&str>,
        credential: PlatformCredential,
        timeout: StdDuration,
    ) -> Result<Self, GiteaError> {
        let transport =
            ReqwestTransport::with_timeout(timeout).map_err(|e| GiteaError::Config(e.to_string()))?;
        Self::new_with_transport(host, credential, Arc::new(transport))
    }

    pub fn new_with_transport(
        host: Option<&str>,
        credential: PlatformCredential,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GiteaError> {
        let host = platform::normalize_base_url(host.unwrap_or(CODEBERG_HOST))
            .map_err(|e| GiteaError::Config(e.to_string()))?;
        Ok(Self {
            transport,
            host,
            credential,
        })
    }

    /// Get the host URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn headers(&self, with_body: bool) -> HttpHeaders {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), "repomirror".to_string()),
            (
                "Authorization".to_string(),
                format!("token {}", self.credential.token),
            ),
        ];
        if with_body {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers
    }

    async fn send<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse, GiteaError> {
        let body = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };
        let request = HttpRequest {
            method,
            url: format!("{}/api/v1{}", self.host, path),
            headers: self.headers(!body.is_empty()),
            body,
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GiteaError::Http(e.to_string()))?;

        if response.is_success() {
            return Ok(response);
        }

        let err = match Self::parse_rate_limit_reset(&response) {
            Some(reset_at) => GiteaError::RateLimited { reset_at },
            None => GiteaError::Api {
                status: response.status,
                message: String::from_utf8_lossy(&response.body).to_string(),
            },
        };
        tracing::debug!(
            method = method.as_str(),
            path,
            error = %short_error_message(&err),
            "Gitea request failed"
        );
        Err(err)
    }

    /// Reset time of an exhausted rate limit, from `X-RateLimit-*` headers.
    fn parse_rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
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

    /// `GET /user/repos?page=N&limit=50`.
    ///
    /// More pages follow while `X-Total-Count` says so; without that header a
    /// full page is taken to mean another may follow.
    pub async fn list_user_repos_page(
        &self,
        page: u32,
    ) -> Result<(Vec<GiteaRepo>, bool), GiteaError> {
        let path = format!("/user/repos?page={page}&limit={PAGE_SIZE}");
        let response = self.send::<()>(HttpMethod::Get, &path, None).await?;
        let repos: Vec<GiteaRepo> = serde_json::from_slice(&response.body)?;
        let has_more = match response
            .header("x-total-count")
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(total) => u64::from(page) * u64::from(PAGE_SIZE) < total,
            None => repos.len() as u32 >= PAGE_SIZE,
        };
        Ok((repos, has_more))
    }

    /// `POST /user/repos`.
    pub async fn create_user_repo(
        &self,
        name: &str,
        private: bool,
    ) -> Result<GiteaRepo, GiteaError> {
        let body = CreateRepoOption { name, private };
        let response = self
            .send(HttpMethod::Post, "/user/repos", Some(&body))
            .await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// `PATCH /repos/{owner}/{repo}` with `{"private": ..}`.
    pub async fn set_repo_private(
        &self,
        owner: &str,
        name: &str,
        private: bool,
    ) -> Result<(), GiteaError> {
        let body = EditRepoOption { private };
        let path = format!("/repos/{owner}/{name}");
        self.send(HttpMethod::Patch, &path, Some(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for GiteaClient {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Gitea
    }

    fn platform_name(&self) -> String {
        let host = self.host.split("://").nth(1).unwrap_or(&self.host);
        format!("Gitea ({host})")
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
        let repo = self.create_user_repo(name, visibility.is_private()).await?;
        Ok(repo.id)
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
        format!("{}/{}/{}.git", self.host, repo.owner, repo.name)
    }
}
