//! GitLab REST (v4) client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde::Serialize;

use super::convert::{to_repository, visibility_level};
use super::error::{GitLabError, short_error_message};
use super::types::{
    CreateProjectRequest, CreatedProject, GITLAB_HOST, GitLabProject, PAGE_SIZE,
    UpdateVisibilityRequest,
};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{
    self, PlatformClient, PlatformCredential, PlatformId, PlatformKind, RepoPage, Repository,
    Visibility,
};

/// GitLab API client bound to one account.
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    host: String,
    credential: PlatformCredential,
}

impl GitLabClient {
    /// Create a client backed by reqwest.
    ///
    /// # Arguments
    ///
    /// * `host` - `gitlab.com`, `https://gitlab.example.com`, ...; `None` uses gitlab.com
    /// * `credential` - Username and personal access token (`api` scope)
    /// * `timeout` - Per-request timeout
    pub fn new(
        host: Option<&str>,
        credential: PlatformCredential,
        timeout: StdDuration,
    ) -> Result<Self, GitLabError> {
        let transport =
            ReqwestTransport::with_timeout(timeout).map_err(|e| GitLabError::Config(e.to_string()))?;
        Self::new_with_transport(host, credential, Arc::new(transport))
    }

    pub fn new_with_transport(
        host: Option<&str>,
        credential: PlatformCredential,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GitLabError> {
        let host = platform::normalize_base_url(host.unwrap_or(GITLAB_HOST))
            .map_err(|e| GitLabError::Config(e.to_string()))?;
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
                format!("Bearer {}", self.credential.token),
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
    ) -> Result<HttpResponse, GitLabError> {
        let body = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };
        let request = HttpRequest {
            method,
            url: format!("{}/api/v4{}", self.host, path),
            headers: self.headers(!body.is_empty()),
            body,
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| GitLabError::Http(e.to_string()))?;

        if response.is_success() {
            return Ok(response);
        }

        let err = GitLabError::Api {
            status: response.status,
            message: String::from_utf8_lossy(&response.body).to_string(),
            reset_epoch: response
                .header("ratelimit-reset")
                .and_then(|v| v.parse().ok()),
        };
        tracing::debug!(
            method = method.as_str(),
            path,
            error = %short_error_message(&err),
            "GitLab request failed"
        );
        Err(err)
    }

    /// `GET /projects?owned=true&page=N&per_page=100`.
    ///
    /// `X-Next-Page` is empty on the last page.
    pub async fn list_owned_projects_page(
        &self,
        page: u32,
    ) -> Result<(Vec<GitLabProject>, bool), GitLabError> {
        let path = format!("/projects?owned=true&page={page}&per_page={PAGE_SIZE}");
        let response = self.send::<()>(HttpMethod::Get, &path, None).await?;
        let projects: Vec<GitLabProject> = serde_json::from_slice(&response.body)?;
        let has_more = response
            .header("x-next-page")
            .is_some_and(|next| !next.trim().is_empty());
        Ok((projects, has_more))
    }

    /// `POST /projects` in the authenticated user's namespace.
    pub async fn create_project(
        &self,
        name: &str,
        visibility: Visibility,
    ) -> Result<CreatedProject, GitLabError> {
        let body = CreateProjectRequest {
            name,
            path: name,
            visibility: visibility_level(visibility),
        };
        let response = self.send(HttpMethod::Post, "/projects", Some(&body)).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// `PUT /projects/:id` with a new visibility level.
    ///
    /// `project` is a numeric id or a URL-encoded `namespace%2Fpath`.
    pub async fn set_project_visibility(
        &self,
        project: &str,
        visibility: Visibility,
    ) -> Result<(), GitLabError> {
        let body = UpdateVisibilityRequest {
            visibility: visibility_level(visibility),
        };
        let path = format!("/projects/{project}");
        self.send(HttpMethod::Put, &path, Some(&body)).await?;
        Ok(())
    }
}

/// Identifier GitLab accepts in `/projects/:id`.
fn project_ref(repo: &Repository) -> String {
    match repo.platform_id {
        Some(id) => id.to_string(),
        None => format!("{}%2F{}", repo.owner.replace('/', "%2F"), repo.name),
    }
}

#[async_trait]
impl PlatformClient for GitLabClient {
    fn kind(&self) -> PlatformKind {
        PlatformKind::GitLab
    }

    fn platform_name(&self) -> String {
        let host = self.host.split("://").nth(1).unwrap_or(&self.host);
        format!("GitLab ({host})")
    }

    fn credential(&self) -> &PlatformCredential {
        &self.credential
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    async fn list_repositories_page(&self, page: u32) -> platform::Result<RepoPage> {
        let (projects, has_more) = self.list_owned_projects_page(page).await?;
        Ok(RepoPage {
            repositories: projects.iter().map(to_repository).collect(),
            has_more,
        })
    }

    async fn create_repository(
        &self,
        name: &str,
        visibility: Visibility,
    ) -> platform::Result<PlatformId> {
        Ok(self.create_project(name, visibility).await?.id)
    }

    async fn update_repository_visibility(
        &self,
        repo: &Repository,
        visibility: Visibility,
    ) -> platform::Result<()> {
        self.set_project_visibility(&project_ref(repo), visibility)
            .await?;
        Ok(())
    }

    fn remote_url(&self, repo: &Repository) -> String {
        format!("{}/{}/{}.git", self.host, repo.owner, repo.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, mock_response};
    use crate::platform::PlatformError;

    fn client(transport: &MockTransport) -> GitLabClient {
        GitLabClient::new_with_transport(
            Some("gitlab.example.com/"),
            PlatformCredential::new("alice", "glpat-token"),
            Arc::new(transport.clone()),
        )
        .expect("client should build")
    }

    fn project_json(id: i64, path: &str, visibility: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": path,
            "path": path,
            "path_with_namespace": format!("alice/{path}"),
            "visibility": visibility,
            "namespace": { "id": 1, "name": "alice", "path": "alice", "kind": "user", "full_path": "alice" },
            "web_url": format!("https://gitlab.example.com/alice/{path}")
        })
    }

    #[test]
    fn test_new_normalizes_host() {
        let transport = MockTransport::new();
        let client = client(&transport);
        assert_eq!(client.host(), "https://gitlab.example.com");
        assert_eq!(client.platform_name(), "GitLab (gitlab.example.com)");
    }

    #[test]
    fn test_project_ref_prefers_id() {
        let mut repo = Repository {
            platform_id: Some(12),
            owner: "team/sub".to_string(),
            name: "tool".to_string(),
            visibility: Visibility::Public,
        };
        assert_eq!(project_ref(&repo), "12");
        repo.platform_id = None;
        assert_eq!(project_ref(&repo), "team%2Fsub%2Ftool");
    }

    #[tokio::test]
    async fn test_list_page_reads_next_page_header() {
        let transport = MockTransport::new();
        let url = "https://gitlab.example.com/api/v4/projects?owned=true&page=1&per_page=100";
        let body = serde_json::json!([
            project_json(1, "one", "public"),
            project_json(2, "two", "internal")
        ]);
        transport.push_response(
            HttpMethod::Get,
            url,
            mock_response(200, vec![("X-Next-Page", "2")], body.to_string()),
        );

        let page = client(&transport).list_repositories_page(1).await.unwrap();
        assert!(page.has_more);
        assert_eq!(page.repositories.len(), 2);
        assert_eq!(page.repositories[1].visibility, Visibility::Private);
        assert_eq!(
            transport.requests()[0].header("authorization"),
            Some("Bearer glpat-token")
        );
    }

    #[tokio::test]
    async fn test_list_last_page_has_empty_next_header() {
        let transport = MockTransport::new();
        let url = "https://gitlab.example.com/api/v4/projects?owned=true&page=3&per_page=100";
        transport.push_response(
            HttpMethod::Get,
            url,
            mock_response(200, vec![("X-Next-Page", "")], "[]"),
        );
        let page = client(&transport).list_repositories_page(3).await.unwrap();
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_create_repository_sends_name_path_visibility() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Post,
            "https://gitlab.example.com/api/v4/projects",
            mock_response(201, vec![], project_json(55, "notes", "private").to_string()),
        );

        let id = client(&transport)
            .create_repository("notes", Visibility::Private)
            .await
            .unwrap();
        assert_eq!(id, 55);

        let body: serde_json::Value =
            serde_json::from_slice(&transport.requests()[0].body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"name": "notes", "path": "notes", "visibility": "private"})
        );
    }

    #[tokio::test]
    async fn test_update_visibility_puts_by_id() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Put,
            "https://gitlab.example.com/api/v4/projects/55",
            mock_response(200, vec![], project_json(55, "notes", "public").to_string()),
        );
        let repo = Repository {
            platform_id: Some(55),
            owner: "alice".to_string(),
            name: "notes".to_string(),
            visibility: Visibility::Private,
        };

        client(&transport)
            .update_repository_visibility(&repo, Visibility::Public)
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].body_text(),
            r#"{"visibility":"public"}"#
        );
    }

    #[tokio::test]
    async fn test_rate_limited_response_carries_reset() {
        let transport = MockTransport::new();
        let url = "https://gitlab.example.com/api/v4/projects?owned=true&page=1&per_page=100";
        transport.push_response(
            HttpMethod::Get,
            url,
            mock_response(429, vec![("RateLimit-Reset", "1706400000")], "Retry later"),
        );
        match client(&transport).list_repositories_page(1).await.unwrap_err() {
            PlatformError::RateLimited { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1_706_400_000)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_remote_url() {
        let transport = MockTransport::new();
        let repo = Repository {
            platform_id: None,
            owner: "alice".to_string(),
            name: "notes".to_string(),
            visibility: Visibility::Public,
        };
        assert_eq!(
            client(&transport).remote_url(&repo),
            "https://gitlab.example.com/alice/notes.git"
        );
    }
}
