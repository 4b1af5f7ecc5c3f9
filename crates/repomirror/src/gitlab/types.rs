//! GitLab API data types.

use serde::{Deserialize, Serialize};

/// Default GitLab host.
pub const GITLAB_HOST: &str = "https://gitlab.com";

/// `per_page` used for project listings (GitLab's maximum).
pub const PAGE_SIZE: u32 = 100;

/// GitLab project - fields we need from the API response.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    /// Project ID.
    pub id: i64,
    /// Display name (may contain spaces).
    pub name: String,
    /// Project path (slug), what appears in clone URLs.
    pub path: String,
    /// Full path including namespace (e.g., "group/subgroup/project").
    pub path_with_namespace: String,
    /// Visibility level: "public", "private", or "internal".
    pub visibility: String,
    /// Namespace information.
    pub namespace: GitLabNamespace,
}

/// GitLab namespace (group or user).
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabNamespace {
    /// Namespace path (slug).
    pub path: String,
    /// Full path (e.g., "group/subgroup").
    pub full_path: String,
}

/// Body of `POST /projects`.
#[derive(Debug, Serialize)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub visibility: &'a str,
}

/// Body of `PUT /projects/:id` when only visibility changes.
#[derive(Debug, Serialize)]
pub struct UpdateVisibilityRequest<'a> {
    pub visibility: &'a str,
}

/// Id returned by project creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProject {
    pub id: i64,
}
