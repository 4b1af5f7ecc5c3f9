//! GitHub API data types.

use serde::{Deserialize, Serialize};

/// Default REST API base.
pub const GITHUB_API_HOST: &str = "https://api.github.com";

/// `per_page` used for `/user/repos`; GitHub's own default.
pub const PAGE_SIZE: u32 = 30;

/// Media type GitHub documents for REST v3.
pub const ACCEPT_HEADER: &str = "application/vnd.github+json";

/// Repository fields we need from `/user/repos`.
///
/// Only the fields used for mirroring are declared so unrelated API changes
/// don't break parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    pub owner: GitHubOwner,
    pub private: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

/// Body of `POST /user/repos`.
#[derive(Debug, Serialize)]
pub struct CreateRepoRequest<'a> {
    pub name: &'a str,
    pub private: bool,
}

/// Body of `PATCH /repos/{owner}/{repo}` when only visibility changes.
#[derive(Debug, Serialize)]
pub struct UpdateVisibilityRequest {
    pub private: bool,
}
