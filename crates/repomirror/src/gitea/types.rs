//! Gitea API data types.

use serde::{Deserialize, Serialize};

/// Default Codeberg host.
pub const CODEBERG_HOST: &str = "https://codeberg.org";

/// `limit` used for repository listings (Gitea's default maximum).
pub const PAGE_SIZE: u32 = 50;

/// Gitea repository - fields we need from the API response.
///
/// Only the fields used for mirroring are declared, which keeps parsing
/// resilient to API changes.
///
/// API docs: https://docs.gitea.com/api/1.20/#tag/user/operation/userCurrentListRepos
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaRepo {
    /// Repository ID.
    pub id: i64,
    /// Repository name.
    pub name: String,
    /// Whether the repository is private.
    pub private: bool,
    /// Owner information.
    pub owner: GiteaUser,
}

/// Gitea user/organization.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaUser {
    /// Username/login.
    pub login: String,
}

/// Body of `POST /user/repos`.
#[derive(Debug, Serialize)]
pub struct CreateRepoOption<'a> {
    pub name: &'a str,
    pub private: bool,
}

/// Body of `PATCH /repos/{owner}/{repo}` when only visibility changes.
#[derive(Debug, Serialize)]
pub struct EditRepoOption {
    pub private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_deserializes_codeberg_payload() {
        let json = serde_json::json!({
            "id": 7,
            "name": "dotfiles",
            "full_name": "alice/dotfiles",
            "private": true,
            "fork": false,
            "owner": { "id": 3, "login": "alice", "full_name": "" },
            "clone_url": "https://codeberg.org/alice/dotfiles.git"
        });
        let repo: GiteaRepo = serde_json::from_value(json).unwrap();
        assert_eq!(repo.owner.login, "alice");
        assert!(repo.private);
    }
}
