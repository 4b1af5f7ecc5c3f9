//! Conversion from GitHub API types to platform types.

use super::types::GitHubRepo;
use crate::platform::{Repository, Visibility};

/// Convert a GitHub repository to a platform-agnostic Repository.
pub fn to_repository(repo: &GitHubRepo) -> Repository {
    Repository {
        platform_id: Some(repo.id),
        owner: repo.owner.login.clone(),
        name: repo.name.clone(),
        visibility: Visibility::from_private(repo.private),
    }
}
