//! Conversion from GitLab API types to platform types.

use super::types::GitLabProject;
use crate::platform::{Repository, Visibility};

/// Map GitLab's three visibility levels onto public/private.
///
/// `internal` projects are only readable by signed-in users, so they count
/// as private.
pub fn gitlab_visibility(level: &str) -> Visibility {
    match level {
        "public" => Visibility::Public,
        _ => Visibility::Private,
    }
}

/// Spelling GitLab uses for a visibility level.
pub fn visibility_level(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Private => "private",
    }
}

/// Convert a GitLab project to a platform-agnostic Repository.
///
/// The project path (slug) is used as the name since that is what other
/// forges call the repository.
pub fn to_repository(project: &GitLabProject) -> Repository {
    let owner = project
        .path_with_namespace
        .rsplit_once('/')
        .map(|(ns, _)| ns.to_string())
        .unwrap_or_else(|| project.namespace.full_path.clone());

    Repository {
        platform_id: Some(project.id),
        owner,
        name: project.path.clone(),
        visibility: gitlab_visibility(&project.visibility),
    }
}
