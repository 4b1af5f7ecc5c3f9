//! Conversion from Gitea API types to platform types.

use super::types::GiteaRepo;
use crate::platform::{Repository, Visibility};

/// Convert a Gitea repository to a platform-agnostic Repository.
pub fn to_repository(repo: &GiteaRepo) -> Repository {
    Repository {
        platform_id: Some(repo.id),
        owner: repo.owner.login.clone(),
        name: repo.name.clone(),
        visibility: Visibility::from_private(repo.private),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitea::types::GiteaUser;

    #[test]
    fn test_to_repository() {
        let repo = GiteaRepo {
            id: 9,
            name: "site".to_string(),
            private: false,
            owner: GiteaUser {
                login: "bob".to_string(),
            },
        };
        let converted = to_repository(&repo);
        assert_eq!(converted.platform_id, Some(9));
        assert_eq!(converted.full_name(), "bob/site");
        assert_eq!(converted.visibility, Visibility::Public);
    }
}
