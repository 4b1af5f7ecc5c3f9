//! Forge software kinds.

use serde::{Deserialize, Serialize};

/// Supported forge kinds.
///
/// This is the kind of software, not a deployment: both `github.com` and a
/// GitHub Enterprise host are [`PlatformKind::GitHub`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// GitHub (github.com or GitHub Enterprise)
    GitHub,
    /// GitLab (gitlab.com or self-hosted GitLab)
    GitLab,
    /// Gitea or Forgejo (includes Codeberg)
    #[serde(alias = "forgejo", alias = "codeberg")]
    Gitea,
}

impl PlatformKind {
    /// Host used when none is configured.
    #[must_use]
    pub fn default_host(self) -> &'static str {
        match self {
            PlatformKind::GitHub => "https://api.github.com",
            PlatformKind::GitLab => "https://gitlab.com",
            PlatformKind::Gitea => "https://codeberg.org",
        }
    }

    /// Human readable product name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            PlatformKind::GitHub => "GitHub",
            PlatformKind::GitLab => "GitLab",
            PlatformKind::Gitea => "Gitea",
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::GitHub => write!(f, "github"),
            PlatformKind::GitLab => write!(f, "gitlab"),
            PlatformKind::Gitea => write!(f, "gitea"),
        }
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(PlatformKind::GitHub),
            "gitlab" => Ok(PlatformKind::GitLab),
            "gitea" | "forgejo" | "codeberg" => Ok(PlatformKind::Gitea),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}
