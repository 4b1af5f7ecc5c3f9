//! Configuration file support for repomirror.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOMIRROR_`, nested keys joined
//!    with `__`, e.g. `REPOMIRROR_SOURCE__TOKEN`)
//! 3. Local config file (`./repomirror.toml`)
//! 4. User config file (`~/.config/repomirror/config.toml`)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [source]
//! platform = "github"
//! username = "alice"
//! token = "ghp_..."               # or REPOMIRROR_SOURCE__TOKEN
//! approximate_repo_count = 250
//!
//! [target]
//! platform = "gitea"
//! host = "https://codeberg.org"
//! username = "alice"
//! token = "..."                   # or REPOMIRROR_TARGET__TOKEN
//!
//! [mirror]
//! include_private = true
//! max_in_flight = 1
//! on_failure = "abort"            # or "continue"
//!
//! [http]
//! request_timeout_secs = 30
//! mutation_concurrency = 4        # creates/updates in flight
//! requests_per_second = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use repomirror::catalog::DEFAULT_APPROXIMATE_COUNT;
use repomirror::pipeline::DEFAULT_CONCURRENCY;
use repomirror::{FailurePolicy, PlatformCredential, PlatformKind};
use serde::Deserialize;

/// Environment variable prefix.
const ENV_PREFIX: &str = "REPOMIRROR";

/// Local config file name, looked up in the working directory.
const LOCAL_CONFIG: &str = "repomirror.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Account repositories are read from.
    pub source: EndpointConfig,
    /// Account repositories are mirrored into.
    pub target: EndpointConfig,
    /// Run behaviour.
    pub mirror: MirrorConfig,
    /// API client settings.
    pub http: HttpConfig,
}

/// One side of the mirror.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Forge software: `github`, `gitlab` or `gitea` (`forgejo`/`codeberg`).
    pub platform: Option<PlatformKind>,
    /// API host. Defaults to the public instance of the platform.
    pub host: Option<String>,
    /// Account name; owner of created repositories on the target.
    pub username: Option<String>,
    /// Personal access token.
    pub token: Option<String>,
    /// Rough size of the account, used to size the first listing burst.
    pub approximate_repo_count: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            platform: None,
            host: None,
            username: None,
            token: None,
            approximate_repo_count: DEFAULT_APPROXIMATE_COUNT,
        }
    }
}

/// Which configured endpoint a command talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    /// Config section name.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EndpointConfig {
    /// The configured platform, or an error naming the missing key.
    pub fn platform(&self, side: Side) -> Result<PlatformKind, ConfigError> {
        self.platform
            .ok_or_else(|| missing(side, "platform", "github, gitlab or gitea"))
    }

    /// Username and token, both required.
    pub fn credential(&self, side: Side) -> Result<PlatformCredential, ConfigError> {
        let username = self
            .username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| missing(side, "username", "the account name"))?;
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| missing(side, "token", "a personal access token"))?;
        Ok(PlatformCredential::new(username.trim(), token.trim()))
    }
}

fn missing(side: Side, key: &str, hint: &str) -> ConfigError {
    ConfigError::Message(format!(
        "[{side}] {key} is not set (expected {hint}); set it in {LOCAL_CONFIG} or {ENV_PREFIX}_{}__{}",
        side.as_str().to_uppercase(),
        key.to_uppercase()
    ))
}

/// Run behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Mirror private source repositories too.
    pub include_private: bool,
    /// Accepted for compatibility; targets are never deleted.
    pub remove_non_existent: bool,
    /// Plan only.
    pub dry_run: bool,
    /// Mirror jobs running at once.
    pub max_in_flight: usize,
    /// What a failed mirror job does to the rest of the run.
    pub on_failure: FailurePolicy,
    /// Parent directory for scratch clones. Defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            include_private: true,
            remove_non_existent: false,
            dry_run: false,
            max_in_flight: 1,
            on_failure: FailurePolicy::Abort,
            scratch_dir: None,
        }
    }
}

/// API client settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Listing pages requested at once.
    pub page_concurrency: usize,
    /// Create and visibility update calls in flight at once.
    pub mutation_concurrency: usize,
    /// Proactive request rate per forge. Unset disables rate limiting.
    pub requests_per_second: Option<u32>,
    /// Retries of rate-limited calls. 0 fails on the first rate limit.
    pub max_retries: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            page_concurrency: 4,
            mutation_concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: None,
            max_retries: 0,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// An explicit `path` replaces the user and local config files and must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        match path {
            Some(path) => {
                tracing::debug!("Loading config from {:?}", path);
                builder = builder.add_source(File::from(path.to_path_buf()).format(FileFormat::Toml));
            }
            None => {
                if let Some(user_config) = Self::default_config_path()
                    && user_config.exists()
                {
                    tracing::debug!("Loading config from {:?}", user_config);
                    builder = builder.add_source(
                        File::from(user_config)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }

                let local_config = PathBuf::from(LOCAL_CONFIG);
                if local_config.exists() {
                    tracing::debug!("Loading config from ./{LOCAL_CONFIG}");
                    builder = builder.add_source(
                        File::from(local_config)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(Self::environment());
        builder.build()?.try_deserialize()
    }

    /// `REPOMIRROR_SECTION__KEY` environment variables.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repomirror").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the endpoint for one side.
    pub fn endpoint(&self, side: Side) -> &EndpointConfig {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }
}
