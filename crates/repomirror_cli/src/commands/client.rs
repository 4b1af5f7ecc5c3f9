//! Builds platform clients from configuration.

use std::sync::Arc;

use repomirror::{PlatformClient, PlatformKind, RateLimitedClient};

use crate::config::{Config, Side};

/// Build the client for one configured side.
///
/// With `http.requests_per_second` set, the client is wrapped in a
/// [`RateLimitedClient`].
pub(crate) fn build_client(
    config: &Config,
    side: Side,
) -> Result<Arc<dyn PlatformClient>, Box<dyn std::error::Error>> {
    let endpoint = config.endpoint(side);
    let kind = endpoint.platform(side)?;
    let credential = endpoint.credential(side)?;
    let host = endpoint.host.as_deref();
    let timeout = config.http.request_timeout();
    let rps = config.http.requests_per_second;

    tracing::debug!(side = %side, platform = %kind, host = ?host, "Building client");

    match kind {
        #[cfg(feature = "github")]
        PlatformKind::GitHub => {
            let client = repomirror::github::GitHubClient::new(host, credential, timeout)?;
            Ok(finish(client, rps))
        }
        #[cfg(feature = "gitlab")]
        PlatformKind::GitLab => {
            let client = repomirror::gitlab::GitLabClient::new(host, credential, timeout)?;
            Ok(finish(client, rps))
        }
        #[cfg(feature = "gitea")]
        PlatformKind::Gitea => {
            let client = repomirror::gitea::GiteaClient::new(host, credential, timeout)?;
            Ok(finish(client, rps))
        }
        #[allow(unreachable_patterns)]
        other => Err(format!(
            "[{side}] platform '{other}' is not supported by this build (enable the '{other}' feature)"
        )
        .into()),
    }
}

#[cfg(any(feature = "github", feature = "gitlab", feature = "gitea"))]
fn finish<C: PlatformClient + 'static>(client: C, rps: Option<u32>) -> Arc<dyn PlatformClient> {
    match rps {
        Some(rps) => Arc::new(RateLimitedClient::new(client, rps)),
        None => Arc::new(client),
    }
}
