//! Repository catalog: one platform's complete repository listing.
//!
//! Forges only hand out listings a page at a time. The catalog requests
//! enough pages to cover the configured approximate repository count, fetches
//! them concurrently, and folds them into one sorted, duplicate-free set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::platform::{PlatformClient, PlatformError, RepoPage, Repository, Result};
use crate::progress::{MirrorProgress, ProgressCallback, emit};
use crate::retry::{RetryConfig, with_retry};

/// Default approximate number of repositories per account.
pub const DEFAULT_APPROXIMATE_COUNT: u32 = 100;

/// Default number of pages fetched at once.
pub const DEFAULT_PAGE_CONCURRENCY: usize = 4;

/// Options for [`fetch_catalog`].
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Keep private repositories in the listing.
    pub include_private: bool,
    /// Expected repository count; decides how many pages are requested.
    pub approximate_count: u32,
    /// Maximum pages in flight.
    pub concurrency: usize,
    /// Retry policy for rate-limited page fetches.
    pub retry: RetryConfig,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            include_private: true,
            approximate_count: DEFAULT_APPROXIMATE_COUNT,
            concurrency: DEFAULT_PAGE_CONCURRENCY,
            retry: RetryConfig::default(),
        }
    }
}

impl CatalogOptions {
    /// Set whether private repositories are kept.
    #[must_use]
    pub fn with_include_private(mut self, include_private: bool) -> Self {
        self.include_private = include_private;
        self
    }

    /// Set the approximate repository count.
    #[must_use]
    pub fn with_approximate_count(mut self, approximate_count: u32) -> Self {
        self.approximate_count = approximate_count;
        self
    }
}

/// Number of pages needed to cover `approximate_count` repositories.
///
/// Always at least one, so an account expected to be empty is still listed.
pub fn expected_pages(approximate_count: u32, page_size: u32) -> u32 {
    approximate_count.div_ceil(page_size.max(1)).max(1)
}

/// Fetch every repository the client's account owns.
///
/// Any failing page fails the whole listing; pages already fetched are
/// discarded. The result is sorted by `(owner, name)` with duplicates across
/// pages collapsed to their first occurrence.
pub async fn fetch_catalog<C>(
    client: &C,
    options: &CatalogOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<Repository>>
where
    C: PlatformClient + ?Sized,
{
    let platform = client.platform_name();
    let pages = expected_pages(options.approximate_count, client.page_size());

    tracing::debug!(
        platform = %platform,
        pages,
        page_size = client.page_size(),
        include_private = options.include_private,
        "Fetching repository listing"
    );
    emit(
        on_progress,
        MirrorProgress::FetchingRepos {
            platform: platform.clone(),
            expected_pages: pages,
        },
    );

    let platform_name = platform.as_str();
    let received = AtomicUsize::new(0);
    let received = &received;
    let mut fetched: Vec<(u32, RepoPage)> = stream::iter(1..=pages)
        .map(|page| async move {
            let label = format!("{platform_name} page {page}");
            let mut listing = with_retry(
                || client.list_repositories_page(page),
                &options.retry,
                PlatformError::is_rate_limited,
                |e: &PlatformError| e.to_string(),
                &label,
                on_progress,
            )
            .await?;
            if !options.include_private {
                listing
                    .repositories
                    .retain(|repo| !repo.visibility.is_private());
            }
            let count = listing.repositories.len();
            let total_so_far = received.fetch_add(count, Ordering::Relaxed) + count;
            emit(
                on_progress,
                MirrorProgress::FetchedPage {
                    platform: platform_name.to_string(),
                    page,
                    count,
                    total_so_far,
                },
            );
            Ok::<_, PlatformError>((page, listing))
        })
        .buffer_unordered(options.concurrency.max(1))
        .try_collect()
        .await?;

    fetched.sort_by_key(|(page, _)| *page);

    let mut seen: BTreeMap<(String, String), Repository> = BTreeMap::new();
    let mut last_has_more = false;
    for (page, listing) in fetched {
        if page == pages {
            last_has_more = listing.has_more;
        }
        for repo in listing.repositories {
            seen.entry((repo.owner.clone(), repo.name.clone()))
                .or_insert(repo);
        }
    }

    if last_has_more {
        let message = format!(
            "{platform} has more than {} repositories; raise approximate_repo_count to list them all",
            u64::from(pages) * u64::from(client.page_size())
        );
        tracing::warn!(platform = %platform, pages, "{message}");
        emit(on_progress, MirrorProgress::Warning { message });
    }

    let repos: Vec<Repository> = seen.into_values().collect();
    tracing::info!(platform = %platform, total = repos.len(), "Fetched repository listing");
    emit(
        on_progress,
        MirrorProgress::FetchComplete {
            platform,
            total: repos.len(),
        },
    );
    Ok(repos)
}
