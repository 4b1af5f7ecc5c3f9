//! Progress reporting types for mirror runs.
//!
//! The library never renders anything itself. Every stage reports through an
//! optional [`ProgressCallback`] so the CLI can draw progress bars on a TTY
//! or log structured lines otherwise.

use crate::pipeline::PipelineState;
use crate::platform::Visibility;

/// Progress events emitted during a mirror run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum MirrorProgress {
    /// The pipeline entered a new state.
    StateChanged {
        /// State just entered.
        state: PipelineState,
    },

    /// Starting to fetch a platform's repository listing.
    FetchingRepos {
        /// Display name of the platform.
        platform: String,
        /// Number of pages that will be requested.
        expected_pages: u32,
    },

    /// Fetched a page of repositories.
    FetchedPage {
        /// Display name of the platform.
        platform: String,
        /// Page number (1-indexed).
        page: u32,
        /// Number of repos on this page, after filtering.
        count: usize,
        /// Repos received so far across pages, before deduplication.
        total_so_far: usize,
    },

    /// Finished fetching a listing.
    FetchComplete {
        /// Display name of the platform.
        platform: String,
        /// Distinct repositories in the listing.
        total: usize,
    },

    /// Warning message (non-fatal).
    Warning {
        /// Warning message.
        message: String,
    },

    /// Starting to create missing target repositories.
    CreatingRepos {
        /// Number of repositories to create.
        count: usize,
        /// Whether this is a dry run.
        dry_run: bool,
    },

    /// Created one target repository.
    CreatedRepo {
        /// Repository name.
        name: String,
    },

    /// Failed to create a target repository.
    CreateFailed {
        /// Repository name.
        name: String,
        /// Error message.
        error: String,
    },

    /// Starting visibility convergence.
    UpdatingVisibility {
        /// Number of target repositories whose visibility differs.
        count: usize,
        /// Whether this is a dry run.
        dry_run: bool,
    },

    /// Changed the visibility of one target repository.
    UpdatedVisibility {
        /// Repository name.
        name: String,
        /// New visibility.
        visibility: Visibility,
    },

    /// Failed to change a target repository's visibility.
    UpdateFailed {
        /// Repository name.
        name: String,
        /// Error message.
        error: String,
    },

    /// A mirror job started.
    MirrorStarted {
        /// Repository name.
        name: String,
        /// Position in the mapping (0-indexed).
        index: usize,
        /// Number of jobs in the run.
        total: usize,
    },

    /// Bare clone of the source finished.
    Cloned {
        /// Repository name.
        name: String,
    },

    /// Mirror push to the target finished; the job succeeded.
    Pushed {
        /// Repository name.
        name: String,
    },

    /// A mirror job failed.
    MirrorFailed {
        /// Repository name.
        name: String,
        /// Error message.
        error: String,
    },

    /// Mirroring stage finished.
    MirrorComplete {
        /// Jobs that pushed successfully.
        succeeded: usize,
        /// Jobs that failed.
        failed: usize,
    },

    /// Rate limited, backing off before retry.
    RateLimitBackoff {
        /// What was being attempted (page number, repository name).
        operation: String,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
        /// Current attempt number.
        attempt: u32,
    },
}

/// Callback for progress updates during a mirror run.
pub type ProgressCallback = Box<dyn Fn(MirrorProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: MirrorProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            MirrorProgress::FetchComplete {
                platform: "GitHub (github.com)".to_string(),
                total: 10,
            },
        );
        emit(
            Some(&callback),
            MirrorProgress::StateChanged {
                state: PipelineState::Reconciling,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            MirrorProgress::Pushed {
                name: "notes".to_string(),
            },
        );
    }

    #[test]
    fn test_mirror_failed_debug() {
        let event = MirrorProgress::MirrorFailed {
            name: "dotfiles".to_string(),
            error: "authentication failed".to_string(),
        };

        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("MirrorFailed"));
        assert!(debug_str.contains("dotfiles"));
        assert!(debug_str.contains("authentication failed"));
    }
}
