//! Mirror pipeline: fetch, reconcile, create, converge visibility, mirror.
//!
//! A run walks the states in a fixed order and stops at the first stage that
//! fails. Each stage finishes completely (every create attempted, every
//! update attempted) before the next one starts.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{
    CatalogOptions, DEFAULT_APPROXIMATE_COUNT, DEFAULT_PAGE_CONCURRENCY, fetch_catalog,
};
use crate::git::GitMirror;
use crate::mirror::{MirrorError, MirrorExecutor, MirrorOptions};
use crate::platform::{PlatformClient, PlatformError, Repository, Visibility};
use crate::progress::{MirrorProgress, ProgressCallback, emit};
use crate::reconcile::{ReconcileError, ReconciliationMapping, reconcile, visibility_updates};
use crate::retry::{RetryConfig, with_retry};

/// Default number of concurrent create/update calls.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// States of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Fetching,
    Reconciling,
    Creating,
    UpdatingVisibility,
    Mirroring,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Fetching => "fetching",
            PipelineState::Reconciling => "reconciling",
            PipelineState::Creating => "creating",
            PipelineState::UpdatingVisibility => "updating visibility",
            PipelineState::Mirroring => "mirroring",
            PipelineState::Complete => "complete",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Mirror private source repositories too.
    pub include_private: bool,
    /// Accepted for configuration compatibility; nothing is ever deleted.
    pub remove_non_existent: bool,
    /// Visit every stage without creating, updating, cloning or pushing.
    pub dry_run: bool,
    /// Approximate repository count of the source account.
    pub source_approximate_count: u32,
    /// Approximate repository count of the target account.
    pub target_approximate_count: u32,
    /// Listing pages fetched at once, per platform.
    pub page_concurrency: usize,
    /// Create/update calls in flight at once.
    pub concurrency: usize,
    /// Retry policy for rate-limited platform calls.
    pub retry: RetryConfig,
    pub mirror: MirrorOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            include_private: true,
            remove_non_existent: false,
            dry_run: false,
            source_approximate_count: DEFAULT_APPROXIMATE_COUNT,
            target_approximate_count: DEFAULT_APPROXIMATE_COUNT,
            page_concurrency: DEFAULT_PAGE_CONCURRENCY,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryConfig::default(),
            mirror: MirrorOptions::default(),
        }
    }
}

impl PipelineOptions {
    fn source_catalog(&self) -> CatalogOptions {
        CatalogOptions {
            include_private: self.include_private,
            approximate_count: self.source_approximate_count,
            concurrency: self.page_concurrency,
            retry: self.retry.clone(),
        }
    }

    /// The target listing always includes private repositories so a private
    /// target is matched instead of re-created.
    fn target_catalog(&self) -> CatalogOptions {
        CatalogOptions {
            include_private: true,
            approximate_count: self.target_approximate_count,
            concurrency: self.page_concurrency,
            retry: self.retry.clone(),
        }
    }
}

/// A visibility change applied (or planned) on a target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityChange {
    /// Target repository, `owner/name`.
    pub repository: String,
    pub from: Visibility,
    pub to: Visibility,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Every state entered, in order, ending with `Complete`.
    pub states: Vec<PipelineState>,
    pub dry_run: bool,
    /// Repositories in the source listing.
    pub source_count: usize,
    /// Repositories in the target listing.
    pub target_count: usize,
    /// Target repositories created (or that would be, in a dry run).
    pub created: Vec<String>,
    /// Visibility changes made (or planned).
    pub updated: Vec<VisibilityChange>,
    /// Target repositories mirrored (or that would be).
    pub mirrored: Vec<String>,
    /// Final source/target pairing.
    pub mapping: ReconciliationMapping,
}

/// Why a stage failed.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("repository listing failed: {0}")]
    Fetch(#[source] PlatformError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("{} repository creation(s) failed", .0.len())]
    Create(Vec<(String, PlatformError)>),

    #[error("{} visibility update(s) failed", .0.len())]
    Update(Vec<(String, PlatformError)>),

    #[error(transparent)]
    Mirror(#[from] MirrorError),
}

impl StageError {
    /// Per-repository failures, as `(repository, message)`.
    pub fn failures(&self) -> Vec<(String, String)> {
        match self {
            StageError::Fetch(_) => Vec::new(),
            StageError::Reconcile(err) => err
                .collisions()
                .iter()
                .flat_map(|(name, sources)| {
                    sources
                        .iter()
                        .map(move |source| (source.clone(), format!("shares the name '{name}'")))
                })
                .collect(),
            StageError::Create(failures) | StageError::Update(failures) => failures
                .iter()
                .map(|(name, err)| (name.clone(), err.to_string()))
                .collect(),
            StageError::Mirror(err) => err
                .failures()
                .iter()
                .map(|f| (f.source_repo.clone(), format!("{} failed: {}", f.stage, f.message)))
                .collect(),
        }
    }
}

/// A failed run.
#[derive(Debug, Error)]
#[error("mirror run failed while {state}: {kind}")]
pub struct PipelineError {
    /// State the failure occurred in.
    pub state: PipelineState,
    #[source]
    pub kind: StageError,
    /// States entered before failing, ending with `Failed`.
    pub states: Vec<PipelineState>,
}

/// Drives one mirror run from a source account to a target account.
pub struct Pipeline {
    source: Arc<dyn PlatformClient>,
    target: Arc<dyn PlatformClient>,
    git: Arc<dyn GitMirror>,
    options: PipelineOptions,
}

/// States entered so far, reported as they happen.
struct Transitions<'a> {
    states: Vec<PipelineState>,
    on_progress: Option<&'a ProgressCallback>,
}

impl Transitions<'_> {
    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(%state, "Pipeline state changed");
        self.states.push(state);
        emit(self.on_progress, MirrorProgress::StateChanged { state });
    }

    fn fail(&mut self, state: PipelineState, kind: StageError) -> PipelineError {
        tracing::error!(%state, error = %kind, "Pipeline stage failed");
        self.enter(PipelineState::Failed);
        PipelineError {
            state,
            kind,
            states: std::mem::take(&mut self.states),
        }
    }
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn PlatformClient>,
        target: Arc<dyn PlatformClient>,
        git: Arc<dyn GitMirror>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            source,
            target,
            git,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every stage in order.
    pub async fn run(
        &self,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<PipelineReport, PipelineError> {
        let dry_run = self.options.dry_run;
        let mut transitions = Transitions {
            states: Vec::new(),
            on_progress,
        };
        let mut report = PipelineReport {
            dry_run,
            ..PipelineReport::default()
        };

        tracing::info!(
            from = %self.source.platform_name(),
            to = %self.target.platform_name(),
            dry_run,
            "Starting mirror run"
        );

        transitions.enter(PipelineState::Fetching);
        let source_options = self.options.source_catalog();
        let target_options = self.options.target_catalog();
        let (source_repos, target_repos) = match tokio::try_join!(
            fetch_catalog(self.source.as_ref(), &source_options, on_progress),
            fetch_catalog(self.target.as_ref(), &target_options, on_progress),
        ) {
            Ok(listings) => listings,
            Err(err) => {
                return Err(transitions.fail(PipelineState::Fetching, StageError::Fetch(err)));
            }
        };
        report.source_count = source_repos.len();
        report.target_count = target_repos.len();

        transitions.enter(PipelineState::Reconciling);
        if self.options.remove_non_existent {
            let message =
                "remove_non_existent is set, but repositories are never deleted from the target"
                    .to_string();
            tracing::warn!("{message}");
            emit(on_progress, MirrorProgress::Warning { message });
        }
        let plan = match reconcile(
            &source_repos,
            &target_repos,
            &self.target.credential().username,
        ) {
            Ok(plan) => plan,
            Err(err) => {
                return Err(transitions.fail(PipelineState::Reconciling, err.into()));
            }
        };
        tracing::info!(
            sources = plan.entries.len(),
            existing = plan.existing_count(),
            "Reconciled listings"
        );

        transitions.enter(PipelineState::Creating);
        let pending: Vec<Repository> = plan.pending_creates().into_iter().cloned().collect();
        emit(
            on_progress,
            MirrorProgress::CreatingRepos {
                count: pending.len(),
                dry_run,
            },
        );
        report.created = pending.iter().map(Repository::full_name).collect();
        let created = if dry_run {
            HashMap::new()
        } else {
            match self.create_all(pending, on_progress).await {
                Ok(created) => created,
                Err(failures) => {
                    return Err(
                        transitions.fail(PipelineState::Creating, StageError::Create(failures))
                    );
                }
            }
        };
        let mut mapping = plan.into_mapping(&created);

        transitions.enter(PipelineState::UpdatingVisibility);
        let updates = visibility_updates(&mapping);
        emit(
            on_progress,
            MirrorProgress::UpdatingVisibility {
                count: updates.len(),
                dry_run,
            },
        );
        report.updated = updates
            .iter()
            .map(|&(index, to)| VisibilityChange {
                repository: mapping[index].target.full_name(),
                from: mapping[index].target.visibility,
                to,
            })
            .collect();
        if !dry_run
            && let Err(failures) = self.update_all(&mut mapping, &updates, on_progress).await
        {
            return Err(transitions.fail(
                PipelineState::UpdatingVisibility,
                StageError::Update(failures),
            ));
        }

        transitions.enter(PipelineState::Mirroring);
        report.mirrored = if dry_run {
            mapping.iter().map(|pair| pair.target.full_name()).collect()
        } else {
            let executor = MirrorExecutor::new(Arc::clone(&self.git), self.options.mirror.clone());
            match executor
                .run(
                    &mapping,
                    self.source.as_ref(),
                    self.target.as_ref(),
                    on_progress,
                )
                .await
            {
                Ok(summary) => summary.mirrored,
                Err(err) => {
                    return Err(
                        transitions.fail(PipelineState::Mirroring, StageError::Mirror(err))
                    );
                }
            }
        };

        transitions.enter(PipelineState::Complete);
        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            mirrored = report.mirrored.len(),
            dry_run,
            "Mirror run complete"
        );
        report.mapping = mapping;
        report.states = transitions.states;
        Ok(report)
    }

    /// Create every placeholder, all attempted even if some fail.
    ///
    /// Returns created repositories keyed by name, or every failure.
    async fn create_all(
        &self,
        pending: Vec<Repository>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<HashMap<String, Repository>, Vec<(String, PlatformError)>> {
        let target = self.target.as_ref();
        let retry = &self.options.retry;

        let results: Vec<(Repository, Result<i64, PlatformError>)> = stream::iter(pending)
            .map(|placeholder| async move {
                let label = format!("create {}", placeholder.name);
                let result = with_retry(
                    || target.create_repository(&placeholder.name, placeholder.visibility),
                    retry,
                    PlatformError::is_rate_limited,
                    |e: &PlatformError| e.to_string(),
                    &label,
                    on_progress,
                )
                .await;
                (placeholder, result)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut created = HashMap::new();
        let mut failures = Vec::new();
        for (placeholder, result) in results {
            match result {
                Ok(id) => {
                    tracing::info!(repo = %placeholder.full_name(), id, "Created repository");
                    emit(
                        on_progress,
                        MirrorProgress::CreatedRepo {
                            name: placeholder.name.clone(),
                        },
                    );
                    created.insert(
                        placeholder.name.clone(),
                        Repository {
                            platform_id: Some(id),
                            ..placeholder
                        },
                    );
                }
                Err(err) => {
                    tracing::warn!(repo = %placeholder.full_name(), error = %err, "Create failed");
                    emit(
                        on_progress,
                        MirrorProgress::CreateFailed {
                            name: placeholder.name.clone(),
                            error: err.to_string(),
                        },
                    );
                    failures.push((placeholder.name, err));
                }
            }
        }

        if failures.is_empty() {
            Ok(created)
        } else {
            failures.sort_by(|a, b| a.0.cmp(&b.0));
            Err(failures)
        }
    }

    /// Apply visibility updates, all attempted even if some fail.
    ///
    /// Successful updates are written back into `mapping`.
    async fn update_all(
        &self,
        mapping: &mut ReconciliationMapping,
        updates: &[(usize, Visibility)],
        on_progress: Option<&ProgressCallback>,
    ) -> Result<(), Vec<(String, PlatformError)>> {
        let target = self.target.as_ref();
        let retry = &self.options.retry;
        let pairs: &ReconciliationMapping = mapping;

        let results: Vec<(usize, Visibility, Result<(), PlatformError>)> =
            stream::iter(updates.iter().copied())
                .map(|(index, visibility)| async move {
                    let repo = &pairs[index].target;
                    let label = format!("update {}", repo.name);
                    let result = with_retry(
                        || target.update_repository_visibility(repo, visibility),
                        retry,
                        PlatformError::is_rate_limited,
                        |e: &PlatformError| e.to_string(),
                        &label,
                        on_progress,
                    )
                    .await;
                    (index, visibility, result)
                })
                .buffer_unordered(self.options.concurrency.max(1))
                .collect()
                .await;

        let mut failures = Vec::new();
        for (index, visibility, result) in results {
            let name = mapping[index].target.name.clone();
            match result {
                Ok(()) => {
                    tracing::info!(repo = %mapping[index].target.full_name(), %visibility, "Updated visibility");
                    mapping[index].target.visibility = visibility;
                    emit(
                        on_progress,
                        MirrorProgress::UpdatedVisibility { name, visibility },
                    );
                }
                Err(err) => {
                    tracing::warn!(repo = %name, error = %err, "Visibility update failed");
                    emit(
                        on_progress,
                        MirrorProgress::UpdateFailed {
                            name: name.clone(),
                            error: err.to_string(),
                        },
                    );
                    failures.push((name, err));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by(|a, b| a.0.cmp(&b.0));
            Err(failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_and_terminal() {
        assert_eq!(PipelineState::UpdatingVisibility.to_string(), "updating visibility");
        assert!(PipelineState::Complete.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Mirroring.is_terminal());
    }

    #[test]
    fn test_target_catalog_always_includes_private() {
        let options = PipelineOptions {
            include_private: false,
            target_approximate_count: 250,
            ..PipelineOptions::default()
        };
        assert!(!options.source_catalog().include_private);
        assert!(options.target_catalog().include_private);
        assert_eq!(options.target_catalog().approximate_count, 250);
    }

    #[test]
    fn test_stage_error_failures() {
        let err = StageError::Create(vec![(
            "notes".to_string(),
            PlatformError::api("name already exists"),
        )]);
        assert_eq!(err.to_string(), "1 repository creation(s) failed");
        assert_eq!(
            err.failures(),
            vec![(
                "notes".to_string(),
                "API error: name already exists".to_string()
            )]
        );
    }
}
