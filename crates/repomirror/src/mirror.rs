//! Mirror executor: bare clone from the source, forced push to the target.
//!
//! Each job gets its own scratch directory, created when the job starts and
//! removed when it ends, whether it succeeded or not. By default jobs run one
//! at a time in mapping order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::git::{GitError, GitMirror, MIRROR_REFSPEC};
use crate::platform::{PlatformClient, PlatformCredential};
use crate::progress::{MirrorProgress, ProgressCallback, emit};
use crate::reconcile::MirrorPair;

/// Prefix of every scratch directory.
pub const SCRATCH_PREFIX: &str = "repomirror-";

/// What to do with the remaining jobs once one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Start no further jobs; wait for the ones in flight.
    #[default]
    Abort,
    /// Run every job and report all failures at the end.
    Continue,
}

/// Options for [`MirrorExecutor`].
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Jobs allowed to run at once. Zero is treated as one.
    pub max_in_flight: usize,
    pub on_failure: FailurePolicy,
    /// Parent of the scratch directories; the OS temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
    /// Once set, no new job is started.
    pub stop: Option<Arc<AtomicBool>>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            on_failure: FailurePolicy::default(),
            scratch_root: None,
            stop: None,
        }
    }
}

/// Step a mirror job was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Scratch,
    Clone,
    Push,
    /// The blocking task panicked or was cancelled.
    Join,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStage::Scratch => "scratch directory",
            JobStage::Clone => "clone",
            JobStage::Push => "push",
            JobStage::Join => "task",
        };
        f.write_str(s)
    }
}

/// One failed mirror job.
#[derive(Debug, Clone, Error)]
#[error("{source_repo} -> {target_repo}: {stage} failed: {message}")]
pub struct MirrorJobError {
    /// Source repository, `owner/name`.
    pub source_repo: String,
    /// Target repository, `owner/name`.
    pub target_repo: String,
    pub stage: JobStage,
    pub message: String,
}

/// Errors from the mirroring stage.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("{} mirror job(s) failed", .0.len())]
    Jobs(Vec<MirrorJobError>),

    #[error("mirroring interrupted after {completed} repositories")]
    Interrupted {
        completed: usize,
        failures: Vec<MirrorJobError>,
    },
}

impl MirrorError {
    /// Every job failure carried by this error.
    pub fn failures(&self) -> &[MirrorJobError] {
        match self {
            MirrorError::Jobs(failures) | MirrorError::Interrupted { failures, .. } => failures,
        }
    }
}

/// Successful mirroring stage.
#[derive(Debug, Clone, Default)]
pub struct MirrorSummary {
    /// Mirrored repositories (target `owner/name`), in mapping order.
    pub mirrored: Vec<String>,
}

/// Everything one job needs, owned so it can move to the blocking pool.
#[derive(Debug, Clone)]
pub struct MirrorJob {
    pub name: String,
    pub source_repo: String,
    pub target_repo: String,
    pub source_url: String,
    pub source_credential: PlatformCredential,
    pub target_url: String,
    pub target_credential: PlatformCredential,
}

impl MirrorJob {
    /// Build the job for one mapping entry.
    pub fn from_pair<S, T>(pair: &MirrorPair, source: &S, target: &T) -> Self
    where
        S: PlatformClient + ?Sized,
        T: PlatformClient + ?Sized,
    {
        Self {
            name: pair.source.name.clone(),
            source_repo: pair.source.full_name(),
            target_repo: pair.target.full_name(),
            source_url: source.remote_url(&pair.source),
            source_credential: source.credential().clone(),
            target_url: target.remote_url(&pair.target),
            target_credential: target.credential().clone(),
        }
    }

    fn error(&self, stage: JobStage, message: impl Into<String>) -> MirrorJobError {
        MirrorJobError {
            source_repo: self.source_repo.clone(),
            target_repo: self.target_repo.clone(),
            stage,
            message: message.into(),
        }
    }

    /// Run clone then push inside a fresh scratch directory.
    ///
    /// Blocking. `on_cloned` runs between the two steps. The directory is
    /// removed on return.
    fn run(
        &self,
        git: &dyn GitMirror,
        scratch_root: Option<&Path>,
        on_cloned: impl FnOnce(),
    ) -> Result<(), JobFailure> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| JobFailure::new(JobStage::Scratch, GitError::Io(e)))?;

        git.clone_bare(&self.source_url, &self.source_credential, scratch.path())
            .map_err(|e| JobFailure::new(JobStage::Clone, e))?;
        on_cloned();
        git.push_mirror(
            scratch.path(),
            &self.target_url,
            &self.target_credential,
            MIRROR_REFSPEC,
            true,
        )
        .map_err(|e| JobFailure::new(JobStage::Push, e))?;
        Ok(())
    }
}

struct JobFailure {
    stage: JobStage,
    error: GitError,
}

impl JobFailure {
    fn new(stage: JobStage, error: GitError) -> Self {
        Self { stage, error }
    }
}

/// Runs mirror jobs on tokio's blocking pool.
pub struct MirrorExecutor {
    git: Arc<dyn GitMirror>,
    options: MirrorOptions,
}

impl MirrorExecutor {
    pub fn new(git: Arc<dyn GitMirror>, options: MirrorOptions) -> Self {
        Self { git, options }
    }

    fn stop_requested(&self) -> bool {
        self.options
            .stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }

    /// Mirror every pair of `mapping`, in order.
    pub async fn run<S, T>(
        &self,
        mapping: &[MirrorPair],
        source: &S,
        target: &T,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<MirrorSummary, MirrorError>
    where
        S: PlatformClient + ?Sized,
        T: PlatformClient + ?Sized,
    {
        let jobs = mapping
            .iter()
            .map(|pair| MirrorJob::from_pair(pair, source, target))
            .collect();
        self.run_jobs(jobs, on_progress).await
    }

    /// Run prepared jobs with at most `max_in_flight` at once.
    pub async fn run_jobs(
        &self,
        jobs: Vec<MirrorJob>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<MirrorSummary, MirrorError> {
        let limit = self.options.max_in_flight.max(1);
        let total = jobs.len();
        let mut pending = jobs.into_iter().enumerate();

        let mut join_set: JoinSet<Result<(), JobFailure>> = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, (usize, MirrorJob)> = HashMap::new();
        let mut succeeded: Vec<(usize, String)> = Vec::new();
        let mut failures: Vec<MirrorJobError> = Vec::new();
        let mut halted = false;
        let mut interrupted = false;
        // Clone completions, reported while the push is still running.
        let (cloned_tx, mut cloned_rx) = mpsc::unbounded_channel::<String>();

        loop {
            while !halted && join_set.len() < limit {
                let Some((index, job)) = pending.next() else {
                    break;
                };
                if self.stop_requested() {
                    interrupted = true;
                    halted = true;
                    break;
                }

                tracing::info!(
                    source_repo = %job.source_repo,
                    target_repo = %job.target_repo,
                    index,
                    total,
                    "Mirroring repository"
                );
                emit(
                    on_progress,
                    MirrorProgress::MirrorStarted {
                        name: job.name.clone(),
                        index,
                        total,
                    },
                );

                let git = Arc::clone(&self.git);
                let scratch_root = self.options.scratch_root.clone();
                let task_job = job.clone();
                let cloned = cloned_tx.clone();
                let handle = join_set.spawn_blocking(move || {
                    task_job.run(git.as_ref(), scratch_root.as_deref(), || {
                        let _ = cloned.send(task_job.name.clone());
                    })
                });
                running.insert(handle.id(), (index, job));
            }

            let joined = tokio::select! {
                biased;
                Some(name) = cloned_rx.recv() => {
                    emit(on_progress, MirrorProgress::Cloned { name });
                    continue;
                }
                joined = join_set.join_next_with_id() => joined,
            };
            // A job sends its clone event before it finishes.
            while let Ok(name) = cloned_rx.try_recv() {
                emit(on_progress, MirrorProgress::Cloned { name });
            }
            let Some(joined) = joined else {
                break;
            };

            let (id, outcome) = match joined {
                Ok((id, result)) => (id, result.map_err(Some)),
                Err(join_err) => (join_err.id(), Err(None)),
            };
            let Some((index, job)) = running.remove(&id) else {
                continue;
            };

            match outcome {
                Ok(()) => {
                    emit(on_progress, MirrorProgress::Pushed { name: job.name.clone() });
                    tracing::info!(repo = %job.target_repo, "Mirrored repository");
                    succeeded.push((index, job.target_repo));
                }
                Err(failure) => {
                    let error = match failure {
                        Some(JobFailure { stage, error }) => job.error(stage, error.to_string()),
                        None => job.error(JobStage::Join, "mirror task panicked or was cancelled"),
                    };
                    tracing::warn!(
                        source_repo = %error.source_repo,
                        target_repo = %error.target_repo,
                        stage = %error.stage,
                        error = %error.message,
                        "Mirror job failed"
                    );
                    emit(
                        on_progress,
                        MirrorProgress::MirrorFailed {
                            name: job.name,
                            error: error.to_string(),
                        },
                    );
                    failures.push(error);
                    if self.options.on_failure == FailurePolicy::Abort {
                        halted = true;
                    }
                }
            }
        }

        emit(
            on_progress,
            MirrorProgress::MirrorComplete {
                succeeded: succeeded.len(),
                failed: failures.len(),
            },
        );

        if interrupted {
            tracing::warn!(completed = succeeded.len(), "Mirroring interrupted");
            return Err(MirrorError::Interrupted {
                completed: succeeded.len(),
                failures,
            });
        }
        if !failures.is_empty() {
            return Err(MirrorError::Jobs(failures));
        }

        succeeded.sort_by_key(|(index, _)| *index);
        Ok(MirrorSummary {
            mirrored: succeeded.into_iter().map(|(_, name)| name).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Records calls, tracks concurrency, and fails URLs containing a marker.
    #[derive(Default)]
    struct FakeGit {
        calls: Mutex<Vec<String>>,
        scratch_dirs: Mutex<Vec<PathBuf>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeGit {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GitMirror for FakeGit {
        fn clone_bare(
            &self,
            url: &str,
            _credential: &PlatformCredential,
            dest: &Path,
        ) -> Result<(), GitError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(format!("clone {url}"));
            self.scratch_dirs.lock().unwrap().push(dest.to_path_buf());
            assert!(dest.exists());
            std::thread::sleep(std::time::Duration::from_millis(5));
            if url.contains("bad-clone") {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(GitError::Git(git2::Error::from_str("repository not found")));
            }
            Ok(())
        }

        fn push_mirror(
            &self,
            _dir: &Path,
            url: &str,
            _credential: &PlatformCredential,
            refspec: &str,
            force: bool,
        ) -> Result<(), GitError> {
            assert_eq!(refspec, MIRROR_REFSPEC);
            assert!(force);
            self.calls.lock().unwrap().push(format!("push {url}"));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if url.contains("bad-push") {
                return Err(GitError::PushRejected {
                    refname: "refs/heads/main".to_string(),
                    message: "protected branch".to_string(),
                });
            }
            Ok(())
        }
    }

    fn job(name: &str) -> MirrorJob {
        MirrorJob {
            name: name.to_string(),
            source_repo: format!("src/{name}"),
            target_repo: format!("dst/{name}"),
            source_url: format!("https://source.test/src/{name}.git"),
            source_credential: PlatformCredential::new("src", "s"),
            target_url: format!("https://target.test/dst/{name}.git"),
            target_credential: PlatformCredential::new("dst", "t"),
        }
    }

    fn executor(git: &Arc<FakeGit>, options: MirrorOptions) -> MirrorExecutor {
        MirrorExecutor::new(Arc::clone(git) as Arc<dyn GitMirror>, options)
    }

    #[tokio::test]
    async fn test_sequential_by_default_in_mapping_order() {
        let git = Arc::new(FakeGit::default());
        let summary = executor(&git, MirrorOptions::default())
            .run_jobs(vec![job("a"), job("b"), job("c")], None)
            .await
            .unwrap();

        assert_eq!(summary.mirrored, vec!["dst/a", "dst/b", "dst/c"]);
        assert_eq!(git.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(
            git.calls(),
            vec![
                "clone https://source.test/src/a.git",
                "push https://target.test/dst/a.git",
                "clone https://source.test/src/b.git",
                "push https://target.test/dst/b.git",
                "clone https://source.test/src/c.git",
                "push https://target.test/dst/c.git",
            ]
        );
    }

    #[tokio::test]
    async fn test_scratch_dirs_are_unique_and_removed() {
        let root = tempfile::tempdir().unwrap();
        let git = Arc::new(FakeGit::default());
        let options = MirrorOptions {
            scratch_root: Some(root.path().to_path_buf()),
            on_failure: FailurePolicy::Continue,
            ..MirrorOptions::default()
        };

        let _ = executor(&git, options)
            .run_jobs(vec![job("a"), job("bad-push"), job("bad-clone")], None)
            .await;

        let dirs = git.scratch_dirs.lock().unwrap().clone();
        assert_eq!(dirs.len(), 3);
        for dir in &dirs {
            assert!(dir.starts_with(root.path()));
            assert!(
                dir.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .starts_with(SCRATCH_PREFIX)
            );
            assert!(!dir.exists(), "{} should be removed", dir.display());
        }
        let unique: HashSet<&PathBuf> = dirs.iter().collect();
        assert_eq!(unique.len(), dirs.len());
    }

    #[tokio::test]
    async fn test_abort_policy_stops_after_first_failure() {
        let git = Arc::new(FakeGit::default());
        let err = executor(&git, MirrorOptions::default())
            .run_jobs(vec![job("a"), job("bad-clone"), job("c")], None)
            .await
            .unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, JobStage::Clone);
        assert_eq!(failures[0].source_repo, "src/bad-clone");
        assert!(!git.calls().iter().any(|c| c.contains("/c.git")));
    }

    #[tokio::test]
    async fn test_continue_policy_runs_every_job() {
        let git = Arc::new(FakeGit::default());
        let options = MirrorOptions {
            on_failure: FailurePolicy::Continue,
            ..MirrorOptions::default()
        };
        let err = executor(&git, options)
            .run_jobs(vec![job("bad-clone"), job("b"), job("bad-push")], None)
            .await
            .unwrap_err();

        match err {
            MirrorError::Jobs(failures) => {
                let stages: Vec<_> = failures.iter().map(|f| f.stage).collect();
                assert_eq!(stages, vec![JobStage::Clone, JobStage::Push]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(git.calls().contains(&"push https://target.test/dst/b.git".to_string()));
    }

    #[tokio::test]
    async fn test_push_skipped_when_clone_fails() {
        let git = Arc::new(FakeGit::default());
        let _ = executor(&git, MirrorOptions::default())
            .run_jobs(vec![job("bad-clone")], None)
            .await;
        assert_eq!(git.calls(), vec!["clone https://source.test/src/bad-clone.git"]);
    }

    #[tokio::test]
    async fn test_max_in_flight_bounds_concurrency() {
        let git = Arc::new(FakeGit::default());
        let options = MirrorOptions {
            max_in_flight: 2,
            ..MirrorOptions::default()
        };
        let jobs = (0..6).map(|i| job(&format!("r{i}"))).collect();

        let summary = executor(&git, options).run_jobs(jobs, None).await.unwrap();

        assert_eq!(summary.mirrored.len(), 6);
        assert_eq!(summary.mirrored[0], "dst/r0");
        assert!(git.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_zero_max_in_flight_is_sequential() {
        let git = Arc::new(FakeGit::default());
        let options = MirrorOptions {
            max_in_flight: 0,
            ..MirrorOptions::default()
        };
        executor(&git, options)
            .run_jobs(vec![job("a"), job("b")], None)
            .await
            .unwrap();
        assert_eq!(git.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_flag_prevents_new_jobs() {
        let git = Arc::new(FakeGit::default());
        let stop = Arc::new(AtomicBool::new(true));
        let options = MirrorOptions {
            stop: Some(Arc::clone(&stop)),
            ..MirrorOptions::default()
        };

        let err = executor(&git, options)
            .run_jobs(vec![job("a"), job("b")], None)
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::Interrupted { completed: 0, .. }));
        assert!(git.calls().is_empty());
    }

    #[tokio::test]
    async fn test_emits_job_events() {
        let git = Arc::new(FakeGit::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            capture.lock().unwrap().push(event);
        });

        executor(&git, MirrorOptions::default())
            .run_jobs(vec![job("a")], Some(&callback))
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert!(matches!(events[0], MirrorProgress::MirrorStarted { index: 0, total: 1, .. }));
        assert!(matches!(events[1], MirrorProgress::Cloned { .. }));
        assert!(matches!(events[2], MirrorProgress::Pushed { .. }));
        assert!(matches!(
            events[3],
            MirrorProgress::MirrorComplete {
                succeeded: 1,
                failed: 0
            }
        ));
    }

    /// Push waits until the clone event has been delivered.
    struct GatedGit {
        cloned_seen: Arc<AtomicBool>,
        seen_during_push: AtomicBool,
    }

    impl GitMirror for GatedGit {
        fn clone_bare(
            &self,
            _url: &str,
            _credential: &PlatformCredential,
            _dest: &Path,
        ) -> Result<(), GitError> {
            Ok(())
        }

        fn push_mirror(
            &self,
            _dir: &Path,
            _url: &str,
            _credential: &PlatformCredential,
            _refspec: &str,
            _force: bool,
        ) -> Result<(), GitError> {
            for _ in 0..200 {
                if self.cloned_seen.load(Ordering::SeqCst) {
                    self.seen_during_push.store(true, Ordering::SeqCst);
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cloned_is_reported_while_push_runs() {
        let cloned_seen = Arc::new(AtomicBool::new(false));
        let git = Arc::new(GatedGit {
            cloned_seen: Arc::clone(&cloned_seen),
            seen_during_push: AtomicBool::new(false),
        });
        let flag = Arc::clone(&cloned_seen);
        let callback: ProgressCallback = Box::new(move |event| {
            if matches!(event, MirrorProgress::Cloned { .. }) {
                flag.store(true, Ordering::SeqCst);
            }
        });

        MirrorExecutor::new(Arc::clone(&git) as Arc<dyn GitMirror>, MirrorOptions::default())
            .run_jobs(vec![job("a")], Some(&callback))
            .await
            .unwrap();

        assert!(git.seen_during_push.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_push_still_reports_clone() {
        let git = Arc::new(FakeGit::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            capture.lock().unwrap().push(event);
        });

        let _ = executor(&git, MirrorOptions::default())
            .run_jobs(vec![job("bad-push"), job("bad-clone")], Some(&callback))
            .await;

        let events = events.lock().unwrap();
        let cloned = events
            .iter()
            .filter(|e| matches!(e, MirrorProgress::Cloned { .. }))
            .count();
        assert_eq!(cloned, 1);
        assert!(matches!(events[1], MirrorProgress::Cloned { .. }));
        assert!(matches!(events[2], MirrorProgress::MirrorFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_mapping_succeeds() {
        let git = Arc::new(FakeGit::default());
        let summary = executor(&git, MirrorOptions::default())
            .run_jobs(Vec::new(), None)
            .await
            .unwrap();
        assert!(summary.mirrored.is_empty());
    }
}
