//! Progress reporting for mirror runs.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): Animated progress bars using indicatif
//! - Logging mode (non-TTY): Structured logging using tracing
//!
//! Progress bars are organized as:
//! - Stage spinner: the pipeline state
//! - Fetch bars: One per platform, showing listing pages
//! - Create, visibility and mirror bars: one per stage

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use repomirror::{MirrorProgress, PipelineState, ProgressCallback};

/// Progress reporter that handles both interactive and logging modes.
pub enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: MirrorProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Finish all progress bars (interactive mode only).
    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive(_))
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// All bars under one lock.
#[derive(Default)]
struct ProgressState {
    stage: Option<ProgressBar>,
    /// Fetch bars by platform display name.
    fetch_bars: HashMap<String, ProgressBar>,
    create_bar: Option<ProgressBar>,
    update_bar: Option<ProgressBar>,
    mirror_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        // A panic while drawing leaves the bars usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stage_bar(&self, count: usize, prefix: &str, message: String) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(count as u64));
        bar.set_style(Self::bar_style());
        bar.set_prefix(format!("{prefix:12}"));
        bar.set_message(message);
        bar
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{line}");
        }
    }

    /// Handle a progress event.
    pub fn handle(&self, event: MirrorProgress) {
        let mut state = self.state();

        match event {
            MirrorProgress::StateChanged { state: pipeline } => {
                let bar = state.stage.get_or_insert_with(|| {
                    let bar = self.multi.insert(0, ProgressBar::new_spinner());
                    bar.set_style(Self::spinner_style());
                    bar.set_prefix(format!("{:12}", "Pipeline"));
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                });
                match pipeline {
                    PipelineState::Complete => bar.finish_with_message("complete"),
                    PipelineState::Failed => bar.abandon_with_message("failed"),
                    other => bar.set_message(other.to_string()),
                }
            }

            MirrorProgress::FetchingRepos {
                platform,
                expected_pages,
            } => {
                let bar = self.multi.add(ProgressBar::new(u64::from(expected_pages)));
                bar.set_style(Self::bar_style());
                bar.set_prefix(format!("{:12}", "Fetch"));
                bar.set_message(format!("{platform}: listing repositories..."));
                state.fetch_bars.insert(platform, bar);
            }

            MirrorProgress::FetchedPage {
                platform,
                page,
                total_so_far,
                ..
            } => {
                if let Some(bar) = state.fetch_bars.get(&platform) {
                    if let Some(len) = bar.length()
                        && u64::from(page) > len
                    {
                        bar.set_length(u64::from(page));
                    }
                    bar.inc(1);
                    bar.set_message(format!("{platform}: {total_so_far} repos"));
                }
            }

            MirrorProgress::FetchComplete { platform, total } => {
                if let Some(bar) = state.fetch_bars.get(&platform) {
                    bar.finish_with_message(format!("{platform}: {total} repos"));
                }
            }

            MirrorProgress::CreatingRepos { count, dry_run } => {
                let message = if dry_run {
                    format!("{count} to create (dry run)")
                } else {
                    format!("creating {count} repositories")
                };
                let bar = self.stage_bar(count, "Create", message);
                if dry_run || count == 0 {
                    bar.finish();
                }
                state.create_bar = Some(bar);
            }

            MirrorProgress::CreatedRepo { name } => {
                if let Some(ref bar) = state.create_bar {
                    bar.inc(1);
                    bar.set_message(format!("created {name}"));
                }
            }

            MirrorProgress::CreateFailed { name, error } => {
                if let Some(ref bar) = state.create_bar {
                    bar.inc(1);
                }
                self.println(format!(
                    "{} create {}: {}",
                    style("✗").red(),
                    style(&name).bold(),
                    error
                ));
            }

            MirrorProgress::UpdatingVisibility { count, dry_run } => {
                let message = if dry_run {
                    format!("{count} to change (dry run)")
                } else {
                    format!("updating {count} repositories")
                };
                let bar = self.stage_bar(count, "Visibility", message);
                if dry_run || count == 0 {
                    bar.finish();
                }
                state.update_bar = Some(bar);
            }

            MirrorProgress::UpdatedVisibility { name, visibility } => {
                if let Some(ref bar) = state.update_bar {
                    bar.inc(1);
                    bar.set_message(format!("{name} is now {visibility}"));
                }
            }

            MirrorProgress::UpdateFailed { name, error } => {
                if let Some(ref bar) = state.update_bar {
                    bar.inc(1);
                }
                self.println(format!(
                    "{} visibility {}: {}",
                    style("✗").red(),
                    style(&name).bold(),
                    error
                ));
            }

            MirrorProgress::MirrorStarted { name, total, .. } => {
                let bar = state
                    .mirror_bar
                    .get_or_insert_with(|| self.stage_bar(total, "Mirror", String::new()));
                bar.set_message(format!("mirroring {name}"));
            }

            MirrorProgress::Pushed { name } => {
                if let Some(ref bar) = state.mirror_bar {
                    bar.inc(1);
                    bar.set_message(format!("mirrored {name}"));
                }
            }

            MirrorProgress::MirrorFailed { name, error } => {
                if let Some(ref bar) = state.mirror_bar {
                    bar.inc(1);
                }
                self.println(format!(
                    "{} mirror {}: {}",
                    style("✗").red(),
                    style(&name).bold(),
                    error
                ));
            }

            MirrorProgress::MirrorComplete { succeeded, failed } => {
                if let Some(ref bar) = state.mirror_bar {
                    bar.finish_with_message(format!("{succeeded} mirrored, {failed} failed"));
                }
            }

            MirrorProgress::Warning { message } => {
                self.println(format!("{} {}", style("warning:").yellow().bold(), message));
            }

            MirrorProgress::RateLimitBackoff {
                operation,
                retry_after_ms,
                attempt,
            } => {
                self.println(format!(
                    "{} {} rate limited, retrying in {:.1}s (attempt {})",
                    style("⏳").yellow(),
                    operation,
                    retry_after_ms as f64 / 1000.0,
                    attempt
                ));
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub fn finish(&self) {
        let state = self.state();
        let bars = state
            .stage
            .iter()
            .chain(state.fetch_bars.values())
            .chain(state.create_bar.iter())
            .chain(state.update_bar.iter())
            .chain(state.mirror_bar.iter());
        for bar in bars {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    /// Handle a progress event.
    pub fn handle(&self, event: MirrorProgress) {
        match event {
            MirrorProgress::StateChanged { state } => {
                tracing::info!(state = %state, "Pipeline state");
            }

            MirrorProgress::FetchingRepos {
                platform,
                expected_pages,
            } => {
                tracing::info!(platform = %platform, expected_pages, "Fetching repositories");
            }

            MirrorProgress::FetchedPage {
                platform,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(platform = %platform, page, count, total_so_far, "Fetched page");
            }

            MirrorProgress::FetchComplete { platform, total } => {
                tracing::info!(platform = %platform, total, "Fetch complete");
            }

            MirrorProgress::CreatingRepos { count, dry_run } => {
                tracing::info!(count, dry_run, "Creating target repositories");
            }

            MirrorProgress::CreatedRepo { name } => {
                tracing::info!(repo = %name, "Created");
            }

            MirrorProgress::CreateFailed { name, error } => {
                tracing::error!(repo = %name, error = %error, "Failed to create");
            }

            MirrorProgress::UpdatingVisibility { count, dry_run } => {
                tracing::info!(count, dry_run, "Updating visibility");
            }

            MirrorProgress::UpdatedVisibility { name, visibility } => {
                tracing::info!(repo = %name, visibility = %visibility, "Visibility updated");
            }

            MirrorProgress::UpdateFailed { name, error } => {
                tracing::error!(repo = %name, error = %error, "Failed to update visibility");
            }

            MirrorProgress::MirrorStarted { name, index, total } => {
                tracing::info!(repo = %name, job = index + 1, total, "Mirroring");
            }

            MirrorProgress::Cloned { name } => {
                tracing::debug!(repo = %name, "Cloned");
            }

            MirrorProgress::Pushed { name } => {
                tracing::info!(repo = %name, "Mirrored");
            }

            MirrorProgress::MirrorFailed { name, error } => {
                tracing::error!(repo = %name, error = %error, "Mirror failed");
            }

            MirrorProgress::MirrorComplete { succeeded, failed } => {
                tracing::info!(succeeded, failed, "Mirroring complete");
            }

            MirrorProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            MirrorProgress::RateLimitBackoff {
                operation,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(
                    operation = %operation,
                    retry_after_ms,
                    attempt,
                    "Rate limited, backing off"
                );
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
