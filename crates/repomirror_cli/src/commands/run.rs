use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use console::style;
use repomirror::retry::RetryConfig;
use repomirror::{
    FailurePolicy, Git2Mirror, MirrorOptions, Pipeline, PipelineOptions, PipelineReport,
};

use crate::RunArgs;
use crate::commands::client::build_client;
use crate::config::{Config, Side};
use crate::progress::ProgressReporter;

/// Merge CLI flags over the configuration.
fn pipeline_options(args: &RunArgs, config: &Config, stop: Arc<AtomicBool>) -> PipelineOptions {
    let on_failure = if args.continue_on_error {
        FailurePolicy::Continue
    } else {
        config.mirror.on_failure
    };

    PipelineOptions {
        include_private: config.mirror.include_private && !args.public_only,
        remove_non_existent: config.mirror.remove_non_existent,
        dry_run: args.dry_run || config.mirror.dry_run,
        source_approximate_count: config.source.approximate_repo_count,
        target_approximate_count: config.target.approximate_repo_count,
        page_concurrency: config.http.page_concurrency,
        concurrency: config.http.mutation_concurrency,
        retry: RetryConfig::with_max_retries(config.http.max_retries),
        mirror: MirrorOptions {
            max_in_flight: args.max_in_flight.unwrap_or(config.mirror.max_in_flight),
            on_failure,
            scratch_root: config.mirror.scratch_dir.clone(),
            stop: Some(stop),
        },
    }
}

/// Refuse to mirror an account onto itself.
fn ensure_distinct_endpoints(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (source, target) = (&config.source, &config.target);
    if source.platform == target.platform
        && source.host == target.host
        && source.username == target.username
    {
        return Err("source and target are the same account".into());
    }
    Ok(())
}

pub(crate) async fn handle_run(
    args: RunArgs,
    config: &Config,
    stop: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_distinct_endpoints(config)?;
    let source = build_client(config, Side::Source)?;
    let target = build_client(config, Side::Target)?;
    let options = pipeline_options(&args, config, stop);

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let pipeline = Pipeline::new(source, target, Arc::new(Git2Mirror::new()), options);

    let result = pipeline.run(Some(&callback)).await;
    reporter.finish();

    match result {
        Ok(report) => {
            print_report(&report, reporter.is_interactive());
            Ok(())
        }
        Err(err) => {
            let failures = err.kind.failures();
            if reporter.is_interactive() {
                eprintln!("\n{} {}", style("Mirror run failed:").red().bold(), err);
                for (repo, message) in &failures {
                    eprintln!("  {} {}: {}", style("✗").red(), repo, message);
                }
            } else {
                for (repo, message) in &failures {
                    tracing::error!(repo = %repo, error = %message, "Failure");
                }
            }
            Err(err.into())
        }
    }
}

fn print_report(report: &PipelineReport, interactive: bool) {
    if !interactive {
        tracing::info!(
            source = report.source_count,
            target = report.target_count,
            created = report.created.len(),
            updated = report.updated.len(),
            mirrored = report.mirrored.len(),
            dry_run = report.dry_run,
            "Mirror run finished"
        );
        return;
    }

    let verb = if report.dry_run { "Would" } else { "Did" };
    println!();
    if report.dry_run {
        println!("{}", style("Dry run, nothing was changed.").yellow());
    }
    println!(
        "Listed {} source and {} target repositories.",
        report.source_count, report.target_count
    );
    println!("{verb} create {}:", report.created.len());
    for name in &report.created {
        println!("  {} {}", style("+").green(), name);
    }
    println!("{verb} change visibility of {}:", report.updated.len());
    for change in &report.updated {
        println!(
            "  {} {} ({} → {})",
            style("~").yellow(),
            change.repository,
            change.from,
            change.to
        );
    }
    println!(
        "{} {} repositories.",
        if report.dry_run { "Would mirror" } else { "Mirrored" },
        report.mirrored.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use repomirror::PlatformKind;

    fn args() -> RunArgs {
        RunArgs {
            dry_run: false,
            public_only: false,
            max_in_flight: None,
            continue_on_error: false,
        }
    }

    #[test]
    fn test_options_follow_config_by_default() {
        let mut config = Config::default();
        config.source.approximate_repo_count = 300;
        config.mirror.max_in_flight = 2;
        config.http.max_retries = 3;
        config.http.mutation_concurrency = 7;

        let options = pipeline_options(&args(), &config, Arc::new(AtomicBool::new(false)));

        assert!(options.include_private);
        assert!(!options.dry_run);
        assert_eq!(options.source_approximate_count, 300);
        assert_eq!(options.target_approximate_count, 100);
        assert_eq!(options.mirror.max_in_flight, 2);
        assert_eq!(options.mirror.on_failure, FailurePolicy::Abort);
        assert_eq!(options.retry.max_retries, 3);
        assert_eq!(options.concurrency, 7);
        assert!(options.mirror.stop.is_some());
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config::default();
        let args = RunArgs {
            dry_run: true,
            public_only: true,
            max_in_flight: Some(4),
            continue_on_error: true,
        };

        let options = pipeline_options(&args, &config, Arc::new(AtomicBool::new(false)));

        assert!(!options.include_private);
        assert!(options.dry_run);
        assert_eq!(options.mirror.max_in_flight, 4);
        assert_eq!(options.mirror.on_failure, FailurePolicy::Continue);
    }

    #[test]
    fn test_same_account_is_rejected() {
        let mut config = Config::default();
        config.source.platform = Some(PlatformKind::Gitea);
        config.source.username = Some("alice".to_string());
        config.target.platform = Some(PlatformKind::Gitea);
        config.target.username = Some("alice".to_string());
        assert!(ensure_distinct_endpoints(&config).is_err());

        config.target.host = Some("https://git.example.com".to_string());
        assert!(ensure_distinct_endpoints(&config).is_ok());
    }
}
