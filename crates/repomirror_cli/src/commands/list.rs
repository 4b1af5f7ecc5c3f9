use std::sync::Arc;

use clap::ValueEnum;
use repomirror::retry::RetryConfig;
use repomirror::{CatalogOptions, Repository, fetch_catalog};
use serde::Serialize;

use crate::commands::client::build_client;
use crate::config::{Config, Side};
use crate::progress::ProgressReporter;

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// One row of the listing table.
#[derive(Debug, Clone, Serialize, tabled::Tabled)]
pub(crate) struct RepoRow {
    #[tabled(rename = "Repository")]
    pub name: String,
    #[tabled(rename = "Visibility")]
    pub visibility: String,
    #[tabled(rename = "ID")]
    pub id: String,
}

impl From<&Repository> for RepoRow {
    fn from(repo: &Repository) -> Self {
        Self {
            name: repo.full_name(),
            visibility: repo.visibility.to_string(),
            id: repo
                .platform_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
        }
    }
}

fn render(repos: &[Repository], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<RepoRow> = repos.iter().map(RepoRow::from).collect();
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            Ok(table.to_string())
        }
        OutputFormat::Json => serde_json::to_string_pretty(repos),
    }
}

/// Handle `repomirror list <side>`.
pub(crate) async fn handle_list(
    side: Side,
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config, side)?;
    let endpoint = config.endpoint(side);

    let options = CatalogOptions {
        include_private: side == Side::Target || config.mirror.include_private,
        approximate_count: endpoint.approximate_repo_count,
        concurrency: config.http.page_concurrency,
        retry: RetryConfig::with_max_retries(config.http.max_retries),
    };

    // Bars would end up in the JSON on stdout.
    let reporter = Arc::new(match output {
        OutputFormat::Table => ProgressReporter::new(),
        OutputFormat::Json => ProgressReporter::Logging(crate::progress::LoggingReporter::new()),
    });
    let callback = reporter.as_callback();
    let repos = fetch_catalog(client.as_ref(), &options, Some(&callback)).await;
    reporter.finish();
    let repos = repos?;

    println!("{}", render(&repos, output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repomirror::Visibility;

    fn repos() -> Vec<Repository> {
        vec![
            Repository {
                platform_id: Some(7),
                owner: "alice".to_string(),
                name: "app".to_string(),
                visibility: Visibility::Private,
            },
            Repository {
                platform_id: None,
                owner: "alice".to_string(),
                name: "lib".to_string(),
                visibility: Visibility::Public,
            },
        ]
    }

    #[test]
    fn test_output_format_default_is_table() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
    }

    #[test]
    fn test_row_from_repository() {
        let rows: Vec<RepoRow> = repos().iter().map(RepoRow::from).collect();
        assert_eq!(rows[0].name, "alice/app");
        assert_eq!(rows[0].visibility, "private");
        assert_eq!(rows[0].id, "7");
        assert_eq!(rows[1].id, "-");
    }

    #[test]
    fn test_render_table() {
        let table = render(&repos(), OutputFormat::Table).unwrap();
        assert!(table.contains("Repository"));
        assert!(table.contains("alice/lib"));
    }

    #[test]
    fn test_render_json() {
        let json = render(&repos(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "app");
        assert_eq!(parsed[0]["visibility"], "private");
        assert!(parsed[1]["platform_id"].is_null());
    }
}
