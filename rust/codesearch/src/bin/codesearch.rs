//! `codesearch` — ingest repositories and search them from the command line.
//!
//! Configuration comes from the environment (see `codesearch::config`) and
//! can be overridden with flags. Repositories named by `CODESEARCH_REPO_*`
//! are ingested by `add` before its own locators; `search` and `stats` only
//! read the index.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codesearch::config::{DEFAULT_DATA_DIR, VOLUME_VAR};
use codesearch::{Config, Engine, SearchRequest, DEFAULT_PAGE_SIZE};

#[derive(Parser)]
#[command(name = "codesearch")]
#[command(about = "Regex code search across many repositories")]
#[command(version)]
struct Cli {
    /// Directory holding the index and file contents
    #[arg(long, global = true, env = VOLUME_VAR, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Development mode (debug logging); also enabled by CODESEARCH_DEV=true
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the CODESEARCH_REPO_* repositories and any listed locators
    Add {
        /// Repository locators (local paths or file:// URLs)
        #[arg(value_name = "LOCATOR")]
        locators: Vec<String>,
    },
    /// Search the index
    Search {
        /// Regular expression or literal to search for
        pattern: String,

        /// Only search this repository
        #[arg(long = "repo")]
        repository: Option<String>,

        /// Number of matching files to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Number of files to return
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        count: usize,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print index statistics
    Stats,
}

/// Apply command-line overrides to the environment configuration.
///
/// Startup repositories are only ingested by `add`.
fn engine_config(mut config: Config, cli: &Cli) -> Config {
    config.data_dir = cli.data_dir.clone();
    config.dev_mode |= cli.dev;
    if !matches!(cli.command, Commands::Add { .. }) {
        config.initial_repositories.clear();
    }
    config
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = engine_config(Config::from_env(), &cli);

    let default_level = if config.dev_mode { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        data_dir = %config.data_dir.display(),
        initial_repositories = config.initial_repositories.len(),
        "codesearch starting"
    );

    let engine = Engine::open(config.clone())
        .with_context(|| format!("failed to open index at {}", config.data_dir.display()))?;

    match cli.command {
        Commands::Add { locators } => {
            if locators.is_empty() && engine.config().initial_repositories.is_empty() {
                tracing::warn!("Nothing to ingest: no locators given and no CODESEARCH_REPO_* set");
            }
            for locator in &locators {
                let report = engine
                    .add(locator)
                    .with_context(|| format!("failed to ingest {}", locator))?;
                println!(
                    "{}: {} files stored, {} indexed, {} skipped ({} files in index)",
                    report.repository,
                    report.files_stored,
                    report.files_indexed,
                    report.files_skipped,
                    report.segment_files
                );
            }
        }
        Commands::Search {
            pattern,
            repository,
            offset,
            count,
            json,
        } => {
            let mut request = SearchRequest::new(pattern).offset(offset).count(count);
            if let Some(repository) = repository {
                request = request.repository(&repository);
            }
            let result = engine.search(&request).context("search failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{} matching files", result.count);
                for snippet in &result.snippets {
                    println!(
                        "{}/{}: {} hits, first at line {} ({} lines)",
                        snippet.repository,
                        snippet.path,
                        snippet.hit_count,
                        snippet.first_hit + 1,
                        snippet.line_count
                    );
                }
            }
        }
        Commands::Stats => {
            let stats = engine.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_config() -> Config {
        Config::from_vars(vec![
            ("CODESEARCH_REPO_A".to_string(), "/src/a".to_string()),
            ("CODESEARCH_DEV".to_string(), "false".to_string()),
        ])
    }

    #[test]
    fn test_search_and_stats_skip_startup_ingestion() {
        for args in [
            vec!["codesearch", "search", "Foo"],
            vec!["codesearch", "stats"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(engine_config(env_config(), &cli).initial_repositories.is_empty());
        }
    }

    #[test]
    fn test_add_keeps_startup_repositories() {
        let cli = Cli::try_parse_from(["codesearch", "add"]).unwrap();
        let config = engine_config(env_config(), &cli);
        assert_eq!(config.initial_repositories, vec!["/src/a"]);

        let cli = Cli::try_parse_from(["codesearch", "--data-dir", "/tmp/cs", "--dev", "add", "/src/b"]).unwrap();
        let config = engine_config(env_config(), &cli);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cs"));
        assert!(config.dev_mode);
        assert_eq!(config.initial_repositories, vec!["/src/a"]);
    }
}
