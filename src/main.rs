use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use objsmoke::config::{load_config, Overrides, SettingsBuilder};
use objsmoke::http::ApiClient;
use objsmoke::printer::{print_catalog, print_scenario_report, print_summary};
use objsmoke::report::{prepare_results_dir, write_environment};
use objsmoke::runner::{run_scenarios, Outcome, RunOptions};
use objsmoke::scenario::{select_scenarios, Tag};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "objsmoke",
    version,
    about = "Smoke tests for the restful-api.dev object API",
    disable_help_subcommand = true
)]
struct Cli {
    /// Select a profile from objsmoke.json
    #[arg(short = 'P', long, global = true)]
    profile: Option<String>,

    /// Directory or file containing objsmoke.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dotenv file with API_BASE_URL / AUTH_TOKEN
    #[arg(short, long, global = true)]
    env: Option<PathBuf>,

    /// Override base directory used for resolving paths
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scenarios and write Allure results
    Run {
        /// Only run scenarios carrying this tag (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<Tag>,
        /// Run scenarios that are marked as skipped
        #[arg(long)]
        include_skipped: bool,
        /// Target API base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Directory for Allure result files
        #[arg(short = 'O', long)]
        results_dir: Option<PathBuf>,
        /// Remove earlier results before running
        #[arg(long)]
        clean: bool,
        /// Preview the first N bytes of each response body
        #[arg(short, long)]
        preview: Option<usize>,
    },
    /// List the scenario catalog
    List {
        /// Only list scenarios carrying this tag (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<Tag>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let base_dir = match &cli.cwd {
        Some(path) => resolve_path(path)?,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::List { tags } => {
            print_catalog(&select_scenarios(&tags));
            Ok(())
        }
        Commands::Run {
            tags,
            include_skipped,
            base_url,
            results_dir,
            clean,
            preview,
        } => {
            let config_target = cli
                .config
                .as_ref()
                .map(|p| resolve_relative(&base_dir, p))
                .unwrap_or_else(|| base_dir.clone());
            let config = load_config(&config_target).context("loading configuration")?;

            let settings = SettingsBuilder::new(
                base_dir.clone(),
                config,
                cli.profile.clone(),
                cli.env.as_ref().map(|p| resolve_relative(&base_dir, p)),
                Overrides {
                    base_url,
                    results_dir,
                },
            )
            .build()?;

            prepare_results_dir(&settings.results_dir, clean)?;
            write_environment(
                &settings.results_dir,
                &[
                    ("base_url", settings.base_url.as_str()),
                    ("profile", settings.profile_name.as_deref().unwrap_or("none")),
                ],
            )?;

            let scenarios = select_scenarios(&tags);
            if scenarios.is_empty() {
                bail!("No scenarios match the requested tags");
            }

            let client = ApiClient::new(
                &settings.base_url,
                settings.auth_token.clone(),
                settings.timeout,
            )?;
            let summary = run_scenarios(
                &client,
                &scenarios,
                &RunOptions {
                    results_dir: settings.results_dir.clone(),
                    include_skipped,
                },
            )
            .await?;

            for report in &summary.reports {
                print_scenario_report(report, preview);
            }
            print_summary(&summary);

            if !summary.is_success() {
                bail!(
                    "{} of {} scenarios did not pass",
                    summary.count(Outcome::Failed) + summary.count(Outcome::Broken),
                    summary.reports.len()
                );
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_repeated_tags() {
        let cli = Cli::parse_from(["objsmoke", "run", "--tag", "smoke", "-t", "happy_path"]);
        match cli.command {
            Commands::Run { tags, .. } => assert_eq!(tags, vec![Tag::Smoke, Tag::HappyPath]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn resolve_relative_joins_when_needed() {
        let base = Path::new("/tmp/base");
        let relative = Path::new("results");
        assert_eq!(resolve_relative(base, relative), base.join(relative));

        let absolute = Path::new("/var/results");
        assert_eq!(resolve_relative(base, absolute), absolute);
    }
}
