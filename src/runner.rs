use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    http::ApiClient,
    model::Exchange,
    report::{AllureReporter, Label, Status},
    scenario::{run_scenario, Scenario, ScenarioContext, ScenarioError},
};

const SUITE_NAME: &str = "objsmoke";

pub struct RunOptions {
    pub results_dir: PathBuf,
    pub include_skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Broken,
    Skipped,
}

impl Outcome {
    fn status(&self) -> Status {
        match self {
            Outcome::Passed => Status::Passed,
            Outcome::Failed => Status::Failed,
            Outcome::Broken => Status::Broken,
            Outcome::Skipped => Status::Skipped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Broken => "broken",
            Outcome::Skipped => "skipped",
        }
    }
}

pub struct ScenarioReport {
    pub title: String,
    pub outcome: Outcome,
    pub message: Option<String>,
    pub exchanges: Vec<Exchange>,
    pub duration_ms: f64,
    pub result_file: PathBuf,
}

#[derive(Default)]
pub struct RunSummary {
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.reports
            .iter()
            .filter(|report| report.outcome == outcome)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.count(Outcome::Failed) == 0 && self.count(Outcome::Broken) == 0
    }
}

/// Runs scenarios one after another. Each gets its own report, written
/// whatever the outcome.
pub async fn run_scenarios(
    client: &ApiClient,
    scenarios: &[&Scenario],
    options: &RunOptions,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for scenario in scenarios {
        let report = run_one(client, scenario, options).await?;
        summary.reports.push(report);
    }
    Ok(summary)
}

pub async fn run_one(
    client: &ApiClient,
    scenario: &Scenario,
    options: &RunOptions,
) -> Result<ScenarioReport> {
    let mut labels: Vec<Label> = scenario
        .tags
        .iter()
        .map(|tag| Label::new("tag", tag.as_str()))
        .collect();
    labels.push(Label::new("suite", SUITE_NAME));

    let mut reporter = AllureReporter::start(
        &options.results_dir,
        scenario.title,
        &format!("{SUITE_NAME}.{}", scenario.id),
        labels,
    );

    let start = Instant::now();
    let (outcome, message, exchanges) = match scenario.skip {
        Some(reason) if !options.include_skipped => {
            warn!(scenario = scenario.id, reason, "skipping scenario");
            (Outcome::Skipped, Some(reason.to_string()), Vec::new())
        }
        _ => {
            let mut ctx = ScenarioContext::new(client, &mut reporter);
            let result = run_scenario(scenario.kind, &mut ctx).await;
            let exchanges = ctx.into_exchanges();
            match result {
                Ok(()) => (Outcome::Passed, None, exchanges),
                Err(err @ ScenarioError::Assertion(_)) => {
                    (Outcome::Failed, Some(err.to_string()), exchanges)
                }
                Err(err) => (Outcome::Broken, Some(format!("{err:#}")), exchanges),
            }
        }
    };
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let result_file = reporter
        .finish(outcome.status(), message.clone())
        .with_context(|| format!("writing report for {}", scenario.title))?;

    info!(
        scenario = scenario.id,
        outcome = outcome.as_str(),
        duration_ms,
        "scenario finished"
    );

    Ok(ScenarioReport {
        title: scenario.title.to_string(),
        outcome,
        message,
        exchanges,
        duration_ms,
        result_file,
    })
}
