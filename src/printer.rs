use colored::{Color, Colorize};
use url::Url;

use crate::{
    runner::{Outcome, RunSummary, ScenarioReport},
    scenario::Scenario,
};

pub fn print_scenario_report(report: &ScenarioReport, preview_bytes: Option<usize>) {
    println!(
        "{} {} {}",
        outcome_label(report.outcome),
        report.title.bold(),
        format!("({:.1} ms)", report.duration_ms).dimmed()
    );

    for exchange in &report.exchanges {
        println!(
            "  {} {} {}",
            exchange.request.method.bold(),
            exchange.request.url.cyan(),
            format!("{}", exchange.response.status).color(status_color(exchange.response.status))
        );
        if let Some(limit) = preview_bytes.filter(|limit| *limit > 0) {
            println!("  {}", create_preview(&exchange.response.body, limit).dimmed());
        }
    }

    if let Some(message) = &report.message {
        println!("  {}", message);
    }

    println!("  {} {}", "Report:".bold(), format_file_link(&report.result_file));
}

pub fn print_summary(summary: &RunSummary) {
    println!(
        "{} {} passed, {} failed, {} broken, {} skipped",
        "Summary:".bold(),
        summary.count(Outcome::Passed).to_string().green(),
        summary.count(Outcome::Failed).to_string().red(),
        summary.count(Outcome::Broken).to_string().yellow(),
        summary.count(Outcome::Skipped).to_string().dimmed()
    );
}

pub fn print_catalog(scenarios: &[&Scenario]) {
    for scenario in scenarios {
        let tags = scenario
            .tags
            .iter()
            .map(|tag| tag.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        print!("{} {} {}", scenario.id.cyan(), scenario.title.bold(), format!("[{tags}]").dimmed());
        match scenario.skip {
            Some(reason) => println!(" {}", format!("skipped: {reason}").yellow()),
            None => println!(),
        }
    }
}

fn outcome_label(outcome: Outcome) -> colored::ColoredString {
    let label = outcome.as_str().to_uppercase();
    match outcome {
        Outcome::Passed => label.green().bold(),
        Outcome::Failed => label.red().bold(),
        Outcome::Broken => label.yellow().bold(),
        Outcome::Skipped => label.dimmed(),
    }
}

fn status_color(status: u16) -> Color {
    if status >= 400 {
        Color::Red
    } else if status >= 300 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Cuts `body` to at most `limit` bytes without splitting a character.
fn create_preview(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

fn format_file_link(path: &std::path::Path) -> String {
    let display = path.to_string_lossy();
    match Url::from_file_path(path) {
        Ok(url) => format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, display.cyan()),
        Err(_) => display.cyan().to_string(),
    }
}
