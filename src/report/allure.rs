use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::model::Attachment;

use super::{ReportError, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Stage {
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct AttachmentRef {
    name: String,
    source: String,
    #[serde(rename = "type")]
    content_type: String,
}

#[derive(Debug, Clone, Serialize)]
struct StatusDetails {
    message: String,
}

#[derive(Debug, Clone, Serialize)]
struct StepResult {
    name: String,
    status: Status,
    stage: Stage,
    steps: Vec<StepResult>,
    attachments: Vec<AttachmentRef>,
    start: i64,
    stop: i64,
}

/// Allure 2 `*-result.json` document for one test case.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestResult {
    uuid: String,
    history_id: String,
    name: String,
    full_name: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_details: Option<StatusDetails>,
    stage: Stage,
    steps: Vec<StepResult>,
    attachments: Vec<AttachmentRef>,
    labels: Vec<Label>,
    start: i64,
    stop: i64,
}

/// Writes one test case into an Allure results directory.
///
/// Attachment payloads go to disk as soon as they are attached; the result
/// document itself is written by [`AllureReporter::finish`].
pub struct AllureReporter {
    results_dir: PathBuf,
    result: TestResult,
    open_steps: Vec<StepResult>,
}

impl AllureReporter {
    pub fn start(
        results_dir: impl Into<PathBuf>,
        name: &str,
        full_name: &str,
        labels: Vec<Label>,
    ) -> Self {
        let now = now_millis();
        Self {
            results_dir: results_dir.into(),
            result: TestResult {
                uuid: Uuid::new_v4().to_string(),
                history_id: full_name.to_string(),
                name: name.to_string(),
                full_name: full_name.to_string(),
                status: Status::Passed,
                status_details: None,
                stage: Stage::Running,
                steps: Vec::new(),
                attachments: Vec::new(),
                labels,
                start: now,
                stop: now,
            },
            open_steps: Vec::new(),
        }
    }

    /// Closes any dangling steps as broken and writes the result document.
    pub fn finish(
        mut self,
        status: Status,
        message: Option<String>,
    ) -> Result<PathBuf, ReportError> {
        while !self.open_steps.is_empty() {
            self.close_step(Status::Broken)?;
        }

        let now = now_millis();
        self.result.status = status;
        self.result.status_details = message.map(|message| StatusDetails { message });
        self.result.stage = Stage::Finished;
        self.result.stop = now;

        let path = self
            .results_dir
            .join(format!("{}-result.json", self.result.uuid));
        let document = serde_json::to_vec_pretty(&self.result)?;
        write_file(&path, &document)?;
        Ok(path)
    }

    fn close_step(&mut self, status: Status) -> Result<(), ReportError> {
        let mut step = self.open_steps.pop().ok_or(ReportError::NoOpenStep)?;
        step.status = status;
        step.stage = Stage::Finished;
        step.stop = now_millis();

        match self.open_steps.last_mut() {
            Some(parent) => parent.steps.push(step),
            None => self.result.steps.push(step),
        }
        Ok(())
    }
}

impl Reporter for AllureReporter {
    fn start_step(&mut self, name: &str) -> Result<(), ReportError> {
        let now = now_millis();
        self.open_steps.push(StepResult {
            name: name.to_string(),
            status: Status::Passed,
            stage: Stage::Running,
            steps: Vec::new(),
            attachments: Vec::new(),
            start: now,
            stop: now,
        });
        Ok(())
    }

    fn attach(&mut self, attachment: Attachment) -> Result<(), ReportError> {
        let source = format!(
            "{}-attachment{}",
            Uuid::new_v4(),
            attachment.content_type.extension()
        );
        write_file(&self.results_dir.join(&source), attachment.payload.as_bytes())?;

        let reference = AttachmentRef {
            name: attachment.name,
            source,
            content_type: attachment.content_type.mime().to_string(),
        };
        match self.open_steps.last_mut() {
            Some(step) => step.attachments.push(reference),
            None => self.result.attachments.push(reference),
        }
        Ok(())
    }

    fn stop_step(&mut self) -> Result<(), ReportError> {
        self.close_step(Status::Passed)
    }
}

/// Creates the results directory. With `clean`, earlier results, attachments
/// and environment files are removed first; anything else is left alone.
pub fn prepare_results_dir(dir: &Path, clean: bool) -> Result<(), ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    if !clean {
        return Ok(());
    }

    let entries = fs::read_dir(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && is_report_artifact(&entry.file_name().to_string_lossy()) {
            fs::remove_file(&path).map_err(|source| ReportError::Io { path, source })?;
        }
    }
    Ok(())
}

fn is_report_artifact(name: &str) -> bool {
    name.ends_with("-result.json")
        || name.contains("-attachment")
        || name == "environment.properties"
}

/// Writes `environment.properties`, shown on the Allure overview page.
pub fn write_environment(dir: &Path, entries: &[(&str, &str)]) -> Result<PathBuf, ReportError> {
    let mut contents = String::new();
    for (key, value) in entries {
        contents.push_str(&format!("{key}={value}\n"));
    }
    let path = dir.join("environment.properties");
    write_file(&path, contents.as_bytes())?;
    Ok(path)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    fs::write(path, bytes).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::tempdir;

    fn read_json(path: &Path) -> Result<Value> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    #[test]
    fn finish_writes_result_with_nested_steps() -> Result<()> {
        let temp = tempdir()?;
        let mut reporter = AllureReporter::start(
            temp.path(),
            "List of all objects",
            "objsmoke.list_objects",
            vec![Label::new("tag", "smoke")],
        );

        reporter.start_step("Request: GET https://example.com/objects")?;
        reporter.attach(Attachment::json("Request Body", "null"))?;
        reporter.start_step("inner")?;
        reporter.stop_step()?;
        reporter.stop_step()?;

        let path = reporter.finish(Status::Passed, None)?;
        let document = read_json(&path)?;

        assert_eq!(document["name"], "List of all objects");
        assert_eq!(document["fullName"], "objsmoke.list_objects");
        assert_eq!(document["status"], "passed");
        assert_eq!(document["stage"], "finished");
        assert!(document.get("statusDetails").is_none());
        assert_eq!(document["labels"][0]["name"], "tag");
        assert_eq!(document["labels"][0]["value"], "smoke");

        let step = &document["steps"][0];
        assert_eq!(step["name"], "Request: GET https://example.com/objects");
        assert_eq!(step["steps"][0]["name"], "inner");
        assert_eq!(step["attachments"][0]["name"], "Request Body");
        assert_eq!(step["attachments"][0]["type"], "application/json");

        let source = step["attachments"][0]["source"].as_str().unwrap();
        assert!(source.ends_with("-attachment.json"));
        assert_eq!(fs::read_to_string(temp.path().join(source))?, "null");
        Ok(())
    }

    #[test]
    fn finish_breaks_dangling_steps_and_keeps_message() -> Result<()> {
        let temp = tempdir()?;
        let mut reporter = AllureReporter::start(temp.path(), "t", "suite.t", Vec::new());
        reporter.start_step("never closed")?;

        let path = reporter.finish(Status::Failed, Some("expected status 200, got 500".into()))?;
        let document = read_json(&path)?;

        assert_eq!(document["status"], "failed");
        assert_eq!(
            document["statusDetails"]["message"],
            "expected status 200, got 500"
        );
        assert_eq!(document["steps"][0]["status"], "broken");
        Ok(())
    }

    #[test]
    fn attach_without_step_lands_on_test_case() -> Result<()> {
        let temp = tempdir()?;
        let mut reporter = AllureReporter::start(temp.path(), "t", "suite.t", Vec::new());
        reporter.attach(Attachment::json("note", "{}"))?;

        let document = read_json(&reporter.finish(Status::Skipped, None)?)?;
        assert_eq!(document["attachments"][0]["type"], "application/json");
        assert_eq!(document["status"], "skipped");
        Ok(())
    }

    #[test]
    fn prepare_results_dir_cleans_only_report_artifacts() -> Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("allure-results");
        prepare_results_dir(&dir, false)?;
        fs::write(dir.join("abc-result.json"), "{}")?;
        fs::write(dir.join("abc-attachment.json"), "{}")?;
        fs::write(dir.join("environment.properties"), "a=b")?;
        fs::write(dir.join("categories.json"), "[]")?;

        prepare_results_dir(&dir, true)?;

        let mut remaining: Vec<String> = fs::read_dir(&dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
            .collect::<std::io::Result<_>>()?;
        remaining.sort();
        assert_eq!(remaining, vec!["categories.json".to_string()]);
        Ok(())
    }

    #[test]
    fn write_environment_uses_properties_format() -> Result<()> {
        let temp = tempdir()?;
        let path = write_environment(
            temp.path(),
            &[("base_url", "https://api.restful-api.dev"), ("profile", "ci")],
        )?;
        assert_eq!(
            fs::read_to_string(path)?,
            "base_url=https://api.restful-api.dev\nprofile=ci\n"
        );
        Ok(())
    }
}
