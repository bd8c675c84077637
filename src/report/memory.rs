use crate::model::Attachment;

use super::{ReportError, Reporter};

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    StepStarted(String),
    Attached { step: Option<String>, attachment: Attachment },
    StepStopped(String),
}

/// Keeps every reporter call in order. Useful when the report itself is the
/// thing under test.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Vec<ReportEvent>,
    open: Vec<String>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ReportEvent] {
        &self.events
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.events.iter().filter_map(|event| match event {
            ReportEvent::Attached { attachment, .. } => Some(attachment),
            _ => None,
        })
    }
}

impl Reporter for MemoryReporter {
    fn start_step(&mut self, name: &str) -> Result<(), ReportError> {
        self.open.push(name.to_string());
        self.events.push(ReportEvent::StepStarted(name.to_string()));
        Ok(())
    }

    fn attach(&mut self, attachment: Attachment) -> Result<(), ReportError> {
        self.events.push(ReportEvent::Attached {
            step: self.open.last().cloned(),
            attachment,
        });
        Ok(())
    }

    fn stop_step(&mut self) -> Result<(), ReportError> {
        let name = self.open.pop().ok_or(ReportError::NoOpenStep)?;
        self.events.push(ReportEvent::StepStopped(name));
        Ok(())
    }
}
