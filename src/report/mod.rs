mod allure;
mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::model::Attachment;

pub use allure::{prepare_results_dir, write_environment, AllureReporter, Label, Status};
pub use memory::{MemoryReporter, ReportEvent};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no open step to close")]
    NoOpenStep,
    #[error("writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The reporting side of a test run.
///
/// Steps nest: an attachment lands in the innermost open step, or on the test
/// case itself when no step is open.
pub trait Reporter {
    fn start_step(&mut self, name: &str) -> Result<(), ReportError>;
    fn attach(&mut self, attachment: Attachment) -> Result<(), ReportError>;
    fn stop_step(&mut self) -> Result<(), ReportError>;
}
