use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::identify_use_case::{IdentifyUseCase, Identification};
use crate::pipeline::pipeline_logger::PipelineLogger;

pub type SendError = Box<dyn std::error::Error + Send + Sync>;

/// A labelled query image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Probe {
    pub subject_id: u32,
    pub path: PathBuf,
}

pub type ProbeOutcome = Result<Identification, SendError>;

/// Runs many independent identification queries.
///
/// This is a port; infrastructure decides how the work is scheduled.
/// Outcomes are returned in probe order.
pub trait BatchExecutor: Send {
    fn execute(
        &self,
        use_case: Arc<IdentifyUseCase>,
        probes: &[Probe],
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<ProbeOutcome>, Box<dyn std::error::Error>>;
}
