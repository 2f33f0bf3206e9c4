use thiserror::Error;

use super::types::{CommandKind, WorkflowState};
use crate::certificate::CertificateError;

/// Rejections returned by workflow commands. A rejected command leaves the
/// workflow untouched.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid transition: {command} not allowed in state {state}")]
    InvalidTransition {
        command: CommandKind,
        state: WorkflowState,
    },

    #[error("Workflow busy: {command} rejected while a sequence is in flight")]
    Busy { command: CommandKind },

    #[error("Question index {index} out of range; questionnaire has {len} questions")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("Certificate unavailable: {0}")]
    Certificate(#[from] CertificateError),

    #[error("Workflow driver has stopped")]
    DriverStopped,
}
